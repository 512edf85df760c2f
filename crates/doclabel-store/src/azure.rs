//! Hosted blob storage through the storage SDK, authenticated with the
//! account key from a connection string.
//!
//! Only `Put Blob` is needed: uploaded documents and zero-byte feedback
//! markers are both written as block blobs.

use async_trait::async_trait;
use azure_core::StatusCode;
use azure_core::error::ErrorKind;
use azure_core::request_options::IfMatchCondition;
use azure_storage::{CloudLocation, ConnectionString};
use azure_storage_blobs::prelude::{BlobContentType, BlobServiceClient, ClientBuilder};
use doclabel_core::LayeredConfig;
use doclabel_core::config::keys;
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::error::StoreError;

const CONTENT_TYPE_OCTET: &str = "application/octet-stream";
const PUBLIC_PROTOCOL: &str = "https";
const PUBLIC_SUFFIX: &str = "core.windows.net";

pub struct AzureBlobStore {
    service: BlobServiceClient,
}

impl AzureBlobStore {
    pub fn from_connection_string(s: &str) -> Result<Self, StoreError> {
        let cs = ConnectionString::new(s).map_err(bad_connection_string)?;
        let location = location(&cs)?;
        let credentials = cs.storage_credentials().map_err(bad_connection_string)?;
        Ok(Self {
            service: ClientBuilder::with_location(location, credentials).blob_service_client(),
        })
    }

    pub fn from_config(config: &LayeredConfig) -> Result<Self, StoreError> {
        Self::from_connection_string(&config.require(keys::CONNECTION_STRING)?)
    }
}

fn bad_connection_string(e: azure_core::Error) -> StoreError {
    StoreError::ConnectionString(e.to_string())
}

/// Where blob requests go: the public cloud unless the connection string
/// names an explicit endpoint, a non-default suffix, or plain http.
fn location(cs: &ConnectionString<'_>) -> Result<CloudLocation, StoreError> {
    let account = cs
        .account_name
        .ok_or_else(|| StoreError::ConnectionString("missing AccountName".into()))?
        .to_string();
    if let Some(endpoint) = cs.blob_endpoint {
        return Ok(CloudLocation::Custom {
            account,
            uri: endpoint.trim_end_matches('/').to_string(),
        });
    }
    let protocol = cs
        .default_endpoints_protocol
        .as_ref()
        .map_or_else(|| PUBLIC_PROTOCOL.to_string(), ToString::to_string);
    let suffix = cs.endpoint_suffix.unwrap_or(PUBLIC_SUFFIX);
    if protocol == PUBLIC_PROTOCOL && suffix == PUBLIC_SUFFIX {
        return Ok(CloudLocation::Public { account });
    }
    let uri = format!("{protocol}://{account}.blob.{suffix}");
    Ok(CloudLocation::Custom { account, uri })
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put(
        &self,
        container: &str,
        blob: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let client = self.service.container_client(container).blob_client(blob);
        let mut request = client
            .put_block_blob(bytes.to_vec())
            .content_type(BlobContentType::from(CONTENT_TYPE_OCTET));
        if !overwrite {
            request = request.if_match(IfMatchCondition::NotMatch("*".to_string()));
        }

        debug!(container, blob, bytes = bytes.len(), overwrite, "put blob");
        match request.await {
            Ok(_) => {
                info!(container, blob, bytes = bytes.len(), "blob uploaded");
                Ok(())
            }
            Err(e) => Err(rejection(e, container, blob, overwrite)),
        }
    }
}

fn rejection(e: azure_core::Error, container: &str, blob: &str, overwrite: bool) -> StoreError {
    let ErrorKind::HttpResponse { status, error_code } = e.kind() else {
        return StoreError::Azure(e);
    };
    if !overwrite && *status == StatusCode::Conflict {
        return StoreError::AlreadyExists {
            container: container.to_string(),
            blob: blob.to_string(),
        };
    }
    StoreError::Upload {
        status: *status as u16,
        code: error_code.clone().unwrap_or_default(),
    }
}
