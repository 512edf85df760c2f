use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::StoreError;

/// Write-only object storage, addressed by container and blob name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `container/blob`. With `overwrite = false` an
    /// existing blob is left untouched and `StoreError::AlreadyExists` returned.
    async fn put(
        &self,
        container: &str,
        blob: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<(), StoreError>;
}

/// Stores blobs as plain files under `<root>/<container>/<blob>`.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, container: &str, blob: &str) -> Result<PathBuf, StoreError> {
        for name in [container, blob] {
            let mut components = Path::new(name).components();
            let single_normal = matches!(components.next(), Some(Component::Normal(_)))
                && components.next().is_none();
            if !single_normal {
                return Err(StoreError::InvalidName(name.to_string()));
            }
        }
        Ok(self.root.join(container).join(blob))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        container: &str,
        blob: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let path = self.path_for(container, blob)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = match options.open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists {
                    container: container.to_string(),
                    blob: blob.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(bytes).await?;
        file.flush().await?;

        info!(path = %path.display(), bytes = bytes.len(), "blob written");
        Ok(())
    }
}
