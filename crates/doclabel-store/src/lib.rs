//! Blob storage: the hosted blob service client and a local-directory stand-in.

mod azure;
mod blob;
mod error;

pub use azure::AzureBlobStore;
pub use blob::{BlobStore, LocalBlobStore};
pub use error::StoreError;
