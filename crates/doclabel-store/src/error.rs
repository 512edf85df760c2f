use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] doclabel_core::ConfigError),

    #[error("invalid connection string: {0}")]
    ConnectionString(String),

    #[error("invalid blob name: {0:?}")]
    InvalidName(String),

    #[error("blob already exists: {container}/{blob}")]
    AlreadyExists { container: String, blob: String },

    #[error("blob upload rejected with {status}: {code}")]
    Upload { status: u16, code: String },

    #[error("blob service request failed: {0}")]
    Azure(#[from] azure_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
