use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("missing secret for model {model}: {key}")]
    MissingCredential { model: String, key: String },

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM request failed ({model}) with status code {status}: {body}")]
    Status {
        model: String,
        status: u16,
        body: String,
    },

    #[error("LLM authentication failed ({model}) with status code {status}: {body}")]
    Auth {
        model: String,
        status: u16,
        body: String,
    },

    #[error("No response content was generated.")]
    NoResponseContent,

    #[error("unexpected LLM response: {0}")]
    Json(#[from] serde_json::Error),
}
