//! HTTP client for the hosted document-analysis ("read") service.
//!
//! Analysis is asynchronous on the service side: the submit call answers
//! `202 Accepted` with an `Operation-Location` header, which is then polled
//! until the operation reports `succeeded` or `failed`.

use std::time::Duration;

use async_trait::async_trait;
use doclabel_core::config::keys;
use doclabel_core::{ConfigError, Endpoint, LayeredConfig};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const API_VERSION: &str = "2024-11-30";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_POLLS: u32 = 120;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("analyze response had no Operation-Location header")]
    MissingOperationLocation,
    #[error("document analysis failed: {0}")]
    AnalysisFailed(String),
    #[error("document analysis still running after {0} polls")]
    TimedOut(u32),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turns document bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn analyze(&self, document: &[u8], model_id: &str) -> Result<String, OcrError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    analyze_result: Option<AnalyzeResult>,
    error: Option<ServiceError>,
}

#[derive(Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

impl ServiceError {
    fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(msg)) => format!("{code}: {msg}"),
            (None, Some(msg)) => msg.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Document-analysis client bound to one resource endpoint.
pub struct DocumentIntelligenceClient {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl DocumentIntelligenceClient {
    /// `endpoint.url` should be like `https://name.cognitiveservices.azure.com`.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.url.trim_end_matches('/').to_string(),
            key: endpoint.key,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn from_config(config: &LayeredConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint(
            keys::DOCUMENT_INTELLIGENCE_ENDPOINT,
            keys::DOCUMENT_INTELLIGENCE_KEY,
        )?;
        Ok(Self::new(endpoint))
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn analyze_url(&self, model_id: &str) -> String {
        format!(
            "{}/documentintelligence/documentModels/{model_id}:analyze?api-version={API_VERSION}",
            self.endpoint
        )
    }

    async fn poll(&self, operation_url: &str) -> Result<String, OcrError> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let resp = self
                .client
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .send()
                .await?;
            let resp = error_for_status(resp).await?;
            let op: AnalyzeOperation = serde_json::from_str(&resp.text().await?)?;

            match op.status.as_str() {
                "succeeded" => {
                    let content = op.analyze_result.map(|r| r.content).unwrap_or_default();
                    info!(chars = content.chars().count(), polls = attempt, "document analysed");
                    return Ok(content);
                }
                "failed" | "canceled" => {
                    let reason = op
                        .error
                        .map(|e| e.describe())
                        .unwrap_or_else(|| op.status.clone());
                    return Err(OcrError::AnalysisFailed(reason));
                }
                status => debug!(status, attempt, "analysis in progress"),
            }
        }
        Err(OcrError::TimedOut(self.max_polls))
    }
}

#[async_trait]
impl TextExtractor for DocumentIntelligenceClient {
    async fn analyze(&self, document: &[u8], model_id: &str) -> Result<String, OcrError> {
        let url = self.analyze_url(model_id);
        info!(model_id, bytes = document.len(), "submitting document for analysis");

        let resp = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(document.to_vec())
            .send()
            .await?;
        let resp = error_for_status(resp).await?;

        let operation_url = resp
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(OcrError::MissingOperationLocation)?;

        self.poll(&operation_url).await
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, OcrError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(OcrError::Server {
        status: status.as_u16(),
        body,
    })
}
