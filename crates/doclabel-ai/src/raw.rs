//! Raw HTTP scoring transport.
//!
//! The endpoint takes a single user message holding the whole prompt:
//!
//! ```json
//! {"input_data": {"input_string": [{"role": "user", "content": "..."}],
//!                 "parameters": {"max_new_tokens": 250, "temperature": 0.0, "return_full_text": false}}}
//! ```
//!
//! and answers with a JSON array whose first element is the completion.

use async_trait::async_trait;
use doclabel_core::Endpoint;
use doclabel_core::config::{MAX_TOKENS, TEMPERATURE};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ModelError;
use crate::invoker::{ModelInvoker, check_status};
use crate::prompt::Prompt;

#[derive(Serialize)]
struct ScoringRequest {
    input_data: InputData,
}

#[derive(Serialize)]
struct InputData {
    input_string: [UserMessage; 1],
    parameters: Parameters,
}

#[derive(Serialize)]
struct UserMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct Parameters {
    max_new_tokens: u32,
    temperature: f32,
    return_full_text: bool,
}

impl ScoringRequest {
    fn new(prompt: &Prompt) -> Self {
        Self {
            input_data: InputData {
                input_string: [UserMessage {
                    role: "user",
                    content: prompt.combined(),
                }],
                parameters: Parameters {
                    max_new_tokens: MAX_TOKENS,
                    temperature: TEMPERATURE,
                    return_full_text: false,
                },
            },
        }
    }
}

/// Bearer-authenticated scoring endpoint for one deployed model.
pub struct RawHttpInvoker {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl RawHttpInvoker {
    pub fn new(client: reqwest::Client, endpoint: Endpoint, model: &str) -> Self {
        Self {
            client,
            url: endpoint.url,
            api_key: endpoint.key,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ModelInvoker for RawHttpInvoker {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &Prompt) -> Result<String, ModelError> {
        debug!(model = %self.model, url = %self.url, "sending scoring request");
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&ScoringRequest::new(prompt))
            .send()
            .await?;
        let resp = check_status(&self.model, resp).await?;

        let body: Value = serde_json::from_str(&resp.text().await?)?;
        first_completion(&body).ok_or(ModelError::NoResponseContent)
    }
}

fn first_completion(body: &Value) -> Option<String> {
    body.as_array()?
        .first()?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
