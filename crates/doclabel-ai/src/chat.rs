//! Hosted chat-completion transport (system + user message pair).

use async_trait::async_trait;
use doclabel_core::Endpoint;
use doclabel_core::config::{MAX_TOKENS, TEMPERATURE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ModelError;
use crate::invoker::{ModelInvoker, check_status};
use crate::prompt::Prompt;

const API_VERSION: &str = "2024-05-01-preview";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completion client for one deployed model.
pub struct ChatCompletionInvoker {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionInvoker {
    /// `endpoint.url` is the inference base URL, e.g. `https://host/models`.
    pub fn new(client: reqwest::Client, endpoint: Endpoint, model: &str) -> Self {
        let base = endpoint.url.trim_end_matches('/');
        let url = if base.contains("/chat/completions") {
            base.to_string()
        } else {
            format!("{base}/chat/completions?api-version={API_VERSION}")
        };
        Self {
            client,
            url,
            api_key: endpoint.key,
            model: model.to_string(),
        }
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
impl ModelInvoker for ChatCompletionInvoker {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, prompt: &Prompt) -> Result<String, ModelError> {
        debug!(model = %self.model, url = %self.url, "sending chat completion");
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await?;
        let resp = check_status(&self.model, resp).await?;

        let body: ChatResponse = serde_json::from_str(&resp.text().await?)?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::NoResponseContent)
    }
}
