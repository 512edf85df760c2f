//! Model transports and the registry that picks one per model identifier.
//!
//! Two request/response envelopes exist: a hosted chat-completion endpoint
//! ([`ChatCompletionInvoker`]) and a raw HTTP scoring endpoint
//! ([`RawHttpInvoker`]). The transport is decided once, when the registry is
//! built, from the model identifier.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use doclabel_core::config::{AVAILABLE_MODELS, DEFAULT_MODEL, keys};
use doclabel_core::{ConfigError, LayeredConfig};
use tracing::{info, warn};

use crate::chat::ChatCompletionInvoker;
use crate::error::ModelError;
use crate::prompt::Prompt;
use crate::raw::RawHttpInvoker;

/// Sends a prompt to a hosted model and returns the raw completion text.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Deployed model identifier.
    fn model_name(&self) -> &str;

    async fn invoke(&self, prompt: &Prompt) -> Result<String, ModelError>;
}

/// Wire format used to reach a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    ChatCompletion,
    RawHttp,
}

impl Transport {
    /// Case-sensitive substring that routes a model to the raw HTTP transport.
    pub const RAW_HTTP_MARKER: &'static str = "mistral";

    pub fn for_model(model: &str) -> Self {
        if model.contains(Self::RAW_HTTP_MARKER) {
            Self::RawHttp
        } else {
            Self::ChatCompletion
        }
    }
}

enum Entry {
    Ready(Arc<dyn ModelInvoker>),
    /// Credentials were missing when the registry was built.
    Unavailable { key: String },
}

/// Model identifier → invoker, resolved once at configuration time.
pub struct ModelRegistry {
    entries: BTreeMap<String, Entry>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            entries: BTreeMap::new(),
            default_model: default_model.into(),
        }
    }

    pub fn register(&mut self, invoker: Arc<dyn ModelInvoker>) {
        self.entries
            .insert(invoker.model_name().to_string(), Entry::Ready(invoker));
    }

    /// Record a model whose credentials are missing; resolving it reports `key`.
    pub fn register_unavailable(&mut self, model: impl Into<String>, key: impl Into<String>) {
        self.entries
            .insert(model.into(), Entry::Unavailable { key: key.into() });
    }

    /// Build invokers for every entry in [`AVAILABLE_MODELS`].
    ///
    /// Chat-completion models use `AZURE_LLM_ENDPOINT` / `AZURE_LLM_API_KEY`;
    /// raw HTTP models use `AZURE_MISTRAL_ENDPOINT` / `AZURE_MISTRAL_API_KEY`.
    /// One shared HTTP client backs all of them.
    pub fn from_config(config: &LayeredConfig) -> Self {
        let client = reqwest::Client::new();
        let mut registry = Self::new(DEFAULT_MODEL);

        for &(_, model) in AVAILABLE_MODELS {
            let transport = Transport::for_model(model);
            let endpoint = match transport {
                Transport::ChatCompletion => config.endpoint(keys::LLM_ENDPOINT, keys::LLM_API_KEY),
                Transport::RawHttp => {
                    config.endpoint(keys::MISTRAL_ENDPOINT, keys::MISTRAL_API_KEY)
                }
            };
            match endpoint {
                Ok(endpoint) => {
                    let invoker: Arc<dyn ModelInvoker> = match transport {
                        Transport::ChatCompletion => Arc::new(ChatCompletionInvoker::new(
                            client.clone(),
                            endpoint,
                            model,
                        )),
                        Transport::RawHttp => {
                            Arc::new(RawHttpInvoker::new(client.clone(), endpoint, model))
                        }
                    };
                    info!(model, ?transport, "registered model");
                    registry.register(invoker);
                }
                Err(ConfigError::MissingCredential { key, .. }) => {
                    warn!(model, key = %key, "model unavailable: missing secret");
                    registry.register_unavailable(model, key);
                }
                Err(e) => {
                    warn!(model, error = %e, "model unavailable");
                    registry.register_unavailable(model, e.to_string());
                }
            }
        }
        registry
    }

    /// Look up a model by deployed identifier or short name (e.g. `phi4`).
    pub fn resolve(&self, model: &str) -> Result<Arc<dyn ModelInvoker>, ModelError> {
        let name = canonical_name(model);
        match self.entries.get(name) {
            Some(Entry::Ready(invoker)) => Ok(Arc::clone(invoker)),
            Some(Entry::Unavailable { key }) => Err(ModelError::MissingCredential {
                model: name.to_string(),
                key: key.clone(),
            }),
            None => Err(ModelError::UnknownModel(model.to_string())),
        }
    }

    /// Every registered model with whether it can be invoked.
    pub fn models(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), matches!(entry, Entry::Ready(_))))
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// Map a short name from [`AVAILABLE_MODELS`] to its deployed identifier.
fn canonical_name(model: &str) -> &str {
    AVAILABLE_MODELS
        .iter()
        .find(|(short, _)| *short == model)
        .map_or(model, |&(_, full)| full)
}

/// Turn a non-2xx response into a typed error; 401/403 are auth failures.
pub(crate) async fn check_status(
    model: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ModelError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let model = model.to_string();
    let status = status.as_u16();
    if status == 401 || status == 403 {
        Err(ModelError::Auth {
            model,
            status,
            body,
        })
    } else {
        Err(ModelError::Status {
            model,
            status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclabel_core::ConfigProvider;
    use doclabel_core::testing::serve_once;
    use std::collections::HashMap;

    struct StubInvoker(&'static str);

    #[async_trait]
    impl ModelInvoker for StubInvoker {
        fn model_name(&self) -> &str {
            self.0
        }
        async fn invoke(&self, _prompt: &Prompt) -> Result<String, ModelError> {
            Ok(format!("answer from {}", self.0))
        }
    }

    struct Secrets(HashMap<&'static str, &'static str>);

    impl ConfigProvider for Secrets {
        fn name(&self) -> &str {
            "test secrets"
        }
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    fn config(pairs: &[(&'static str, &'static str)]) -> LayeredConfig {
        LayeredConfig::new(vec![Box::new(Secrets(pairs.iter().copied().collect()))])
    }

    #[test]
    fn transport_by_marker() {
        assert_eq!(
            Transport::for_model("mistralai-mistral-7b-instruc-11"),
            Transport::RawHttp
        );
        assert_eq!(Transport::for_model("gpt-4o-mini"), Transport::ChatCompletion);
        // Case-sensitive marker.
        assert_eq!(Transport::for_model("Mistral-Large"), Transport::ChatCompletion);
    }

    #[tokio::test]
    async fn resolve_by_full_and_short_name() {
        let mut reg = ModelRegistry::new(DEFAULT_MODEL);
        reg.register(Arc::new(StubInvoker("Phi-4-multimodal-instruct")));

        let prompt = Prompt {
            system: String::new(),
            user: String::new(),
        };
        let by_full = reg.resolve("Phi-4-multimodal-instruct").unwrap();
        let by_short = reg.resolve("phi4").unwrap();
        assert_eq!(
            by_full.invoke(&prompt).await.unwrap(),
            "answer from Phi-4-multimodal-instruct"
        );
        assert_eq!(by_short.model_name(), "Phi-4-multimodal-instruct");
    }

    #[test]
    fn resolve_unknown_model() {
        let reg = ModelRegistry::new(DEFAULT_MODEL);
        assert!(matches!(
            reg.resolve("llama"),
            Err(ModelError::UnknownModel(m)) if m == "llama"
        ));
    }

    #[test]
    fn from_config_all_credentials() {
        let reg = ModelRegistry::from_config(&config(&[
            (keys::LLM_ENDPOINT, "https://llm.example/models"),
            (keys::LLM_API_KEY, "k1"),
            (keys::MISTRAL_ENDPOINT, "https://ml.example/score"),
            (keys::MISTRAL_API_KEY, "k2"),
        ]));
        let models: Vec<(&str, bool)> = reg.models().collect();
        assert_eq!(models.len(), AVAILABLE_MODELS.len());
        assert!(models.iter().all(|(_, ready)| *ready));
        assert_eq!(reg.default_model(), "Phi-4-multimodal-instruct");
    }

    #[test]
    fn missing_credentials_isolated_per_transport() {
        let reg = ModelRegistry::from_config(&config(&[
            (keys::LLM_ENDPOINT, "https://llm.example/models"),
            (keys::LLM_API_KEY, "k1"),
        ]));
        assert!(reg.resolve("gpt-4o-mini").is_ok());
        match reg.resolve("mistral") {
            Err(ModelError::MissingCredential { model, key }) => {
                assert_eq!(model, "mistralai-mistral-7b-instruc-11");
                assert_eq!(key, keys::MISTRAL_ENDPOINT);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected missing credential"),
        }
    }

    #[tokio::test]
    async fn check_status_maps_auth_and_other_errors() {
        let (url, server) = serve_once(401, r#"{"error":"bad key"}"#).await;
        let resp = reqwest::get(&url).await.unwrap();
        match check_status("m", resp).await {
            Err(ModelError::Auth { status, body, .. }) => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("expected auth error, got {:?}", other.map(|_| ())),
        }
        server.await.unwrap();

        let (url, server) = serve_once(500, "boom").await;
        let resp = reqwest::get(&url).await.unwrap();
        assert!(matches!(
            check_status("m", resp).await,
            Err(ModelError::Status { status: 500, .. })
        ));
        server.await.unwrap();
    }
}
