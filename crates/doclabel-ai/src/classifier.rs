//! End-to-end classification: prompt → model → parse.
//!
//! [`Classifier::classify`] never fails. Missing text, unknown models,
//! transport errors and unparseable answers all come back as an `Error`
//! result so every document reaches a recordable outcome.

use doclabel_core::{ClassificationRequest, ClassificationResult};
use tracing::{debug, info, warn};

use crate::invoker::ModelRegistry;
use crate::parse::parse_response;
use crate::prompt::{build_prompt, keyword_hints};

pub const NO_TEXT_CONTENT: &str = "Could not classify document as no text content was provided.";

pub struct Classifier {
    registry: ModelRegistry,
}

impl Classifier {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Classify one document. Empty text short-circuits before any network call.
    pub async fn classify(&self, request: &ClassificationRequest) -> ClassificationResult {
        if request.text.trim().is_empty() {
            warn!(model = %request.model_name, "no text content to classify");
            return ClassificationResult::error(NO_TEXT_CONTENT);
        }

        let invoker = match self.registry.resolve(&request.model_name) {
            Ok(invoker) => invoker,
            Err(e) => {
                warn!(model = %request.model_name, error = %e, "model unavailable");
                return ClassificationResult::error(e.to_string());
            }
        };

        let prompt = build_prompt(&request.text);
        debug!(
            model = %invoker.model_name(),
            chars = request.text.chars().count(),
            hints = ?keyword_hints(&request.text),
            "classifying document"
        );

        let result = match invoker.invoke(&prompt).await {
            Ok(raw) => parse_response(&raw),
            Err(e) => {
                warn!(model = %invoker.model_name(), error = %e, "model invocation failed");
                ClassificationResult::error(e.to_string())
            }
        };
        info!(
            model = %invoker.model_name(),
            class = %result.class.label(),
            confidence = ?result.confidence,
            "classification complete"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::invoker::ModelInvoker;
    use crate::prompt::Prompt;
    use async_trait::async_trait;
    use doclabel_core::{DocumentClass, normalize};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        calls: AtomicUsize,
        reply: Result<&'static str, u16>,
    }

    #[async_trait]
    impl ModelInvoker for Scripted {
        fn model_name(&self) -> &str {
            "gpt-4o-mini"
        }
        async fn invoke(&self, _prompt: &Prompt) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(status) => Err(ModelError::Status {
                    model: "gpt-4o-mini".into(),
                    status,
                    body: "upstream".into(),
                }),
            }
        }
    }

    fn classifier(reply: Result<&'static str, u16>) -> (Classifier, Arc<Scripted>) {
        let invoker = Arc::new(Scripted {
            calls: AtomicUsize::new(0),
            reply,
        });
        let mut registry = ModelRegistry::new("gpt-4o-mini");
        registry.register(invoker.clone());
        (Classifier::new(registry), invoker)
    }

    #[tokio::test]
    async fn empty_text_skips_model() {
        let (clf, invoker) = classifier(Ok("{}"));
        let result = clf
            .classify(&ClassificationRequest::new("  \n ", "gpt-4o-mini"))
            .await;
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            result.class,
            DocumentClass::Error {
                reason: NO_TEXT_CONTENT.into(),
                raw: None
            }
        );
    }

    #[tokio::test]
    async fn summons_end_to_end() {
        let (clf, invoker) = classifier(Ok(
            r#"Sure! {"class":"Summons","confidence":0.92,"details":{"defendant_name":"EUI","date_of_service":"14/03"}}"#,
        ));
        let result = clf
            .classify(&ClassificationRequest::new("sealed Claim Form", "gpt4o_mini"))
            .await;
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 1);
        assert_eq!(normalize(&result).description, "LIT; SUMMONS EUI 14/03");
    }

    #[tokio::test]
    async fn transport_error_becomes_error_result() {
        let (clf, _) = classifier(Err(502));
        let result = clf
            .classify(&ClassificationRequest::new("text", "gpt-4o-mini"))
            .await;
        match result.class {
            DocumentClass::Error { reason, .. } => assert!(reason.contains("502")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_model_becomes_error_result() {
        let (clf, invoker) = classifier(Ok("{}"));
        let result = clf
            .classify(&ClassificationRequest::new("text", "llama"))
            .await;
        assert!(result.is_error());
        assert_eq!(invoker.calls.load(Ordering::SeqCst), 0);
    }
}
