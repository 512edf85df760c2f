use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use doclabel_ai::Classifier;
use doclabel_core::config::{DEFAULT_CONTAINER, DOCUMENT_INTELLIGENCE_MODEL};
use doclabel_core::{
    ClassificationRequest, ClassificationResult, FeedbackRecord, NormalizedLabel, normalize,
};
use doclabel_ocr::{OcrError, TextExtractor};
use doclabel_store::{BlobStore, StoreError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Uploaded,
    ClassifiedOk,
    ClassifiedError,
    FeedbackPending,
    FeedbackSubmitted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Uploaded => "uploaded",
            Self::ClassifiedOk => "classified",
            Self::ClassifiedError => "classification failed",
            Self::FeedbackPending => "awaiting manual classification",
            Self::FeedbackSubmitted => "feedback submitted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    #[error("text extraction failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("document upload failed: {0}")]
    Store(#[from] StoreError),
}

/// Where uploaded documents and feedback markers go.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub container: String,
    pub ocr_model: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            ocr_model: DOCUMENT_INTELLIGENCE_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub text: String,
}

/// The current prediction together with the model that produced it.
#[derive(Debug, Clone)]
pub struct Classification {
    pub model_name: String,
    pub result: ClassificationResult,
    pub label: NormalizedLabel,
}

/// Result of persisting a feedback marker. `recorded == false` means the
/// store rejected the write; the reviewer may submit again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackOutcome {
    pub recorded: bool,
    pub blob_name: String,
}

pub struct Session {
    classifier: Arc<Classifier>,
    ocr: Arc<dyn TextExtractor>,
    store: Arc<dyn BlobStore>,
    config: SessionConfig,
    state: SessionState,
    document: Option<Document>,
    classification: Option<Classification>,
}

impl Session {
    pub fn new(
        classifier: Arc<Classifier>,
        ocr: Arc<dyn TextExtractor>,
        store: Arc<dyn BlobStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            classifier,
            ocr,
            store,
            config,
            state: SessionState::Idle,
            document: None,
            classification: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn classification(&self) -> Option<&Classification> {
        self.classification.as_ref()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Drop the document and any prediction.
    pub fn reset(&mut self) {
        self.document = None;
        self.classification = None;
        self.state = SessionState::Idle;
    }

    /// Start over with a new document: store the original, then extract its text.
    ///
    /// Any failure leaves the session `Idle`.
    pub async fn upload(
        &mut self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<&Document, SessionError> {
        self.reset();

        self.store
            .put(&self.config.container, filename, bytes, true)
            .await?;
        let text = self.ocr.analyze(bytes, &self.config.ocr_model).await?;

        info!(filename, chars = text.chars().count(), "document uploaded");
        self.state = SessionState::Uploaded;
        Ok(&*self.document.insert(Document {
            filename: filename.to_string(),
            text,
        }))
    }

    /// Classify the uploaded document, replacing any earlier prediction.
    pub async fn classify(&mut self, model: &str) -> Result<&Classification, SessionError> {
        let text = match (&self.document, self.state) {
            (
                Some(doc),
                SessionState::Uploaded
                | SessionState::ClassifiedOk
                | SessionState::ClassifiedError
                | SessionState::FeedbackPending,
            ) => doc.text.clone(),
            _ => return Err(self.invalid("classify")),
        };

        let model_name = self
            .classifier
            .registry()
            .resolve(model)
            .map(|invoker| invoker.model_name().to_string())
            .unwrap_or_else(|_| model.to_string());
        let result = self
            .classifier
            .classify(&ClassificationRequest::new(&text, model_name.as_str()))
            .await;

        self.state = if result.is_error() {
            SessionState::ClassifiedError
        } else {
            SessionState::ClassifiedOk
        };
        Ok(&*self.classification.insert(Classification {
            label: normalize(&result),
            model_name,
            result,
        }))
    }

    /// Accept the prediction as-is.
    pub async fn mark_correct(&mut self) -> Result<FeedbackOutcome, SessionError> {
        if self.state != SessionState::ClassifiedOk {
            return Err(self.invalid("mark the classification correct"));
        }
        let outcome = self.record_feedback(None).await?;
        if outcome.recorded {
            self.state = SessionState::FeedbackSubmitted;
        }
        Ok(outcome)
    }

    /// Reject the prediction; a manual classification must follow.
    pub fn mark_incorrect(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::ClassifiedOk {
            return Err(self.invalid("mark the classification incorrect"));
        }
        self.state = SessionState::FeedbackPending;
        Ok(())
    }

    /// Record the reviewer's own classification.
    pub async fn submit_manual(
        &mut self,
        label: NormalizedLabel,
    ) -> Result<FeedbackOutcome, SessionError> {
        if !matches!(
            self.state,
            SessionState::FeedbackPending | SessionState::ClassifiedError
        ) {
            return Err(self.invalid("submit a manual classification"));
        }
        let outcome = self.record_feedback(Some(&label)).await?;
        self.state = if outcome.recorded {
            SessionState::FeedbackSubmitted
        } else {
            SessionState::FeedbackPending
        };
        Ok(outcome)
    }

    async fn record_feedback(
        &self,
        correction: Option<&NormalizedLabel>,
    ) -> Result<FeedbackOutcome, SessionError> {
        let (Some(doc), Some(current)) = (&self.document, &self.classification) else {
            return Err(self.invalid("record feedback"));
        };
        let record = FeedbackRecord::new(
            &current.result,
            &current.model_name,
            correction,
            &doc.filename,
            Utc::now(),
        );
        let blob_name = record.blob_name();

        let recorded = match self
            .store
            .put(&self.config.container, &blob_name, &[], true)
            .await
        {
            Ok(()) => {
                info!(blob = %blob_name, "feedback recorded");
                true
            }
            Err(e) => {
                warn!(blob = %blob_name, error = %e, "feedback not recorded");
                false
            }
        };
        Ok(FeedbackOutcome {
            recorded,
            blob_name,
        })
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use doclabel_ai::{ModelError, ModelInvoker, ModelRegistry, Prompt};
    use doclabel_core::feedback::manual_label;
    use doclabel_core::{DocType, FeedbackStatus, SubType};
    use std::sync::Mutex;

    struct FixedText(Result<&'static str, &'static str>);

    #[async_trait]
    impl TextExtractor for FixedText {
        async fn analyze(&self, _document: &[u8], _model_id: &str) -> Result<String, OcrError> {
            self.0
                .map(str::to_string)
                .map_err(|e| OcrError::AnalysisFailed(e.to_string()))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        puts: Mutex<Vec<(String, String, usize)>>,
        fail_markers: Mutex<bool>,
    }

    impl MemoryStore {
        fn blobs(&self) -> Vec<String> {
            self.puts.lock().unwrap().iter().map(|(_, b, _)| b.clone()).collect()
        }
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn put(
            &self,
            container: &str,
            blob: &str,
            bytes: &[u8],
            _overwrite: bool,
        ) -> Result<(), StoreError> {
            if bytes.is_empty() && *self.fail_markers.lock().unwrap() {
                return Err(StoreError::Upload {
                    status: 503,
                    code: "ServerBusy".into(),
                });
            }
            self.puts
                .lock()
                .unwrap()
                .push((container.into(), blob.into(), bytes.len()));
            Ok(())
        }
    }

    struct Canned(&'static str);

    #[async_trait]
    impl ModelInvoker for Canned {
        fn model_name(&self) -> &str {
            "gpt-4o-mini"
        }
        async fn invoke(&self, _prompt: &Prompt) -> Result<String, ModelError> {
            Ok(self.0.to_string())
        }
    }

    fn session(
        reply: &'static str,
        text: Result<&'static str, &'static str>,
    ) -> (Session, Arc<MemoryStore>) {
        let mut registry = ModelRegistry::new("gpt-4o-mini");
        registry.register(Arc::new(Canned(reply)));
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(
            Arc::new(Classifier::new(registry)),
            Arc::new(FixedText(text)),
            store.clone(),
            SessionConfig::default(),
        );
        (session, store)
    }

    const SUMMONS: &str = r#"{"class":"Summons","confidence":0.9,"details":{"defendant_name":"EUI","date_of_service":"14/03"}}"#;

    #[tokio::test]
    async fn correct_flow_records_success_marker() {
        let (mut s, store) = session(SUMMONS, Ok("CLAIM FORM"));
        s.upload("claim.pdf", b"%PDF").await.unwrap();
        assert_eq!(s.state(), SessionState::Uploaded);

        let c = s.classify("gpt4o_mini").await.unwrap();
        assert_eq!(c.model_name, "gpt-4o-mini");
        assert_eq!(c.label.description, "LIT; SUMMONS EUI 14/03");
        assert_eq!(s.state(), SessionState::ClassifiedOk);

        let outcome = s.mark_correct().await.unwrap();
        assert!(outcome.recorded);
        assert_eq!(s.state(), SessionState::FeedbackSubmitted);

        let fields = FeedbackRecord::decode(&outcome.blob_name).unwrap();
        assert_eq!(fields.status, FeedbackStatus::Success);
        assert_eq!(fields.model_name, "gpt-4o-mini");
        assert_eq!(fields.actual, fields.predicted);
        assert_eq!(fields.source_filename, "claim.pdf");
        assert_eq!(store.blobs(), vec!["claim.pdf".to_string(), outcome.blob_name]);
    }

    #[tokio::test]
    async fn incorrect_flow_requires_manual_label() {
        let (mut s, _) = session(SUMMONS, Ok("text"));
        s.upload("a.pdf", b"x").await.unwrap();
        s.classify("gpt-4o-mini").await.unwrap();
        s.mark_incorrect().unwrap();
        assert_eq!(s.state(), SessionState::FeedbackPending);

        let outcome = s
            .submit_manual(manual_label("Insured", "Query Chaser", ""))
            .await
            .unwrap();
        let fields = FeedbackRecord::decode(&outcome.blob_name).unwrap();
        assert_eq!(fields.status, FeedbackStatus::Failure);
        let actual = &fields.actual;
        assert_eq!(
            (actual.doc_type.as_str(), actual.sub_type.as_str(), actual.description.as_str()),
            ("I", "QC", "NA")
        );
        assert_eq!(fields.predicted.doc_type, "C");
    }

    #[tokio::test]
    async fn error_result_goes_straight_to_manual() {
        let (mut s, _) = session("no json here", Ok("text"));
        s.upload("a.pdf", b"x").await.unwrap();
        let c = s.classify("gpt-4o-mini").await.unwrap();
        assert_eq!(c.label.doc_type, DocType::Error);
        assert_eq!(s.state(), SessionState::ClassifiedError);

        assert!(matches!(
            s.mark_correct().await,
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(s.mark_incorrect().is_err());

        let label = NormalizedLabel::new(DocType::Court, SubType::Judgement, "(1) LIT; JUDGMENT");
        let outcome = s.submit_manual(label).await.unwrap();
        let fields = FeedbackRecord::decode(&outcome.blob_name).unwrap();
        assert_eq!(fields.predicted.doc_type, "unknown");
        assert_eq!(fields.actual.sub_type, "J");
        assert_eq!(s.state(), SessionState::FeedbackSubmitted);
    }

    #[tokio::test]
    async fn failed_marker_keeps_feedback_pending() {
        let (mut s, store) = session(SUMMONS, Ok("text"));
        s.upload("a.pdf", b"x").await.unwrap();
        s.classify("gpt-4o-mini").await.unwrap();
        s.mark_incorrect().unwrap();

        *store.fail_markers.lock().unwrap() = true;
        let label = manual_label("Other", "Other", "");
        let outcome = s.submit_manual(label.clone()).await.unwrap();
        assert!(!outcome.recorded);
        assert_eq!(s.state(), SessionState::FeedbackPending);

        *store.fail_markers.lock().unwrap() = false;
        assert!(s.submit_manual(label).await.unwrap().recorded);
        assert_eq!(s.state(), SessionState::FeedbackSubmitted);
    }

    #[tokio::test]
    async fn upload_resets_previous_document() {
        let (mut s, _) = session(SUMMONS, Ok("text"));
        s.upload("first.pdf", b"x").await.unwrap();
        s.classify("gpt-4o-mini").await.unwrap();

        s.upload("second.pdf", b"y").await.unwrap();
        assert_eq!(s.state(), SessionState::Uploaded);
        assert!(s.classification().is_none());
        assert_eq!(s.document().unwrap().filename, "second.pdf");
    }

    #[tokio::test]
    async fn ocr_failure_leaves_session_idle() {
        let (mut s, _) = session(SUMMONS, Err("corrupt file"));
        let err = s.upload("a.pdf", b"x").await.unwrap_err();
        assert!(matches!(err, SessionError::Ocr(_)));
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.document().is_none());
    }

    #[tokio::test]
    async fn actions_out_of_order_are_rejected() {
        let (mut s, _) = session(SUMMONS, Ok("text"));
        assert!(matches!(
            s.classify("gpt-4o-mini").await,
            Err(SessionError::InvalidTransition { action: "classify", state: SessionState::Idle })
        ));
        assert!(s.mark_incorrect().is_err());
        assert!(s.submit_manual(manual_label("Other", "Other", "")).await.is_err());

        s.upload("a.pdf", b"x").await.unwrap();
        assert!(s.mark_correct().await.is_err());

        s.reset();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.document().is_none());
    }
}
