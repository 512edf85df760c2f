//! Classification taxonomy: the five document categories a model may assign,
//! plus the internal `Error` outcome, and the parsed result that carries them.
//!
//! The model's JSON answer looks like:
//!
//! ```json
//! {"class": "Summons", "confidence": 0.92,
//!  "details": {"defendant_name": "EUI", "date_of_service": "14/03"}}
//! ```
//!
//! `details` is only meaningful for Summons and is dropped for every other class.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::MAX_CHARS;

/// Extraction details attached to a Summons.
///
/// Each field is independently optional: the model may find a defendant but
/// no date of service, or the other way round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummonsDetails {
    pub defendant_name: Option<String>,
    pub date_of_service: Option<String>,
}

/// The category assigned to a document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentClass {
    Summons(Option<SummonsDetails>),
    Judgment,
    SolicitorTpS152,
    Chaser,
    Other,
    /// A `class` value the model invented outside the fixed taxonomy.
    Unrecognized(String),
    /// Classification could not be completed. `raw` keeps the model text, if any.
    Error { reason: String, raw: Option<String> },
}

impl DocumentClass {
    /// The label as it appears in the model's JSON schema.
    pub fn label(&self) -> &str {
        match self {
            Self::Summons(_) => "Summons",
            Self::Judgment => "Judgment",
            Self::SolicitorTpS152 => "Solicitor_TP_S152",
            Self::Chaser => "Chaser",
            Self::Other => "Other",
            Self::Unrecognized(s) => s,
            Self::Error { .. } => "Error",
        }
    }
}

/// Parsed model output for one classification attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub class: DocumentClass,
    /// `None` when the model omitted it or returned something outside `[0, 1]`.
    pub confidence: Option<f64>,
}

impl ClassificationResult {
    pub fn new(class: DocumentClass, confidence: Option<f64>) -> Self {
        Self { class, confidence }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            class: DocumentClass::Error {
                reason: reason.into(),
                raw: None,
            },
            confidence: None,
        }
    }

    pub fn error_with_raw(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            class: DocumentClass::Error {
                reason: reason.into(),
                raw: Some(raw.into()),
            },
            confidence: None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.class, DocumentClass::Error { .. })
    }

    /// Interpret a JSON object returned by the model.
    ///
    /// Returns `None` when the object has no string `class` field. Unknown class
    /// names become [`DocumentClass::Unrecognized`] rather than failing.
    pub fn from_json(value: &Value) -> Option<Self> {
        let label = value.get("class")?.as_str()?.trim();

        let class = match label.to_ascii_lowercase().as_str() {
            "summons" => DocumentClass::Summons(value.get("details").and_then(parse_details)),
            "judgment" | "judgement" => DocumentClass::Judgment,
            "solicitor_tp_s152" => DocumentClass::SolicitorTpS152,
            "chaser" => DocumentClass::Chaser,
            "other" => DocumentClass::Other,
            "error" => DocumentClass::Error {
                reason: non_empty_str(value.get("reason"))
                    .unwrap_or_else(|| "Unknown error".to_string()),
                raw: None,
            },
            _ => DocumentClass::Unrecognized(label.to_string()),
        };

        Some(Self {
            class,
            confidence: parse_confidence(value.get("confidence")),
        })
    }
}

/// Immutable input to one classification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub text: String,
    pub model_name: String,
}

impl ClassificationRequest {
    /// Build a request, keeping only the first [`MAX_CHARS`] characters of `text`.
    pub fn new(text: &str, model_name: impl Into<String>) -> Self {
        Self {
            text: truncate_chars(text, MAX_CHARS).to_string(),
            model_name: model_name.into(),
        }
    }
}

/// Keep the first `max` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn parse_details(value: &Value) -> Option<SummonsDetails> {
    if !value.is_object() {
        return None;
    }
    Some(SummonsDetails {
        defendant_name: non_empty_str(value.get("defendant_name")),
        date_of_service: non_empty_str(value.get("date_of_service")),
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accept a JSON number or numeric string in `[0, 1]`; anything else is dropped.
fn parse_confidence(value: Option<&Value>) -> Option<f64> {
    let value = value?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null => return None,
        _ => None,
    };
    match parsed {
        Some(c) if (0.0..=1.0).contains(&c) => Some(c),
        _ => {
            warn!(confidence = %value, "discarding confidence outside [0, 1]");
            None
        }
    }
}
