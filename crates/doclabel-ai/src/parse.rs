//! Pull a single JSON object out of raw model text.
//!
//! Models often wrap the object in prose ("Sure! {...}"). The greedy pattern
//! spans from the first `{` to the last `}`; exactly one parse is attempted.

use std::sync::LazyLock;

use doclabel_core::ClassificationResult;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex is valid"));

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No JSON object in response")]
    NoJsonInResponse,

    #[error("Invalid JSON in response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response JSON has no 'class' field")]
    MissingClass,
}

/// Extract and interpret the JSON object in `raw`.
pub fn extract_classification(raw: &str) -> Result<ClassificationResult, ParseError> {
    let candidate = JSON_OBJECT
        .find(raw)
        .ok_or(ParseError::NoJsonInResponse)?
        .as_str();
    let value: serde_json::Value = serde_json::from_str(candidate)?;
    ClassificationResult::from_json(&value).ok_or(ParseError::MissingClass)
}

/// Like [`extract_classification`], but failures become an `Error` result
/// that keeps the raw text for diagnostics.
pub fn parse_response(raw: &str) -> ClassificationResult {
    match extract_classification(raw) {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, raw_len = raw.len(), "could not parse model response");
            ClassificationResult::error_with_raw(e.to_string(), raw)
        }
    }
}
