//! Human feedback records, encoded entirely in a blob name.
//!
//! A record is persisted as a zero-byte blob whose name is the record:
//!
//! ```text
//! {S|F}___{YYMMDDHHMMSS}___{model}___{pred doc}___{pred sub}___{pred desc}___{actual doc}___{actual sub}___{actual desc}___{source file}.txt
//! ```
//!
//! Downstream log parsing depends on this layout byte for byte.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::label::{ClassificationResult, truncate_chars};
use crate::normalize::{DocType, NormalizedLabel, SubType, normalize};

pub const DELIMITER: &str = "___";
pub const EXTENSION: &str = ".txt";
pub const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";
pub const FIELD_COUNT: usize = 10;
/// Longest description a reviewer may enter for a manual correction.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

const FORBIDDEN: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
const EMPTY_DESCRIPTION: &str = "NA";
const UNKNOWN_CODE: &str = "unknown";
const MANUAL_CODE: &str = "manual";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("feedback name has {found} fields, expected {FIELD_COUNT}")]
    FieldCount { found: usize },
    #[error("unknown feedback status code: {0}")]
    Status(String),
}

/// Whether the reviewer accepted the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackStatus {
    Success,
    Failure,
}

impl FeedbackStatus {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Success => "S",
            Self::Failure => "F",
        }
    }

    pub fn from_code(code: &str) -> Result<Self, FeedbackError> {
        match code {
            "S" => Ok(Self::Success),
            "F" => Ok(Self::Failure),
            other => Err(FeedbackError::Status(other.to_string())),
        }
    }
}

/// One side (predicted or actual) of a record, already reduced to codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLabel {
    pub doc_type: String,
    pub sub_type: String,
    pub description: String,
}

impl EncodedLabel {
    fn encode(label: &NormalizedLabel, fallback: &str) -> Self {
        Self {
            doc_type: label.doc_type.code().unwrap_or(fallback).to_string(),
            sub_type: label.sub_type.code().unwrap_or(fallback).to_string(),
            description: sanitize(&label.description),
        }
    }
}

/// A single human verdict on a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub status: FeedbackStatus,
    pub timestamp: DateTime<Utc>,
    pub model_name: String,
    pub predicted: EncodedLabel,
    pub actual: EncodedLabel,
    pub source_filename: String,
}

impl FeedbackRecord {
    /// Build a record from a prediction and the reviewer's verdict.
    ///
    /// `correction == None` means the prediction was accepted; the actual side
    /// then mirrors the predicted side. Codes outside the known set encode as
    /// `unknown` on the predicted side and `manual` on the actual side.
    pub fn new(
        predicted: &ClassificationResult,
        model_name: &str,
        correction: Option<&NormalizedLabel>,
        source_filename: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let predicted = EncodedLabel::encode(&normalize(predicted), UNKNOWN_CODE);
        let (status, actual) = match correction {
            None => (FeedbackStatus::Success, predicted.clone()),
            Some(label) => (
                FeedbackStatus::Failure,
                EncodedLabel::encode(label, MANUAL_CODE),
            ),
        };
        Self {
            status,
            timestamp,
            model_name: collapse_underscores(model_name),
            predicted,
            actual,
            source_filename: source_filename.to_string(),
        }
    }

    /// The blob name under which this record is persisted.
    pub fn blob_name(&self) -> String {
        let timestamp = self.timestamp.format(TIMESTAMP_FORMAT).to_string();
        let fields: [&str; FIELD_COUNT] = [
            self.status.code(),
            &timestamp,
            &self.model_name,
            &self.predicted.doc_type,
            &self.predicted.sub_type,
            &self.predicted.description,
            &self.actual.doc_type,
            &self.actual.sub_type,
            &self.actual.description,
            &self.source_filename,
        ];
        format!("{}{EXTENSION}", fields.join(DELIMITER))
    }

    /// Split a blob name back into its ten fields.
    pub fn decode(name: &str) -> Result<FeedbackFields, FeedbackError> {
        let body = name.strip_suffix(EXTENSION).unwrap_or(name);
        // The source filename is last and may itself contain the delimiter.
        let parts: Vec<&str> = body.splitn(FIELD_COUNT, DELIMITER).collect();
        if parts.len() != FIELD_COUNT {
            return Err(FeedbackError::FieldCount { found: parts.len() });
        }
        let label = |i: usize| EncodedLabel {
            doc_type: parts[i].to_string(),
            sub_type: parts[i + 1].to_string(),
            description: parts[i + 2].to_string(),
        };
        Ok(FeedbackFields {
            status: FeedbackStatus::from_code(parts[0])?,
            timestamp: parts[1].to_string(),
            model_name: parts[2].to_string(),
            predicted: label(3),
            actual: label(6),
            source_filename: parts[9].to_string(),
        })
    }
}

/// Fields recovered from a feedback blob name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackFields {
    pub status: FeedbackStatus,
    /// `YYMMDDHHMMSS`, left unparsed.
    pub timestamp: String,
    pub model_name: String,
    pub predicted: EncodedLabel,
    pub actual: EncodedLabel,
    pub source_filename: String,
}

/// Strip filesystem-hostile characters and collapse underscore runs so the
/// result cannot contain [`DELIMITER`]; an empty result becomes `NA`.
pub fn sanitize(description: &str) -> String {
    let cleaned: String = description
        .chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .collect();
    let cleaned = collapse_underscores(&cleaned);
    if cleaned.is_empty() {
        EMPTY_DESCRIPTION.to_string()
    } else {
        cleaned
    }
}

/// Replace every run of `_` with a single `_`.
fn collapse_underscores(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Build a reviewer's correction from free-text fields.
///
/// The description is capped at [`MAX_DESCRIPTION_CHARS`] characters.
pub fn manual_label(doc_type: &str, sub_type: &str, description: &str) -> NormalizedLabel {
    NormalizedLabel::new(
        DocType::parse(doc_type),
        SubType::parse(sub_type),
        truncate_chars(description.trim(), MAX_DESCRIPTION_CHARS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::{DocumentClass, SummonsDetails};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 5, 7).unwrap()
    }

    fn summons() -> ClassificationResult {
        ClassificationResult::new(
            DocumentClass::Summons(Some(SummonsDetails {
                defendant_name: Some("EUI".into()),
                date_of_service: Some("14/03".into()),
            })),
            Some(0.92),
        )
    }

    #[test]
    fn correct_verdict_mirrors_prediction() {
        let rec = FeedbackRecord::new(&summons(), "gpt-4o-mini", None, "claim.pdf", ts());
        assert_eq!(rec.status, FeedbackStatus::Success);
        assert_eq!(rec.actual, rec.predicted);
        assert_eq!(
            rec.blob_name(),
            "S___250314090507___gpt-4o-mini___C___S___LIT; SUMMONS EUI 1403___C___S___LIT; SUMMONS EUI 1403___claim.pdf.txt"
        );
    }

    #[test]
    fn incorrect_verdict_uses_manual_codes() {
        let manual = manual_label("Insured", "Query Chaser", "");
        let rec = FeedbackRecord::new(&summons(), "gpt-4o-mini", Some(&manual), "a.pdf", ts());
        assert_eq!(rec.status, FeedbackStatus::Failure);
        assert_eq!(rec.actual.doc_type, "I");
        assert_eq!(rec.actual.sub_type, "QC");
        assert_eq!(rec.actual.description, "NA");
        assert_eq!(rec.predicted.doc_type, "C");
        assert_eq!(rec.predicted.sub_type, "S");
    }

    #[test]
    fn unknown_and_manual_fallbacks_are_asymmetric() {
        let failed = ClassificationResult::error("No JSON object in response");
        let manual = manual_label("Bank", "Statement", "x");
        let rec = FeedbackRecord::new(&failed, "phi", Some(&manual), "s.png", ts());
        assert_eq!(rec.predicted.doc_type, "unknown");
        assert_eq!(rec.predicted.sub_type, "unknown");
        assert_eq!(rec.predicted.description, "NA");
        assert_eq!(rec.actual.doc_type, "manual");
        assert_eq!(rec.actual.sub_type, "manual");
    }

    #[test]
    fn sanitize_strips_hostile_characters() {
        let out = sanitize(r#"a\b/c:d*e?f"g<h>i|j"#);
        assert_eq!(out, "abcdefghij");
        assert!(!out.contains(FORBIDDEN));
    }

    #[test]
    fn sanitize_is_idempotent() {
        for s in ["", "LIT; SUMMONS EUI 14/03", "NA", "<>", "plain text", "a___b", "_<_>_"] {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn delimiter_in_description_or_model_keeps_ten_fields() {
        assert_eq!(sanitize("A___B"), "A_B");
        assert_eq!(sanitize("a__b_c"), "a_b_c");

        let manual = manual_label("Other", "Other", "see ref A___B");
        let rec = FeedbackRecord::new(&summons(), "odd___model", Some(&manual), "claim.pdf", ts());
        let name = rec.blob_name();
        assert_eq!(name.trim_end_matches(EXTENSION).split(DELIMITER).count(), FIELD_COUNT);

        let fields = FeedbackRecord::decode(&name).unwrap();
        assert_eq!(fields.model_name, "odd_model");
        assert_eq!(fields.actual.description, "see ref A_B");
        assert_eq!(fields.source_filename, "claim.pdf");
    }

    #[test]
    fn sanitize_empty_becomes_na() {
        assert_eq!(sanitize(""), "NA");
        assert_eq!(sanitize("///"), "NA");
    }

    #[test]
    fn decode_recovers_ten_fields_in_order() {
        let manual = manual_label("SOLICITOR-TP", "Notice to Issue", "s152 letter");
        let rec = FeedbackRecord::new(
            &summons(),
            "Phi-4-multimodal-instruct",
            Some(&manual),
            "scan 01.pdf",
            ts(),
        );
        let name = rec.blob_name();
        assert_eq!(name.trim_end_matches(EXTENSION).split(DELIMITER).count(), FIELD_COUNT);

        let fields = FeedbackRecord::decode(&name).unwrap();
        assert_eq!(fields.status, FeedbackStatus::Failure);
        assert_eq!(fields.timestamp, "250314090507");
        assert_eq!(fields.model_name, "Phi-4-multimodal-instruct");
        assert_eq!(fields.predicted, rec.predicted);
        assert_eq!(fields.actual.doc_type, "STP");
        assert_eq!(fields.actual.sub_type, "N2I");
        assert_eq!(fields.actual.description, "s152 letter");
        assert_eq!(fields.source_filename, "scan 01.pdf");
    }

    #[test]
    fn decode_rejects_short_names() {
        assert_eq!(
            FeedbackRecord::decode("S___250314090507___model.txt"),
            Err(FeedbackError::FieldCount { found: 3 })
        );
    }

    #[test]
    fn decode_rejects_bad_status() {
        let name = "X___1___m___C___S___NA___C___S___NA___f.pdf.txt";
        assert_eq!(
            FeedbackRecord::decode(name),
            Err(FeedbackError::Status("X".into()))
        );
    }

    #[test]
    fn manual_description_is_capped() {
        let long = "d".repeat(MAX_DESCRIPTION_CHARS + 50);
        let label = manual_label("Other", "Other", &long);
        assert_eq!(label.description.chars().count(), MAX_DESCRIPTION_CHARS);
    }
}
