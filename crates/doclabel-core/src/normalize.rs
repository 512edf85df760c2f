//! Canonical (document type, subtype, description) triples used for filing.
//!
//! [`normalize`] is a pure, total mapping from a [`ClassificationResult`]:
//!
//! | class             | doc type     | subtype                       | description                      |
//! |-------------------|--------------|-------------------------------|----------------------------------|
//! | Summons           | Court        | Summons                       | `LIT; SUMMONS {name} {date}`     |
//! | Judgment          | Court        | Judgement                     | `(1) LIT; JUDGMENT`              |
//! | Solicitor_TP_S152 | SOLICITOR-TP | Notice to Issue               |                                  |
//! | Chaser            | Insured      | Query Chaser                  |                                  |
//! | Other / unknown   | Other        | Other                         |                                  |
//! | Error             | Error        | `Classification failed: ...`  |                                  |

use std::fmt;

use crate::label::{ClassificationResult, DocumentClass};

pub const DEFENDANT_UNKNOWN: &str = "(Defendant unknown)";
pub const DATE_UNKNOWN: &str = "(Date unknown)";
pub const JUDGMENT_DESCRIPTION: &str = "(1) LIT; JUDGMENT";

/// Top-level filing category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocType {
    Court,
    SolicitorTp,
    Insured,
    Other,
    Error,
    /// A manually entered value outside the known set.
    Custom(String),
}

impl DocType {
    /// Values a reviewer may pick when correcting a prediction.
    pub const CHOICES: [DocType; 4] = [Self::Court, Self::SolicitorTp, Self::Insured, Self::Other];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Court => "Court",
            Self::SolicitorTp => "SOLICITOR-TP",
            Self::Insured => "Insured",
            Self::Other => "Other",
            Self::Error => "Error",
            Self::Custom(s) => s,
        }
    }

    /// Parse a full-text document type. Unknown text is kept as [`DocType::Custom`].
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Court" => Self::Court,
            "SOLICITOR-TP" => Self::SolicitorTp,
            "Insured" => Self::Insured,
            "Other" => Self::Other,
            "Error" => Self::Error,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Short feedback code, or `None` outside the known set.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Court => Some("C"),
            Self::SolicitorTp => Some("STP"),
            Self::Insured => Some("I"),
            Self::Other => Some("O"),
            Self::Error | Self::Custom(_) => None,
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Second-level filing category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubType {
    Judgement,
    Summons,
    NoticeToIssue,
    QueryChaser,
    Other,
    /// Carries the failure reason; rendered as `Classification failed: {reason}`.
    Failed(String),
    Custom(String),
}

impl SubType {
    pub const CHOICES: [SubType; 5] = [
        Self::Judgement,
        Self::Summons,
        Self::NoticeToIssue,
        Self::QueryChaser,
        Self::Other,
    ];

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Judgement" => Self::Judgement,
            "Summons" => Self::Summons,
            "Notice to Issue" => Self::NoticeToIssue,
            "Query Chaser" => Self::QueryChaser,
            "Other" => Self::Other,
            other => match other.strip_prefix("Classification failed: ") {
                Some(reason) => Self::Failed(reason.to_string()),
                None => Self::Custom(other.to_string()),
            },
        }
    }

    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Judgement => Some("J"),
            Self::Summons => Some("S"),
            Self::NoticeToIssue => Some("N2I"),
            Self::QueryChaser => Some("QC"),
            Self::Other => Some("O"),
            Self::Failed(_) | Self::Custom(_) => None,
        }
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Judgement => f.write_str("Judgement"),
            Self::Summons => f.write_str("Summons"),
            Self::NoticeToIssue => f.write_str("Notice to Issue"),
            Self::QueryChaser => f.write_str("Query Chaser"),
            Self::Other => f.write_str("Other"),
            Self::Failed(reason) => write!(f, "Classification failed: {reason}"),
            Self::Custom(s) => f.write_str(s),
        }
    }
}

/// Canonical triple derived from a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLabel {
    pub doc_type: DocType,
    pub sub_type: SubType,
    pub description: String,
}

impl NormalizedLabel {
    pub fn new(doc_type: DocType, sub_type: SubType, description: impl Into<String>) -> Self {
        Self {
            doc_type,
            sub_type,
            description: description.into(),
        }
    }
}

impl From<&ClassificationResult> for NormalizedLabel {
    fn from(result: &ClassificationResult) -> Self {
        normalize(result)
    }
}

/// Map a classification onto its canonical filing triple.
pub fn normalize(result: &ClassificationResult) -> NormalizedLabel {
    match &result.class {
        DocumentClass::Summons(details) => {
            let details = details.as_ref();
            let name = details
                .and_then(|d| d.defendant_name.as_deref())
                .unwrap_or(DEFENDANT_UNKNOWN);
            let date = details
                .and_then(|d| d.date_of_service.as_deref())
                .unwrap_or(DATE_UNKNOWN);
            NormalizedLabel::new(
                DocType::Court,
                SubType::Summons,
                format!("LIT; SUMMONS {name} {date}"),
            )
        }
        DocumentClass::Judgment => {
            NormalizedLabel::new(DocType::Court, SubType::Judgement, JUDGMENT_DESCRIPTION)
        }
        DocumentClass::SolicitorTpS152 => {
            NormalizedLabel::new(DocType::SolicitorTp, SubType::NoticeToIssue, "")
        }
        DocumentClass::Chaser => NormalizedLabel::new(DocType::Insured, SubType::QueryChaser, ""),
        DocumentClass::Other | DocumentClass::Unrecognized(_) => {
            NormalizedLabel::new(DocType::Other, SubType::Other, "")
        }
        DocumentClass::Error { reason, .. } => {
            NormalizedLabel::new(DocType::Error, SubType::Failed(reason.clone()), "")
        }
    }
}
