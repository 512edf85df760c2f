//! Deterministic classification prompt for legal/insurance correspondence.
//!
//! The prompt embeds five category definitions with their keyword rules,
//! Summons-only extraction instructions, and the JSON schema the model must
//! answer with. Text beyond [`MAX_CHARS`] characters is dropped.

use doclabel_core::config::MAX_CHARS;
use doclabel_core::label::truncate_chars;

const SYSTEM_PROMPT: &str = "\
You are an expert document classifier for an insurance claims team. Classify the given text \
into exactly one of the predefined categories and answer strictly in the required JSON format. \
Do not give explanations or any text outside the JSON object.";

/// Category definition used both in the prompt and for keyword hints.
pub struct Category {
    pub label: &'static str,
    pub description: &'static str,
    /// Any one of these marks the category (case-insensitive).
    pub keywords: &'static [&'static str],
    /// Terms that commonly accompany the category but do not decide it.
    pub supporting: &'static [&'static str],
}

pub const SUMMONS: Category = Category {
    label: "Summons",
    description: "A court-issued document notifying a party that they are being sued.",
    keywords: &["Claim Form", "sealed Claim Form", "Writ"],
    supporting: &["Particulars of Claim", "Defendant Response Pack", "Statement of Truth"],
};

pub const JUDGMENT: Category = Category {
    label: "Judgment",
    description: "An official court decision, usually titled 'Judgment for Claimant' or \
                  'General Form of Judgment or Order'.",
    keywords: &["Judgment for Claimant", "General Form of Judgment or Order"],
    supporting: &[],
};

pub const SOLICITOR_TP_S152: Category = Category {
    label: "Solicitor_TP_S152",
    description: "Correspondence relying on Section 152 or the Road Traffic Act.",
    keywords: &[
        "Section 152",
        "S.152",
        "s152",
        "Section 152 (1) (a)",
        "Section 152(1)a",
        "Road Traffic Act",
        "RTA",
        "Road Traffic Act 1988",
    ],
    supporting: &[],
};

pub const CHASER: Category = Category {
    label: "Chaser",
    description: "A follow-up communication that contains no legal or procedural terms.",
    keywords: &[],
    supporting: &[],
};

pub const OTHER: Category = Category {
    label: "Other",
    description: "Text that does not clearly fit any of the categories above.",
    keywords: &[],
    supporting: &[],
};

pub const CATEGORIES: [&Category; 5] = [&SUMMONS, &JUDGMENT, &SOLICITOR_TP_S152, &CHASER, &OTHER];

/// A Chaser must contain none of these.
pub const CHASER_EXCLUDED: &[&str] = &[
    "Claim Form",
    "Summons",
    "Judgment",
    "Writ",
    "Section 151",
    "Section 152",
    "Road Traffic Act",
    "RTA 1988",
];

/// Phrases that signal a follow-up.
pub const FOLLOW_UP_SIGNALS: &[&str] = &[
    "chase",
    "reminder",
    "follow up",
    "follow-up",
    "further to",
    "still awaiting",
    "we have not received",
    "please provide an update",
];

/// Defendant aliases that collapse to `EUI`.
pub const EUI_ALIASES: &[&str] = &[
    "Admiral",
    "EUI Ltd",
    "EUI Limited",
    "EUI Limited (Company Number:...)",
];

const JSON_SCHEMA: &str = r#"{
  "class": "<Summons|Judgment|Solicitor_TP_S152|Chaser|Other>",
  "confidence": <float between 0.0 and 1.0>,
  "details": {
    "defendant_name": "<defendant name, or EUI / PH / PAN>",
    "date_of_service": "<DD/MM>"
  }
}"#;

/// System and user halves of a classification prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Both halves as one message, for transports without a system role.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Build the prompt for `text`, keeping only its first [`MAX_CHARS`] characters.
pub fn build_prompt(text: &str) -> Prompt {
    let text = truncate_chars(text, MAX_CHARS);
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!(
            "{rules}\n\n{extraction}\n\n\
             Return ONLY a JSON object matching this schema, with no markdown fences:\n\
             {JSON_SCHEMA}\n\n\
             Document text:\n\"\"\"\n{text}\n\"\"\"",
            rules = category_rules(),
            extraction = extraction_rules(),
        ),
    }
}

fn quoted(terms: &[&str]) -> String {
    terms
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn category_rules() -> String {
    format!(
        "Categories:\n\
         1. {summons}: {summons_desc} Choose it if the text contains any of {summons_kw} \
         (case-insensitive), even when the document is a covering letter enclosing the claim. \
         Supporting terms: {summons_support}.\n\
         2. {judgment}: {judgment_desc} Requires a title-like phrase such as {judgment_kw}.\n\
         3. {s152}: {s152_desc} Choose it if the text mentions any of {s152_kw} \
         (case-insensitive; tolerate punctuation or spacing between numbers and letters, \
         e.g. \"S. 152\" or \"Section 152(1)(a)\").\n\
         4. {chaser}: {chaser_desc} Choose it only if the text contains NONE of {excluded} \
         AND reads as a follow-up, e.g. {signals}.\n\
         5. {other}: {other_desc}",
        summons = SUMMONS.label,
        summons_desc = SUMMONS.description,
        summons_kw = quoted(SUMMONS.keywords),
        summons_support = quoted(SUMMONS.supporting),
        judgment = JUDGMENT.label,
        judgment_desc = JUDGMENT.description,
        judgment_kw = quoted(JUDGMENT.keywords),
        s152 = SOLICITOR_TP_S152.label,
        s152_desc = SOLICITOR_TP_S152.description,
        s152_kw = quoted(SOLICITOR_TP_S152.keywords),
        chaser = CHASER.label,
        chaser_desc = CHASER.description,
        excluded = quoted(CHASER_EXCLUDED),
        signals = quoted(FOLLOW_UP_SIGNALS),
        other = OTHER.label,
        other_desc = OTHER.description,
    )
}

fn extraction_rules() -> String {
    format!(
        "Only when the class is Summons, fill \"details\":\n\
         - defendant_name: the defendant's full name, ignoring \"Limited\" or \"Ltd\". \
         Use \"EUI\" for any of {eui}. Use \"PH\" when the defendant is the policy holder. \
         Use \"PAN\" when only the defendant's legal representative (solicitors) is identified.\n\
         - date_of_service: the date of service in DD/MM format, preferring the \"Issued\" \
         or \"Submitted\" date fields.\n\
         For every other class set \"details\" to null.",
        eui = quoted(EUI_ALIASES),
    )
}

/// Categories whose keyword rules fire on `text`.
///
/// Used for diagnostics only; the model's answer is never overridden.
pub fn keyword_hints(text: &str) -> Vec<&'static str> {
    let haystack = text.to_lowercase();
    let mut hints: Vec<&'static str> = CATEGORIES
        .into_iter()
        .filter(|c| c.keywords.iter().any(|k| contains_keyword(&haystack, k)))
        .map(|c| c.label)
        .collect();

    let excluded = CHASER_EXCLUDED
        .iter()
        .any(|k| contains_keyword(&haystack, k));
    let follow_up = FOLLOW_UP_SIGNALS.iter().any(|s| haystack.contains(s));
    if !excluded && follow_up {
        hints.push(CHASER.label);
    }
    hints
}

/// Case-insensitive keyword check against an already lower-cased haystack.
///
/// Keywords containing digits are compared with punctuation and spacing
/// removed ("S. 152" matches "s152"); others must sit on word boundaries.
fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    if keyword.chars().any(|c| c.is_ascii_digit()) {
        return compact(haystack).contains(&compact(&keyword));
    }
    haystack.match_indices(&keyword).any(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt("Claim Form enclosed"), build_prompt("Claim Form enclosed"));
    }

    #[test]
    fn prompt_embeds_rules_schema_and_text() {
        let p = build_prompt("Please find enclosed the sealed Claim Form.");
        assert!(p.system.contains("JSON"));
        for label in ["Summons", "Judgment", "Solicitor_TP_S152", "Chaser", "Other"] {
            assert!(p.user.contains(label), "missing category {label}");
        }
        assert!(p.user.contains("\"EUI\""));
        assert!(p.user.contains("\"PH\""));
        assert!(p.user.contains("\"PAN\""));
        assert!(p.user.contains("DD/MM"));
        assert!(p.user.contains("\"class\""));
        assert!(p.user.ends_with("Please find enclosed the sealed Claim Form.\n\"\"\""));
    }

    #[test]
    fn prompt_truncates_long_text_keeping_prefix() {
        let text = format!("{}TAIL-MARKER", "x".repeat(MAX_CHARS));
        let p = build_prompt(&text);
        assert!(!p.user.contains("TAIL-MARKER"));
        assert!(p.user.contains(&"x".repeat(MAX_CHARS)));
    }

    #[test]
    fn combined_joins_system_then_user() {
        let p = Prompt {
            system: "sys".into(),
            user: "usr".into(),
        };
        assert_eq!(p.combined(), "sys\n\nusr");
    }

    #[test]
    fn hints_summons_case_insensitive() {
        assert_eq!(keyword_hints("enclosed: CLAIM FORM and particulars"), vec!["Summons"]);
    }

    #[test]
    fn hints_s152_tolerates_spacing() {
        assert!(keyword_hints("notice under S. 152 of the act").contains(&"Solicitor_TP_S152"));
        assert!(keyword_hints("Section 152(1)(a) applies").contains(&"Solicitor_TP_S152"));
    }

    #[test]
    fn hints_rta_needs_word_boundary() {
        assert!(keyword_hints("see the claims portal").is_empty());
        assert!(keyword_hints("pursuant to the RTA").contains(&"Solicitor_TP_S152"));
    }

    #[test]
    fn hints_chaser_requires_no_legal_terms() {
        assert_eq!(
            keyword_hints("Further to our letter, we are still awaiting your reply."),
            vec!["Chaser"]
        );
        assert!(!keyword_hints("Reminder: the Claim Form was served.").contains(&"Chaser"));
    }
}
