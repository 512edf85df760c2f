//! Vertical card display for classifications and feedback records.

use std::fmt::Write;

use doclabel_ai::ModelRegistry;
use doclabel_core::feedback::EncodedLabel;
use doclabel_core::{DocumentClass, FeedbackFields, FeedbackStatus};
use doclabel_host::Classification;

const LABEL_WIDTH: usize = 18;

// ── Public API ──

pub fn print_classification(c: &Classification) {
    print!("{}", render_classification(c));
}

pub fn print_feedback_fields(fields: &FeedbackFields) {
    print!("{}", render_feedback_fields(fields));
}

pub fn print_models(registry: &ModelRegistry) {
    println!("=== Models ===");
    for (name, ready) in registry.models() {
        let default = if name == registry.default_model() { " (default)" } else { "" };
        let status = if ready { "ready" } else { "missing credentials" };
        println!("  {name:<34} {status}{default}");
    }
}

// ── Rendering ──

fn render_classification(c: &Classification) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", c.result.class.label());

    row(&mut out, "Model", &c.model_name);
    if let Some(confidence) = c.result.confidence {
        row(&mut out, "Confidence", &format!("{:.0}%", confidence * 100.0));
    }
    match &c.result.class {
        DocumentClass::Summons(Some(details)) => {
            if let Some(name) = &details.defendant_name {
                row(&mut out, "Defendant", name);
            }
            if let Some(date) = &details.date_of_service {
                row(&mut out, "Date of service", date);
            }
        }
        DocumentClass::Error { reason, raw } => {
            row(&mut out, "Reason", reason);
            if let Some(raw) = raw {
                row(&mut out, "Model output", raw);
            }
        }
        _ => {}
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Label");
    row(&mut out, "Type", c.label.doc_type.as_str());
    row(&mut out, "Sub-type", &c.label.sub_type.to_string());
    if !c.label.description.is_empty() {
        row(&mut out, "Description", &c.label.description);
    }
    out
}

fn render_feedback_fields(f: &FeedbackFields) -> String {
    let mut out = String::new();
    let verdict = match f.status {
        FeedbackStatus::Success => "correct",
        FeedbackStatus::Failure => "incorrect",
    };
    let _ = writeln!(out, "=== {} ===", f.source_filename);
    row(&mut out, "Verdict", verdict);
    row(&mut out, "Timestamp", &f.timestamp);
    row(&mut out, "Model", &f.model_name);

    section(&mut out, "Predicted", &f.predicted);
    section(&mut out, "Actual", &f.actual);
    out
}

fn section(out: &mut String, header: &str, label: &EncodedLabel) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{header}");
    row(out, "Type", &label.doc_type);
    row(out, "Sub-type", &label.sub_type);
    row(out, "Description", &label.description);
}

fn row(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "  {name:<LABEL_WIDTH$} {value}");
}
