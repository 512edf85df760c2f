//! Interactive review loop.
//!
//! Errors from an action are printed and the loop carries on; only end of
//! input or `quit` leaves it.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use doclabel_core::feedback::manual_label;
use doclabel_core::{DocType, SubType};
use doclabel_host::{FeedbackOutcome, Session, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::display;

type Input = Lines<BufReader<Stdin>>;

const HELP: &str = "\
Commands:
  upload <path>      store a document and extract its text
  classify [model]   classify the current document
  correct            accept the classification
  incorrect          reject it and enter the right one
  manual             enter a classification by hand
  status             show the current document and classification
  models             list available models
  reset              forget the current document
  help               show this list
  quit               leave";

#[derive(Debug, PartialEq, Eq)]
enum Action {
    Upload(PathBuf),
    Classify(Option<String>),
    Correct,
    Incorrect,
    Manual,
    Status,
    Models,
    Reset,
    Help,
    Quit,
}

fn parse_action(line: &str) -> Result<Option<Action>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, Some(rest.trim()).filter(|r| !r.is_empty())),
        None => (line, None),
    };
    let action = match (cmd.to_lowercase().as_str(), arg) {
        ("upload", Some(path)) => Action::Upload(PathBuf::from(path)),
        ("upload", None) => return Err("usage: upload <path>".into()),
        ("classify", model) => Action::Classify(model.map(str::to_string)),
        ("correct", None) => Action::Correct,
        ("incorrect", None) => Action::Incorrect,
        ("manual", None) => Action::Manual,
        ("status", None) => Action::Status,
        ("models", None) => Action::Models,
        ("reset", None) => Action::Reset,
        ("help" | "?", None) => Action::Help,
        ("quit" | "exit", None) => Action::Quit,
        (other, _) => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(action))
}

/// Resolve a numbered choice or free text against a list of options.
fn choose(options: &[&str], input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => Some(options[n - 1].to_string()),
        _ => Some(input.to_string()),
    }
}

pub async fn run(mut session: Session) -> anyhow::Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    println!("{HELP}");

    loop {
        prompt(&format!("[{}]> ", session.state()))?;
        let Some(line) = input.next_line().await? else {
            break;
        };
        match parse_action(&line) {
            Ok(None) => {}
            Ok(Some(Action::Quit)) => break,
            Ok(Some(action)) => {
                if let Err(e) = dispatch(&mut session, action, &mut input).await {
                    println!("error: {e:#}");
                }
            }
            Err(msg) => println!("{msg}"),
        }
    }
    Ok(())
}

async fn dispatch(session: &mut Session, action: Action, input: &mut Input) -> anyhow::Result<()> {
    match action {
        Action::Upload(path) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let doc = session.upload(&crate::file_name(&path), &bytes).await?;
            println!("{}: {} characters extracted", doc.filename, doc.text.chars().count());
        }
        Action::Classify(model) => {
            let model = model
                .unwrap_or_else(|| session.classifier().registry().default_model().to_string());
            display::print_classification(session.classify(&model).await?);
            match session.state() {
                SessionState::ClassifiedError => {
                    println!("Classification failed; enter the right one with `manual`.")
                }
                _ => println!("Is this right? `correct` or `incorrect`."),
            }
        }
        Action::Correct => report(&session.mark_correct().await?),
        Action::Incorrect => {
            session.mark_incorrect()?;
            manual(session, input).await?;
        }
        Action::Manual => manual(session, input).await?,
        Action::Status => {
            println!("state: {}", session.state());
            if let Some(doc) = session.document() {
                println!("document: {}", doc.filename);
            }
            if let Some(c) = session.classification() {
                display::print_classification(c);
            }
        }
        Action::Models => display::print_models(session.classifier().registry()),
        Action::Reset => session.reset(),
        Action::Help => println!("{HELP}"),
        Action::Quit => {}
    }
    Ok(())
}

async fn manual(session: &mut Session, input: &mut Input) -> anyhow::Result<()> {
    if !matches!(
        session.state(),
        SessionState::FeedbackPending | SessionState::ClassifiedError
    ) {
        bail!("nothing to correct while {}", session.state());
    }
    let doc_type_choices = DocType::CHOICES;
    let doc_types: Vec<&str> = doc_type_choices.iter().map(DocType::as_str).collect();
    let sub_types: Vec<String> = SubType::CHOICES.iter().map(SubType::to_string).collect();
    let sub_types: Vec<&str> = sub_types.iter().map(String::as_str).collect();

    let doc_type = ask_choice(input, "Document type", &doc_types).await?;
    let sub_type = ask_choice(input, "Sub-type", &sub_types).await?;
    prompt("Description (optional): ")?;
    let description = next_line(input).await?;

    report(
        &session
            .submit_manual(manual_label(&doc_type, &sub_type, &description))
            .await?,
    );
    Ok(())
}

async fn ask_choice(input: &mut Input, label: &str, options: &[&str]) -> anyhow::Result<String> {
    println!("{label}:");
    for (i, option) in options.iter().enumerate() {
        println!("  {}. {option}", i + 1);
    }
    loop {
        prompt("> ")?;
        if let Some(choice) = choose(options, &next_line(input).await?) {
            return Ok(choice);
        }
        println!("{label} is required.");
    }
}

async fn next_line(input: &mut Input) -> anyhow::Result<String> {
    match input.next_line().await? {
        Some(line) => Ok(line),
        None => bail!("input closed"),
    }
}

fn report(outcome: &FeedbackOutcome) {
    if outcome.recorded {
        println!("Feedback recorded: {}", outcome.blob_name);
    } else {
        println!("Feedback could not be saved; please submit again.");
    }
}

fn prompt(text: &str) -> anyhow::Result<()> {
    let mut out = std::io::stdout();
    write!(out, "{text}")?;
    out.flush()?;
    Ok(())
}
