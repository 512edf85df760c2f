use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use doclabel_ai::{Classifier, ModelRegistry};
use doclabel_core::config::{DEFAULT_CONTAINER, keys};
use doclabel_core::{FeedbackRecord, LayeredConfig};
use doclabel_host::{Session, SessionConfig};
use doclabel_ocr::DocumentIntelligenceClient;
use doclabel_store::{AzureBlobStore, BlobStore, LocalBlobStore};
use tracing_subscriber::EnvFilter;

mod display;
mod repl;

#[derive(Parser)]
#[command(name = "doclabel", version)]
#[command(about = "Classify inbound legal documents and record reviewer feedback")]
struct Cli {
    /// TOML secrets file, consulted before environment variables
    #[arg(long, global = true, env = "DOCLABEL_SECRETS")]
    secrets: Option<PathBuf>,

    /// Write blobs under this directory instead of the hosted blob store
    #[arg(long, global = true)]
    local_store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract text from a document and classify it
    Classify {
        file: PathBuf,
        /// Model identifier or short name (see `models`)
        #[arg(long)]
        model: Option<String>,
    },
    /// Interactive review: upload, classify, then mark correct or correct manually
    Session,
    /// List configured models and whether their credentials resolved
    Models,
    /// Print the fields encoded in a feedback blob name
    DecodeFeedback { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("doclabel v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Classify { ref file, ref model } => {
            let mut session = build_session(&cli).await?;
            let bytes = tokio::fs::read(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let model = model
                .clone()
                .unwrap_or_else(|| session.classifier().registry().default_model().to_string());

            session.upload(&file_name(file), &bytes).await?;
            let classification = session.classify(&model).await?;
            display::print_classification(classification);
        }
        Command::Session => {
            let session = build_session(&cli).await?;
            repl::run(session).await?;
        }
        Command::Models => {
            let config = load_config(&cli)?;
            display::print_models(&ModelRegistry::from_config(&config));
        }
        Command::DecodeFeedback { ref name } => {
            let fields = FeedbackRecord::decode(name)?;
            display::print_feedback_fields(&fields);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<LayeredConfig> {
    Ok(LayeredConfig::standard(cli.secrets.as_deref())?)
}

async fn build_session(cli: &Cli) -> anyhow::Result<Session> {
    let config = load_config(cli)?;

    let store: Arc<dyn BlobStore> = match &cli.local_store {
        Some(root) => {
            tokio::fs::create_dir_all(root)
                .await
                .with_context(|| format!("creating {}", root.display()))?;
            Arc::new(LocalBlobStore::new(root))
        }
        None => Arc::new(AzureBlobStore::from_config(&config)?),
    };
    let ocr = Arc::new(DocumentIntelligenceClient::from_config(&config)?);
    let classifier = Arc::new(Classifier::new(ModelRegistry::from_config(&config)));
    let session_config = SessionConfig {
        container: config
            .get(keys::CONTAINER_NAME)
            .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
        ..SessionConfig::default()
    };

    Ok(Session::new(classifier, ocr, store, session_config))
}

/// Final path component, as the name the document is stored and recorded under.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
