//! Shared constants and layered configuration.
//!
//! Secrets are resolved through an ordered list of [`ConfigProvider`]s: a TOML
//! secrets file first, then the process environment. The first non-empty
//! value wins; a key absent from every provider is a typed error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

// ── Model parameters ──

/// Character budget for document text sent to the model.
pub const MAX_CHARS: usize = 28_000;
pub const MAX_TOKENS: u32 = 250;
pub const TEMPERATURE: f32 = 0.0;

/// `(short name, deployed model identifier)` for every selectable model.
pub const AVAILABLE_MODELS: &[(&str, &str)] = &[
    ("phi4", "Phi-4-multimodal-instruct"),
    ("gpt4o_mini", "gpt-4o-mini"),
    ("mistral", "mistralai-mistral-7b-instruc-11"),
];
pub const DEFAULT_MODEL: &str = "Phi-4-multimodal-instruct";

// ── Collaborators ──

pub const DEFAULT_CONTAINER: &str = "assignmentlabelling";
pub const DOCUMENT_INTELLIGENCE_MODEL: &str = "prebuilt-read";

/// Secret names looked up through [`LayeredConfig`].
pub mod keys {
    pub const CONNECTION_STRING: &str = "AZURE_CONNECTION_STRING";
    pub const CONTAINER_NAME: &str = "AZURE_CONTAINER_NAME";
    pub const DOCUMENT_INTELLIGENCE_ENDPOINT: &str = "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT";
    pub const DOCUMENT_INTELLIGENCE_KEY: &str = "AZURE_DOCUMENT_INTELLIGENCE_KEY";
    pub const LLM_ENDPOINT: &str = "AZURE_LLM_ENDPOINT";
    pub const LLM_API_KEY: &str = "AZURE_LLM_API_KEY";
    pub const MISTRAL_ENDPOINT: &str = "AZURE_MISTRAL_ENDPOINT";
    pub const MISTRAL_API_KEY: &str = "AZURE_MISTRAL_API_KEY";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing secret: {key} (checked: {checked})")]
    MissingCredential { key: String, checked: String },

    #[error("failed to read secrets file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse secrets file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// A source of configuration values, queried by key.
pub trait ConfigProvider: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<String>;
}

/// Process environment variables.
pub struct EnvProvider;

impl ConfigProvider for EnvProvider {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// A TOML secrets file, flattened to `key` / `section.key` string values.
pub struct SecretsFile {
    values: HashMap<String, String>,
}

impl SecretsFile {
    /// Load a secrets file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no secrets file, relying on later providers");
            return Ok(Self { values: HashMap::new() });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = text.parse().map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut values = HashMap::new();
        flatten("", &table, &mut values);
        debug!(path = %path.display(), keys = values.len(), "loaded secrets file");
        Ok(Self { values })
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(t) => flatten(&key, t, out),
            toml::Value::Integer(_) | toml::Value::Float(_) | toml::Value::Boolean(_) => {
                out.insert(key, v.to_string());
            }
            _ => {}
        }
    }
}

impl ConfigProvider for SecretsFile {
    fn name(&self) -> &str {
        "secrets file"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// An endpoint URL plus the key used to authenticate against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub key: String,
}

/// Ordered provider chain; earlier providers take priority.
pub struct LayeredConfig {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl LayeredConfig {
    pub fn new(providers: Vec<Box<dyn ConfigProvider>>) -> Self {
        Self { providers }
    }

    /// Secrets file (if given) first, environment second.
    pub fn standard(secrets_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut providers: Vec<Box<dyn ConfigProvider>> = Vec::new();
        if let Some(path) = secrets_path {
            providers.push(Box::new(SecretsFile::load(path)?));
        }
        providers.push(Box::new(EnvProvider));
        Ok(Self::new(providers))
    }

    /// First non-empty value across providers.
    pub fn get(&self, key: &str) -> Option<String> {
        self.providers.iter().find_map(|p| {
            p.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    }

    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingCredential {
            key: key.to_string(),
            checked: self.provider_names(),
        })
    }

    /// Resolve an endpoint URL and its key, failing on whichever is missing first.
    pub fn endpoint(&self, url_key: &str, secret_key: &str) -> Result<Endpoint, ConfigError> {
        Ok(Endpoint {
            url: self.require(url_key)?,
            key: self.require(secret_key)?,
        })
    }

    fn provider_names(&self) -> String {
        self.providers
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
