//! Classification layer: prompt construction, hosted model transports, response parsing.

mod chat;
mod classifier;
mod error;
mod invoker;
pub mod parse;
pub mod prompt;
mod raw;

pub use chat::ChatCompletionInvoker;
pub use classifier::{Classifier, NO_TEXT_CONTENT};
pub use error::ModelError;
pub use invoker::{ModelInvoker, ModelRegistry, Transport};
pub use parse::{ParseError, parse_response};
pub use prompt::{Prompt, build_prompt};
pub use raw::RawHttpInvoker;
