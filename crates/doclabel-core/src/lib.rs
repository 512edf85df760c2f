pub mod config;
pub mod feedback;
pub mod label;
pub mod normalize;
#[cfg(feature = "testing")]
pub mod testing;

pub use config::{ConfigError, ConfigProvider, Endpoint, EnvProvider, LayeredConfig, SecretsFile};
pub use feedback::{FeedbackError, FeedbackFields, FeedbackRecord, FeedbackStatus};
pub use label::{ClassificationRequest, ClassificationResult, DocumentClass, SummonsDetails};
pub use normalize::{DocType, NormalizedLabel, SubType, normalize};
