mod config;
pub mod error;

pub use config::{Config, LLMConfig, LLMSettings, TelemetrySettings, API_KEY_ENV};
pub use error::LLMError;
