use crate::core::LLMError;
use crate::providers::CollectMode;
use crate::telemetry::LoggerConfig;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

include!(concat!(env!("OUT_DIR"), "/default_config.rs"));

/// Environment variable that overrides `[llm].api_key`.
pub const API_KEY_ENV: &str = "LLM_API_KEY";

/// Connection parameters handed to [`crate::providers::LLMClient`].
#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: SecretString,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl LLMConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: None,
            model: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// The `[llm]` table as written on disk.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LLMSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(flatten)]
    pub logger: LoggerConfig,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: None,
            logger: LoggerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub llm: LLMSettings,
    pub system_prompt: Option<String>,
    #[serde(default = "default_true")]
    pub simulate_browser: bool,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub collect_mode: CollectMode,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

const fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("Invalid default config")
    }
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to the
    /// embedded defaults when the file does not exist.
    pub fn load() -> Result<Self, LLMError> {
        let config_path = Path::new("config.toml");
        if config_path.exists() {
            Self::load_from(config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, LLMError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| LLMError::ConfigError(format!("Failed to read config file: {e}")))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, LLMError> {
        toml::from_str(contents)
            .map_err(|e| LLMError::ConfigError(format!("Failed to parse config file: {e}")))
    }

    /// Builds the client configuration. `env_key` wins over the file's key.
    pub fn llm_config(&self, env_key: Option<String>) -> Result<LLMConfig, LLMError> {
        let api_key = env_key
            .filter(|key| !key.is_empty())
            .or_else(|| self.llm.api_key.clone())
            .ok_or_else(|| {
                LLMError::ConfigError(format!(
                    "API key missing: set {API_KEY_ENV} or [llm].api_key in config.toml"
                ))
            })?;

        Ok(LLMConfig {
            api_key: SecretString::from(api_key),
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
        })
    }

    pub fn update_model(&mut self, model: String) {
        self.llm.model = Some(model);
    }

    pub fn update_base_url(&mut self, base_url: String) {
        self.llm.base_url = Some(base_url);
    }
}
