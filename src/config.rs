//! Configuration loading and management for mailsumma.
//!
//! Loads settings from `mailsumma.toml` with environment variable overrides for sensitive data.
//! A missing config file is not an error: every setting has a default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Model used when the config does not name one
pub const DEFAULT_MODEL_NAME: &str = "sshleifer/distilbart-cnn-12-6";

/// Base URL of the hosted inference API; the model name is appended
pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";

const CONFIG_FILE_NAME: &str = "mailsumma.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing API token for hosted inference (set HF_TOKEN or api.hf_token)")]
    MissingApiKey,
}

/// Which implementation serves summarisation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process BART model on the CPU
    Local,
    /// Hugging Face inference endpoint
    Hosted,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "local-model") {
            Backend::Local
        } else {
            Backend::Hosted
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Hosted => f.write_str("hosted"),
        }
    }
}

/// Summarisation model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Hub identifier of the pre-trained model
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Directory holding converted weights for the local backend
    #[serde(default)]
    pub weights_dir: Option<PathBuf>,
    /// Base URL for the hosted backend
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Upper bound on a single generation, unbounded when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub hf_token: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_model_name() -> String {
    DEFAULT_MODEL_NAME.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            name: default_model_name(),
            weights_dir: None,
            endpoint: default_endpoint(),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load from `explicit` when given, otherwise search the standard locations.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load_with(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let home = dirs::home_dir();
        match Self::locate(explicit, Path::new("."), home.as_deref()) {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.apply_env();
        tracing::debug!(path = %path.display(), backend = %config.model.backend, "loaded config");
        Ok(config)
    }

    /// Parse configuration from TOML text without consulting the environment
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override API keys from environment variables
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("HF_TOKEN") {
            if !key.is_empty() {
                self.api.hf_token = Some(key);
            }
        }
    }

    /// Pick the config file: `explicit`, then `cwd`, then `home/.config/mailsumma`
    fn locate(explicit: Option<&Path>, cwd: &Path, home: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let local_config = cwd.join(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Some(local_config);
        }

        let home_config = home?
            .join(".config")
            .join("mailsumma")
            .join(CONFIG_FILE_NAME);
        home_config.exists().then_some(home_config)
    }

    /// Get the token for the hosted inference API
    pub fn api_token(&self) -> Result<&str, ConfigError> {
        self.api
            .hf_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}
