//! Configuration management.

mod credentials;
mod file_config;

pub use credentials::{Credential, CredentialConfig, CredentialSource, API_KEY_ENV_VARS};
pub use file_config::{
    find_config_file, platform_config_path, read_config_file, write_config_file, ConfigFileError,
    LOCAL_CONFIG_FILE,
};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::llm::{ModelSelection, DEFAULT_DEEP_MODEL, DEFAULT_ENDPOINT, DEFAULT_FAST_MODEL};
use crate::models::{ComplexityLevel, Language, OptionError, ResearchOptions, ResponseFormat};
use crate::utils::HttpClient;

/// Prefix for environment overrides, e.g. `RESEARCH_CARDS__MODELS__DEEP`
pub const ENV_PREFIX: &str = "RESEARCH_CARDS";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// API keys for the model provider
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Model identifiers and endpoint
    #[serde(default)]
    pub models: ModelsConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Defaults for research options
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API keys for external services
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Gemini API key. Environment variables take precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("gemini", &self.gemini.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used when deep research is off
    #[serde(default = "default_fast_model")]
    pub fast: String,

    /// Model used when deep research is on
    #[serde(default = "default_deep_model")]
    pub deep: String,

    /// Base URL of the generative language API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            fast: default_fast_model(),
            deep: default_deep_model(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_fast_model() -> String {
    DEFAULT_FAST_MODEL.to_string()
}

fn default_deep_model() -> String {
    DEFAULT_DEEP_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// HTTP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Overall request timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    crate::utils::DEFAULT_TIMEOUT.as_secs()
}

fn default_connect_timeout() -> u64 {
    crate::utils::DEFAULT_CONNECT_TIMEOUT.as_secs()
}

/// Default research options applied when a caller leaves an axis unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub complexity_level: ComplexityLevel,

    #[serde(default)]
    pub response_format: ResponseFormat,

    #[serde(default)]
    pub language: Language,

    #[serde(default)]
    pub deep_research: bool,
}

impl DefaultsConfig {
    /// Options for a topic with these defaults applied
    pub fn options_for(&self, topic: &str) -> Result<ResearchOptions, OptionError> {
        Ok(ResearchOptions::new(topic)?
            .complexity_level(self.complexity_level)
            .response_format(self.response_format)
            .language(self.language)
            .deep_research(self.deep_research))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for structured output, anything else for plain text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Credential configuration: environment first, then the file's key
    pub fn credentials(&self) -> CredentialConfig {
        CredentialConfig::from_env().or_default_key(self.api_keys.gemini.as_deref())
    }

    pub fn model_selection(&self) -> ModelSelection {
        ModelSelection::new(&self.models.fast, &self.models.deep)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_seconds)
    }

    /// Shared HTTP client built from the `[http]` section
    pub fn http_client(&self) -> HttpClient {
        HttpClient::with_timeouts(self.timeout(), self.connect_timeout())
    }
}

/// Load configuration from an optional file plus `RESEARCH_CARDS__*` overrides.
///
/// Without a file, defaults are used and only the environment applies.
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        tracing::debug!("Loading configuration from {}", path.display());
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Find and load the configuration, falling back to defaults when no file exists
pub fn get_config(explicit: Option<&Path>) -> Result<Config, config::ConfigError> {
    let path = find_config_file(explicit);
    load_config(path.as_deref())
}
