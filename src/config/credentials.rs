//! API credential handling.
//!
//! The process-wide default key is read once, at the configuration boundary,
//! and injected into the research service. Per-call overrides take
//! precedence over it. Nothing here persists a key.

use secrecy::{ExposeSecret, SecretString};

use crate::utils::looks_like_api_key;

/// Environment variables consulted for the default key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// An opaque API key
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a key. Returns `None` for blank input.
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(SecretString::from(key.to_string())))
        }
    }

    /// Reveal the key for use in a request header
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the key has the expected Google AI Studio shape
    pub fn has_expected_format(&self) -> bool {
        looks_like_api_key(self.expose())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Where a resolved credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Override,
    Default,
}

/// Credential configuration injected into the research service
#[derive(Debug, Clone, Default)]
pub struct CredentialConfig {
    default: Option<Credential>,
}

impl CredentialConfig {
    /// Configuration with an explicit default key
    pub fn with_default(key: &str) -> Self {
        Self {
            default: Credential::new(key),
        }
    }

    /// Configuration with no default key
    pub fn none() -> Self {
        Self::default()
    }

    /// Read the default key from the first set variable of [`API_KEY_ENV_VARS`]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the default key through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find_map(|value| Credential::new(&value));
        Self { default }
    }

    /// Use `fallback` as the default when none is configured yet
    pub fn or_default_key(mut self, fallback: Option<&str>) -> Self {
        if self.default.is_none() {
            self.default = fallback.and_then(Credential::new);
        }
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn default_credential(&self) -> Option<&Credential> {
        self.default.as_ref()
    }

    /// Resolve the key for one call: a non-blank override, else the default.
    ///
    /// Logs a warning when nothing is available; the caller decides whether
    /// that is fatal.
    pub fn resolve(&self, override_key: Option<&str>) -> Option<(Credential, CredentialSource)> {
        let resolved = override_key
            .and_then(Credential::new)
            .map(|c| (c, CredentialSource::Override))
            .or_else(|| {
                self.default
                    .clone()
                    .map(|c| (c, CredentialSource::Default))
            });

        match &resolved {
            Some((credential, source)) => {
                if !credential.has_expected_format() {
                    tracing::warn!(?source, "API key does not look like a Google AI Studio key");
                }
            }
            None => tracing::warn!("API key not found in override, configuration or environment"),
        }

        resolved
    }
}
