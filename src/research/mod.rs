//! Research pipeline: compose instructions, call the model, repair and
//! decode its output.

mod prompt;
mod repair;
mod service;

pub use prompt::{compose, focus_instruction, Instructions};
pub use repair::{
    decode, extract_outer_object, fix_period_after_array, repair, strip_code_fence, RepairPass,
    PASSES,
};
pub use service::ResearchService;

use crate::llm::LlmError;

/// User-facing message for credential failures
pub const CREDENTIAL_MESSAGE: &str =
    "Invalid or missing API credential. Please configure your key.";

/// User-facing message for any other upstream failure
pub const UPSTREAM_MESSAGE: &str =
    "The research service is unavailable. Check your API key or try again.";

/// User-facing message for unusable model output
pub const PARSE_MESSAGE: &str = "Failed to process research results.";

/// Model output that could not be decoded, even after repair
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Model output is not a valid research response: {message}")]
pub struct ParseFailure {
    message: String,
    raw: String,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Repaired text that failed to decode
    pub fn raw_text(&self) -> &str {
        &self.raw
    }
}

/// Errors returned by [`ResearchService::perform_research`]
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// No usable credential, or the endpoint rejected it
    #[error("Credential error: {0}")]
    Credential(String),

    /// Any other remote or transport failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The model's output is not a valid response
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

impl ResearchError {
    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            ResearchError::Credential(_) => CREDENTIAL_MESSAGE,
            ResearchError::Upstream(_) => UPSTREAM_MESSAGE,
            ResearchError::Parse(_) => PARSE_MESSAGE,
        }
    }

    /// Whether the caller should ask for a (new) API key
    pub fn needs_credential(&self) -> bool {
        matches!(self, ResearchError::Credential(_))
    }

    /// Undecodable model text, for diagnostics
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            ResearchError::Parse(failure) => Some(failure.raw_text()),
            _ => None,
        }
    }
}

impl From<LlmError> for ResearchError {
    fn from(err: LlmError) -> Self {
        if err.is_unauthorized() {
            ResearchError::Credential(err.to_string())
        } else {
            ResearchError::Upstream(err.to_string())
        }
    }
}
