//! Input validation for research topics, endpoints and API keys.

use thiserror::Error;

/// Maximum topic length in characters
pub const MAX_TOPIC_CHARS: usize = 2000;

/// Validation error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Topic must not be empty")]
    EmptyTopic,

    #[error("Topic is too long ({0} characters, maximum {MAX_TOPIC_CHARS})")]
    TopicTooLong(usize),

    #[error("Topic contains control characters")]
    ControlCharacters,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Validate a research topic.
///
/// Returns the trimmed topic. Tabs and newlines are allowed; other control
/// characters are rejected.
pub fn validate_topic(topic: &str) -> Result<String, ValidationError> {
    let topic = topic.trim();

    if topic.is_empty() {
        return Err(ValidationError::EmptyTopic);
    }

    let chars = topic.chars().count();
    if chars > MAX_TOPIC_CHARS {
        return Err(ValidationError::TopicTooLong(chars));
    }

    if topic
        .chars()
        .any(|ch| ch.is_control() && ch != '\t' && ch != '\n' && ch != '\r')
    {
        return Err(ValidationError::ControlCharacters);
    }

    Ok(topic.to_string())
}

/// Validate a model endpoint base URL.
///
/// Only HTTP(S) is accepted. Returns the URL without a trailing slash.
pub fn validate_endpoint(url: &str) -> Result<String, ValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(ValidationError::InvalidUrl("empty URL".to_string()));
    }

    let parsed = url::Url::parse(url).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ValidationError::InvalidUrl(format!(
                "invalid scheme: {}",
                scheme
            )))
        }
    }

    if parsed.host_str().is_none() {
        return Err(ValidationError::InvalidUrl("missing host".to_string()));
    }

    Ok(url.trim_end_matches('/').to_string())
}

/// Check whether a string has the shape of a Google AI Studio key.
///
/// Only a format hint: keys start with `AIza` and are longer than 30
/// characters. A key that passes can still be rejected by the server.
pub fn looks_like_api_key(key: &str) -> bool {
    let key = key.trim();
    key.starts_with("AIza") && key.len() > 30
}
