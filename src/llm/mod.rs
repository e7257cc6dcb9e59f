//! Remote model invocation.
//!
//! [`ModelClient`] is the seam between the research pipeline and a model
//! provider. [`GeminiClient`] talks to the Gemini REST API; [`MockModel`]
//! returns canned text for tests. [`ModelInvoker`] picks the model tier and
//! builds the request.

mod gemini;
mod mock;

pub use gemini::{GeminiClient, DEFAULT_ENDPOINT};
pub use mock::MockModel;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Credential;
use crate::research::Instructions;

/// Model used when deep research is off
pub const DEFAULT_FAST_MODEL: &str = "gemini-2.0-flash-exp";

/// Model used when deep research is on
pub const DEFAULT_DEEP_MODEL: &str = "gemini-2.5-flash";

/// One generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
    /// Let the model consult live search results
    pub search_grounding: bool,
}

/// Errors from a model provider
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The endpoint rejected the credential
    #[error("API key rejected ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success response
    #[error("Model API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport failure: DNS, TLS, timeout, connection reset
    #[error("Network error: {0}")]
    Network(String),

    /// A success response that carried no text
    #[error("Model returned no text")]
    EmptyResponse,

    /// A success response whose envelope could not be read
    #[error("Unreadable response envelope: {0}")]
    Envelope(String),
}

impl LlmError {
    /// Classify a non-success HTTP response.
    ///
    /// 401 and 403 are always credential failures. Any other status counts
    /// as one when the message complains about the API key, which is how the
    /// API reports a malformed, unknown or expired key.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();

        match status {
            401 | 403 => LlmError::Unauthorized { status, message },
            _ if mentions_api_key(&message) => LlmError::Unauthorized { status, message },
            _ => LlmError::Api { status, message },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, LlmError::Unauthorized { .. })
    }
}

/// Whether `message` talks about an API key.
///
/// Matches "key" as a whole word only, so "key-value" or "monkey" do not count.
fn mentions_api_key(message: &str) -> bool {
    message
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .any(|word| word == "key" || word == "keys")
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

/// A text-generation backend
#[async_trait]
pub trait ModelClient: Send + Sync + std::fmt::Debug {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Run one generation and return the concatenated text
    async fn generate(
        &self,
        request: &GenerateRequest,
        credential: &Credential,
    ) -> Result<String, LlmError>;
}

/// Capability tier of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    Fast,
    Deep,
}

impl ModelTier {
    /// The tier depends on the deep-research flag and nothing else
    pub fn for_deep_research(deep_research: bool) -> Self {
        if deep_research {
            ModelTier::Deep
        } else {
            ModelTier::Fast
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Fast => "fast",
            ModelTier::Deep => "deep",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model identifiers per tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub fast: String,
    pub deep: String,
}

impl ModelSelection {
    pub fn new(fast: &str, deep: &str) -> Self {
        Self {
            fast: fast.to_string(),
            deep: deep.to_string(),
        }
    }

    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Deep => &self.deep,
        }
    }
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self::new(DEFAULT_FAST_MODEL, DEFAULT_DEEP_MODEL)
    }
}

/// Sends composed instructions to the model of the right tier
#[derive(Debug, Clone)]
pub struct ModelInvoker {
    client: Arc<dyn ModelClient>,
    models: ModelSelection,
}

impl ModelInvoker {
    pub fn new(client: Arc<dyn ModelClient>, models: ModelSelection) -> Self {
        Self { client, models }
    }

    /// Build the request for a tier. Search grounding is always on.
    pub fn request_for(&self, instructions: &Instructions, tier: ModelTier) -> GenerateRequest {
        GenerateRequest {
            model: self.models.model_for(tier).to_string(),
            system_instruction: instructions.system_instruction.clone(),
            prompt: instructions.prompt.clone(),
            search_grounding: true,
        }
    }

    /// Make exactly one generation call
    pub async fn invoke(
        &self,
        instructions: &Instructions,
        deep_research: bool,
        credential: &Credential,
    ) -> Result<String, LlmError> {
        let tier = ModelTier::for_deep_research(deep_research);
        let request = self.request_for(instructions, tier);

        tracing::debug!(
            provider = self.client.name(),
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Invoking model"
        );

        let text = self.client.generate(&request, credential).await?;

        tracing::debug!(response_chars = text.len(), "Model returned text");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instructions() -> Instructions {
        Instructions {
            system_instruction: "be helpful".to_string(),
            prompt: "explain tides".to_string(),
        }
    }

    #[test]
    fn test_tier_depends_only_on_flag() {
        assert_eq!(ModelTier::for_deep_research(false), ModelTier::Fast);
        assert_eq!(ModelTier::for_deep_research(true), ModelTier::Deep);
    }

    #[test]
    fn test_model_selection_defaults() {
        let models = ModelSelection::default();
        assert_eq!(models.model_for(ModelTier::Fast), "gemini-2.0-flash-exp");
        assert_eq!(models.model_for(ModelTier::Deep), "gemini-2.5-flash");
    }

    #[test]
    fn test_request_always_grounded() {
        let invoker = ModelInvoker::new(Arc::new(MockModel::new("{}")), ModelSelection::default());

        let fast = invoker.request_for(&instructions(), ModelTier::Fast);
        assert_eq!(fast.model, DEFAULT_FAST_MODEL);
        assert!(fast.search_grounding);
        assert_eq!(fast.prompt, "explain tides");
        assert_eq!(fast.system_instruction, "be helpful");

        let deep = invoker.request_for(&instructions(), ModelTier::Deep);
        assert_eq!(deep.model, DEFAULT_DEEP_MODEL);
        assert!(deep.search_grounding);
    }

    #[tokio::test]
    async fn test_invoke_uses_deep_model_when_requested() {
        let mock = Arc::new(MockModel::new("text"));
        let invoker = ModelInvoker::new(mock.clone(), ModelSelection::new("small", "large"));
        let credential = Credential::new("AIzaSyTestTestTestTestTestTestTestTest").unwrap();

        let text = invoker.invoke(&instructions(), true, &credential).await.unwrap();
        assert_eq!(text, "text");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "large");
    }

    #[test]
    fn test_error_classification() {
        assert!(LlmError::from_status(401, "unauthenticated").is_unauthorized());
        assert!(LlmError::from_status(403, "forbidden").is_unauthorized());
        assert!(LlmError::from_status(400, "API key not valid. Please pass a valid API key.")
            .is_unauthorized());
        assert!(!LlmError::from_status(400, "Invalid JSON payload").is_unauthorized());
        assert!(!LlmError::from_status(500, "key-value store down").is_unauthorized());
        assert!(!LlmError::from_status(500, "monkey patch failed").is_unauthorized());
        assert!(matches!(
            LlmError::from_status(503, "overloaded"),
            LlmError::Api { status: 503, .. }
        ));
    }

    #[test]
    fn test_key_complaint_is_unauthorized_for_any_status() {
        assert!(
            LlmError::from_status(500, "API key expired. Please renew the API key.")
                .is_unauthorized()
        );
        assert!(LlmError::from_status(200, "Invalid api_key supplied").is_unauthorized());
        assert!(LlmError::from_status(400, "API_KEY_INVALID").is_unauthorized());
        assert!(!LlmError::from_status(502, "Bad gateway").is_unauthorized());
    }
}
