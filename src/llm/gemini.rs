//! Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{GenerateRequest, LlmError, ModelClient};
use crate::config::Credential;
use crate::utils::{validate_endpoint, HttpClient, ValidationError};

/// Public Gemini API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Longest error body kept when the server does not return structured JSON
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Gemini REST client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: HttpClient,
    endpoint: String,
}

impl GeminiClient {
    /// Create a client for an API base URL such as [`DEFAULT_ENDPOINT`]
    pub fn new(http: HttpClient, endpoint: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            http,
            endpoint: validate_endpoint(endpoint)?,
        })
    }

    fn build_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        request: &GenerateRequest,
        credential: &Credential,
    ) -> Result<String, LlmError> {
        let body = GeminiRequest::from_request(request);

        let response = self
            .http
            .client()
            .post(self.build_url(&request.model))
            .header(API_KEY_HEADER, credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(format!("Failed to reach Gemini: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Network(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            let message = error_message(&text);
            tracing::debug!(status = status.as_u16(), %message, "Gemini returned an error");
            return Err(LlmError::from_status(status.as_u16(), message));
        }

        extract_text(&text)
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

impl GeminiRequest {
    fn from_request(request: &GenerateRequest) -> Self {
        let system_instruction = Some(request.system_instruction.trim())
            .filter(|s| !s.is_empty())
            .map(|text| GeminiSystemInstruction {
                parts: vec![GeminiTextPart {
                    text: text.to_string(),
                }],
            });

        let tools = if request.search_grounding {
            vec![GeminiTool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        Self {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiTextPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction,
            tools,
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

// ============================================================================
// Response handling
// ============================================================================

/// Concatenate the text parts of the first candidate
fn extract_text(body: &str) -> Result<String, LlmError> {
    let response: GeminiResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Envelope(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(LlmError::from_status(
            error.code.unwrap_or(500),
            error.message,
        ));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    Ok(text)
}

/// Pull a readable message out of an error body
fn error_message(body: &str) -> String {
    match serde_json::from_str::<GeminiErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{} ({})", envelope.error.message, status),
            None => envelope.error.message,
        },
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(search_grounding: bool) -> GenerateRequest {
        GenerateRequest {
            model: "gemini-2.0-flash-exp".to_string(),
            system_instruction: "You are a research assistant.".to_string(),
            prompt: "Research tides".to_string(),
            search_grounding,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GeminiRequest::from_request(&request(true))).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{"role": "user", "parts": [{"text": "Research tides"}]}],
                "systemInstruction": {"parts": [{"text": "You are a research assistant."}]},
                "tools": [{"googleSearch": {}}]
            })
        );
    }

    #[test]
    fn test_request_without_grounding_omits_tools() {
        let body = serde_json::to_value(GeminiRequest::from_request(&request(false))).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_url() {
        let client = GeminiClient::new(HttpClient::new(), "http://localhost:1234/v1beta/").unwrap();
        assert_eq!(
            client.build_url("gemini-2.5-flash"),
            "http://localhost:1234/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(GeminiClient::new(HttpClient::new(), "ftp://nope").is_err());
    }

    #[test]
    fn test_extract_text_concatenates_parts() {
        let body = json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}},
                {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
            ]
        })
        .to_string();
        assert_eq!(extract_text(&body).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_text_empty() {
        assert!(matches!(
            extract_text(r#"{"candidates": []}"#),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            extract_text(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            extract_text(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_extract_text_bad_envelope() {
        assert!(matches!(extract_text("<html>"), Err(LlmError::Envelope(_))));
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })
        .to_string();
        assert_eq!(
            error_message(&body),
            "API key not valid. Please pass a valid API key. (INVALID_ARGUMENT)"
        );
        assert!(LlmError::from_status(400, error_message(&body)).is_unauthorized());
    }

    #[test]
    fn test_envelope_error_about_key_is_unauthorized() {
        let body = json!({
            "error": { "code": 500, "message": "API key expired. Please renew the API key." }
        })
        .to_string();
        assert!(matches!(
            extract_text(&body),
            Err(LlmError::Unauthorized { status: 500, .. })
        ));
    }

    #[test]
    fn test_error_message_plain_body() {
        assert_eq!(error_message("  upstream down \n"), "upstream down");
        assert_eq!(error_message(""), "empty response body");
        assert_eq!(
            error_message(&"x".repeat(1000)).len(),
            MAX_ERROR_BODY_CHARS
        );
    }
}
