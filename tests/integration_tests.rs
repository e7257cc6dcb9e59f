//! Integration tests for Research Cards
//!
//! These tests drive the full pipeline against a local mock of the Gemini
//! `generateContent` endpoint.

use mockito::{Matcher, Server};
use research_cards::config::{read_config_file, write_config_file, Config, CredentialConfig};
use research_cards::llm::{GeminiClient, ModelSelection};
use research_cards::mcp::{McpServer, ToolError, ToolRegistry};
use research_cards::models::{CardType, Language, ResearchOptions, SearchFocus, SearchFocusSet};
use research_cards::research::{ResearchError, ResearchService, CREDENTIAL_MESSAGE};
use research_cards::utils::HttpClient;
use serde_json::json;
use std::sync::Arc;

const KEY: &str = "AIzaSyIntegrationIntegrationIntegrat";
const FAST: &str = "fast-model";
const DEEP: &str = "deep-model";

const RESPONSE_JSON: &str = r#"{
  "query": "volcanic winters",
  "language": "English",
  "complexityLevel": "Expert",
  "responseFormat": "Detailed",
  "useDeepResearch": false,
  "globalSummary": "Large eruptions can cool the planet for several years.",
  "insights": ["Sulfate aerosols reflect sunlight"],
  "cards": [
    {
      "id": "card_1",
      "type": "academic",
      "title": "Climatic impact of the 1815 Tambora eruption",
      "source": "Journal of Climate",
      "authors": ["C. Researcher"],
      "publicationDate": "2019",
      "url": "https://journals.example.org/tambora",
      "snippet": "The year without a summer.",
      "keyPoints": ["Global cooling of about 0.5 C"],
      "levelAdaptedExplanation": "Stratospheric sulfate loading reduced insolation.",
      "modalContent": {
        "detailedExplanation": "Aerosols persisted for roughly two years.",
        "examples": ["1816 crop failures"],
        "relatedConcepts": ["Radiative forcing"],
        "caveatsOrLimitations": ["Sparse instrumental records"]
      },
      "relevanceScore": 0.95
    }
  ],
  "followUpSuggestions": ["How did Tambora affect agriculture?"],
  "safetyNotes": []
}"#;

fn envelope(text: &str) -> String {
    json!({
        "candidates": [
            { "content": { "role": "model", "parts": [{ "text": text }] } }
        ]
    })
    .to_string()
}

fn service(server: &Server, credentials: CredentialConfig) -> ResearchService {
    let client = GeminiClient::new(HttpClient::new(), &server.url()).unwrap();
    ResearchService::new(
        Arc::new(client),
        ModelSelection::new(FAST, DEEP),
        credentials,
    )
}

fn options() -> ResearchOptions {
    ResearchOptions::new("volcanic winters")
        .unwrap()
        .language(Language::English)
}

#[tokio::test]
async fn test_research_round_trip() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/models/fast-model:generateContent")
        .match_header("x-goog-api-key", KEY)
        .match_body(Matcher::PartialJson(json!({
            "tools": [{ "googleSearch": {} }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(envelope(RESPONSE_JSON))
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::with_default(KEY));
    let response = service.perform_research(&options(), None).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.query, "volcanic winters");
    assert_eq!(response.cards.len(), 1);
    assert_eq!(response.cards[0].card_type, CardType::Academic);
    assert_eq!(response.follow_up_suggestions.len(), 1);
}

#[tokio::test]
async fn test_fenced_output_is_repaired() {
    let mut server = Server::new_async().await;
    let fenced = format!("```json\n{}\n```", RESPONSE_JSON);
    let _mock = server
        .mock("POST", "/models/fast-model:generateContent")
        .with_status(200)
        .with_body(envelope(&fenced))
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::with_default(KEY));
    let response = service.perform_research(&options(), None).await.unwrap();
    assert_eq!(response.insights, vec!["Sulfate aerosols reflect sunlight"]);
}

#[tokio::test]
async fn test_deep_research_calls_deep_model() {
    let mut server = Server::new_async().await;
    let deep = server
        .mock("POST", "/models/deep-model:generateContent")
        .with_status(200)
        .with_body(envelope(RESPONSE_JSON))
        .create_async()
        .await;
    let fast = server
        .mock("POST", "/models/fast-model:generateContent")
        .expect(0)
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::with_default(KEY));
    service
        .perform_research(&options().deep_research(true), None)
        .await
        .unwrap();

    deep.assert_async().await;
    fast.assert_async().await;
}

#[tokio::test]
async fn test_focus_reaches_system_instruction() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/models/fast-model:generateContent")
        .match_body(Matcher::Regex("Peer-reviewed".to_string()))
        .with_status(200)
        .with_body(envelope(RESPONSE_JSON))
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::with_default(KEY));
    let opts = options().search_focus(SearchFocusSet::from_selection([SearchFocus::Academic]));
    service.perform_research(&opts, None).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_key_is_credential_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/fast-model:generateContent")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::with_default(KEY));
    let err = service.perform_research(&options(), None).await.unwrap_err();
    assert!(err.needs_credential());
    assert_eq!(err.user_message(), CREDENTIAL_MESSAGE);
}

#[tokio::test]
async fn test_server_error_is_upstream() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/fast-model:generateContent")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::with_default(KEY));
    let err = service.perform_research(&options(), None).await.unwrap_err();
    assert!(matches!(err, ResearchError::Upstream(_)));
}

#[tokio::test]
async fn test_non_json_output_is_parse_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/fast-model:generateContent")
        .with_status(200)
        .with_body(envelope("I cannot comply."))
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::with_default(KEY));
    let err = service.perform_research(&options(), None).await.unwrap_err();
    assert!(matches!(err, ResearchError::Parse(_)));
    assert_eq!(err.raw_text(), Some("I cannot comply."));
}

#[tokio::test]
async fn test_missing_key_makes_no_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::none());
    let err = service.perform_research(&options(), None).await.unwrap_err();
    assert!(err.needs_credential());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_override_key_is_sent() {
    let mut server = Server::new_async().await;
    let override_key = "AIzaSyOverrideOverrideOverrideOverri";
    let mock = server
        .mock("POST", "/models/fast-model:generateContent")
        .match_header("x-goog-api-key", override_key)
        .with_status(200)
        .with_body(envelope(RESPONSE_JSON))
        .create_async()
        .await;

    let service = service(&server, CredentialConfig::with_default(KEY));
    service
        .perform_research(&options(), Some(override_key))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_mcp_tool_end_to_end() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/models/fast-model:generateContent")
        .match_header("x-goog-api-key", KEY)
        .with_status(200)
        .with_body(envelope(RESPONSE_JSON))
        .create_async()
        .await;

    let service = Arc::new(service(&server, CredentialConfig::none()));
    let registry = ToolRegistry::for_service(service, Default::default());

    let result = registry
        .execute(
            "perform_research",
            json!({ "topic": "volcanic winters", "api_key": KEY, "complexity_level": "expert" }),
        )
        .await
        .unwrap();
    assert_eq!(result["cards"][0]["id"], "card_1");

    let err = registry
        .execute("perform_research", json!({ "topic": "volcanic winters" }))
        .await
        .unwrap_err();
    assert_eq!(err, ToolError::Failed(CREDENTIAL_MESSAGE.to_string()));
}

#[test]
fn test_mcp_server_from_config() {
    let config = Config::default();
    let client = GeminiClient::new(config.http_client(), &config.models.endpoint).unwrap();
    let service = ResearchService::new(
        Arc::new(client),
        config.model_selection(),
        CredentialConfig::none(),
    );
    assert!(McpServer::new(Arc::new(service), config.defaults.clone()).is_ok());
}

#[test]
fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("research-cards.toml");

    let mut config = Config::default();
    config.models.fast = FAST.to_string();
    config.defaults.language = Language::English;
    write_config_file(&config, &path, false).unwrap();

    let loaded = read_config_file(&path).unwrap();
    assert_eq!(loaded.model_selection().fast, FAST);
    assert_eq!(loaded.defaults.language, Language::English);

    assert!(write_config_file(&config, &path, false).is_err());
    assert!(write_config_file(&config, &path, true).is_ok());
}
