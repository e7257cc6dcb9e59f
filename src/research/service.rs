//! Research orchestration.

use std::sync::Arc;
use tracing::Instrument;

use super::{compose, decode, ResearchError};
use crate::config::CredentialConfig;
use crate::llm::{ModelClient, ModelInvoker, ModelSelection, ModelTier};
use crate::models::{OptionValue, ResearchOptions, ResearchResponse};

/// Runs one research request end to end.
///
/// Holds no per-request state; share it behind an `Arc` across tasks.
#[derive(Debug, Clone)]
pub struct ResearchService {
    invoker: ModelInvoker,
    credentials: CredentialConfig,
}

impl ResearchService {
    pub fn new(
        client: Arc<dyn ModelClient>,
        models: ModelSelection,
        credentials: CredentialConfig,
    ) -> Self {
        Self {
            invoker: ModelInvoker::new(client, models),
            credentials,
        }
    }

    pub fn has_default_credential(&self) -> bool {
        self.credentials.has_default()
    }

    /// Research a topic.
    ///
    /// A non-blank `credential_override` takes precedence over the injected
    /// default. Fails with [`ResearchError::Credential`] before any network
    /// call when neither is available.
    pub async fn perform_research(
        &self,
        options: &ResearchOptions,
        credential_override: Option<&str>,
    ) -> Result<ResearchResponse, ResearchError> {
        let tier = ModelTier::for_deep_research(options.deep_research);
        let span = tracing::info_span!(
            "perform_research",
            tier = %tier,
            language = options.language.wire_value(),
            focus = %options.search_focus.summary_label(),
        );

        async move {
            let (credential, source) = self
                .credentials
                .resolve(credential_override)
                .ok_or_else(|| ResearchError::Credential("no API key configured".to_string()))?;
            tracing::debug!(credential = ?source, "Resolved credential");

            let instructions = compose(options);

            let text = self
                .invoker
                .invoke(&instructions, options.deep_research, &credential)
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, credential = ?source, "Model call failed");
                    ResearchError::from(e)
                })?;

            let response = decode(&text).map_err(|failure| {
                tracing::warn!(error = %failure, "Could not decode model output");
                tracing::debug!(raw = failure.raw_text(), "Undecodable model output");
                failure
            })?;

            tracing::info!(cards = response.cards.len(), "Research complete");
            Ok(response)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockModel;
    use crate::models::fixtures::SAMPLE_RESPONSE_JSON;
    use crate::models::{Language, SearchFocus, SearchFocusSet};

    const DEFAULT_KEY: &str = "AIzaSyDefaultDefaultDefaultDefaultDef";
    const OVERRIDE_KEY: &str = "AIzaSyOverrideOverrideOverrideOverri";

    fn service(mock: Arc<MockModel>, credentials: CredentialConfig) -> ResearchService {
        ResearchService::new(mock, ModelSelection::new("fast-model", "deep-model"), credentials)
    }

    fn options() -> ResearchOptions {
        ResearchOptions::new("coral bleaching").unwrap()
    }

    #[tokio::test]
    async fn test_perform_research_success() {
        let mock = Arc::new(MockModel::new(SAMPLE_RESPONSE_JSON));
        let service = service(mock.clone(), CredentialConfig::with_default(DEFAULT_KEY));

        let response = service.perform_research(&options(), None).await.unwrap();
        assert_eq!(response.query, "coral bleaching");
        assert_eq!(response.cards.len(), 2);

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "fast-model");
        assert!(requests[0].search_grounding);
        assert!(requests[0].prompt.contains("\"query\": \"coral bleaching\""));
        assert_eq!(mock.keys_seen(), vec![DEFAULT_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_deep_research_uses_deep_model() {
        let mock = Arc::new(MockModel::new(SAMPLE_RESPONSE_JSON));
        let service = service(mock.clone(), CredentialConfig::with_default(DEFAULT_KEY));

        let opts = options().deep_research(true);
        service.perform_research(&opts, None).await.unwrap();
        assert_eq!(mock.requests()[0].model, "deep-model");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_call() {
        let mock = Arc::new(MockModel::new(SAMPLE_RESPONSE_JSON));
        let service = service(mock.clone(), CredentialConfig::none());

        let err = service.perform_research(&options(), None).await.unwrap_err();
        assert!(err.needs_credential());
        assert_eq!(mock.call_count(), 0);

        let err = service
            .perform_research(&options(), Some("   "))
            .await
            .unwrap_err();
        assert!(err.needs_credential());
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_override_takes_precedence() {
        let mock = Arc::new(MockModel::new(SAMPLE_RESPONSE_JSON));
        let service = service(mock.clone(), CredentialConfig::with_default(DEFAULT_KEY));

        service
            .perform_research(&options(), Some(OVERRIDE_KEY))
            .await
            .unwrap();
        assert_eq!(mock.keys_seen(), vec![OVERRIDE_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_override_without_default() {
        let mock = Arc::new(MockModel::new(SAMPLE_RESPONSE_JSON));
        let service = service(mock.clone(), CredentialConfig::none());

        assert!(service
            .perform_research(&options(), Some(OVERRIDE_KEY))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_rejected_key_is_credential_error() {
        let mock = Arc::new(MockModel::failing(400, "API key not valid."));
        let service = service(mock, CredentialConfig::with_default(DEFAULT_KEY));

        let err = service.perform_research(&options(), None).await.unwrap_err();
        assert!(err.needs_credential());
    }

    #[tokio::test]
    async fn test_server_error_is_upstream() {
        let mock = Arc::new(MockModel::failing(503, "The model is overloaded."));
        let service = service(mock, CredentialConfig::with_default(DEFAULT_KEY));

        let err = service.perform_research(&options(), None).await.unwrap_err();
        assert!(matches!(err, ResearchError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_network_and_empty_are_upstream() {
        let service_a = service(
            Arc::new(MockModel::unreachable("connection refused")),
            CredentialConfig::with_default(DEFAULT_KEY),
        );
        assert!(matches!(
            service_a.perform_research(&options(), None).await,
            Err(ResearchError::Upstream(_))
        ));

        let service_b = service(
            Arc::new(MockModel::empty()),
            CredentialConfig::with_default(DEFAULT_KEY),
        );
        assert!(matches!(
            service_b.perform_research(&options(), None).await,
            Err(ResearchError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_non_json_is_parse_error() {
        let mock = Arc::new(MockModel::new("I cannot comply."));
        let service = service(mock, CredentialConfig::with_default(DEFAULT_KEY));

        let err = service.perform_research(&options(), None).await.unwrap_err();
        assert!(matches!(err, ResearchError::Parse(_)));
        assert_eq!(err.raw_text(), Some("I cannot comply."));
    }

    #[tokio::test]
    async fn test_repaired_output_is_accepted() {
        let raw = format!(
            "```json\nHere you go: {}\n```",
            SAMPLE_RESPONSE_JSON.replace("\"Reefs can recover\"],", "\"Reefs can recover\"].")
        );
        let mock = Arc::new(MockModel::new(raw));
        let service = service(mock, CredentialConfig::with_default(DEFAULT_KEY));

        let response = service.perform_research(&options(), None).await.unwrap();
        assert_eq!(response.insights.len(), 2);
    }

    #[tokio::test]
    async fn test_options_flow_into_prompt() {
        let mock = Arc::new(MockModel::new(SAMPLE_RESPONSE_JSON));
        let service = service(mock.clone(), CredentialConfig::with_default(DEFAULT_KEY));

        let opts = options()
            .language(Language::Hindi)
            .search_focus(SearchFocusSet::from_selection([SearchFocus::Book]));
        service.perform_research(&opts, None).await.unwrap();

        let request = &mock.requests()[0];
        assert!(request.system_instruction.contains("Hindi"));
        assert!(request.system_instruction.contains("type: \"book\""));
    }

    #[test]
    fn test_service_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResearchService>();
    }
}
