//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::DefaultsConfig;
use crate::models::{
    ComplexityLevel, Language, OptionError, OptionValue, ResearchOptions, ResponseFormat,
    SearchFocus, SearchFocusSet,
};
use crate::research::ResearchService;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "perform_research")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Errors returned by tool handlers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// The caller sent arguments the tool cannot accept
    #[error("{0}")]
    InvalidParams(String),

    /// The tool ran but could not produce a result
    #[error("{0}")]
    Failed(String),
}

impl From<OptionError> for ToolError {
    fn from(err: OptionError) -> Self {
        ToolError::InvalidParams(err.to_string())
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry with the research tools bound to `service`
    pub fn for_service(service: Arc<ResearchService>, defaults: DefaultsConfig) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: "perform_research".to_string(),
            description: "Research a topic with web-grounded search and return a summary, \
                          insights, source cards and follow-up questions."
                .to_string(),
            input_schema: perform_research_schema(&defaults),
            handler: Arc::new(PerformResearchHandler { service, defaults }),
        });

        registry.register(Tool {
            name: "list_research_options".to_string(),
            description: "List the accepted values for complexity level, response format, \
                          language and search focus."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
            handler: Arc::new(ListResearchOptionsHandler),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::InvalidParams(format!("Tool '{}' not found", name)))?;

        tool.handler.execute(args).await
    }
}

fn wire_values<T: OptionValue>() -> Vec<&'static str> {
    T::ALL.iter().map(|v| v.wire_value()).collect()
}

fn option_table<T: OptionValue>() -> Value {
    T::ALL
        .iter()
        .map(|v| json!({ "value": v.wire_value(), "label": v.label() }))
        .collect()
}

fn perform_research_schema(defaults: &DefaultsConfig) -> Value {
    json!({
        "type": "object",
        "properties": {
            "topic": {
                "type": "string",
                "description": "Topic or question to research"
            },
            "complexity_level": {
                "type": "string",
                "description": "How technical the explanation should be",
                "enum": wire_values::<ComplexityLevel>(),
                "default": defaults.complexity_level.wire_value()
            },
            "response_format": {
                "type": "string",
                "description": "Shape of the summary",
                "enum": wire_values::<ResponseFormat>(),
                "default": defaults.response_format.wire_value()
            },
            "language": {
                "type": "string",
                "description": "Language of every generated text",
                "enum": wire_values::<Language>(),
                "default": defaults.language.wire_value()
            },
            "search_focus": {
                "type": "array",
                "description": "Kinds of sources to favour. Empty or omitted means general search.",
                "items": {
                    "type": "string",
                    "enum": wire_values::<SearchFocus>()
                }
            },
            "deep_research": {
                "type": "boolean",
                "description": "Use the slower, more thorough model",
                "default": defaults.deep_research
            },
            "api_key": {
                "type": "string",
                "description": "Gemini API key for this call. Falls back to the server's key."
            }
        },
        "required": ["topic"]
    })
}

#[derive(Debug, Deserialize)]
struct PerformResearchArgs {
    topic: String,
    #[serde(default)]
    complexity_level: Option<String>,
    #[serde(default)]
    response_format: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    search_focus: Option<Vec<String>>,
    #[serde(default)]
    deep_research: Option<bool>,
    #[serde(default)]
    api_key: Option<String>,
}

impl PerformResearchArgs {
    fn into_options(self, defaults: &DefaultsConfig) -> Result<ResearchOptions, OptionError> {
        let mut options = defaults.options_for(&self.topic)?;
        if let Some(level) = self.complexity_level.as_deref() {
            options = options.complexity_level(ComplexityLevel::parse_value(level)?);
        }
        if let Some(format) = self.response_format.as_deref() {
            options = options.response_format(ResponseFormat::parse_value(format)?);
        }
        if let Some(language) = self.language.as_deref() {
            options = options.language(Language::parse_value(language)?);
        }
        if let Some(foci) = self.search_focus.as_deref() {
            options = options.search_focus(SearchFocusSet::parse_all(foci)?);
        }
        if let Some(deep) = self.deep_research {
            options = options.deep_research(deep);
        }
        Ok(options)
    }
}

/// Handler for `perform_research`
#[derive(Debug)]
pub struct PerformResearchHandler {
    service: Arc<ResearchService>,
    defaults: DefaultsConfig,
}

#[async_trait::async_trait]
impl ToolHandler for PerformResearchHandler {
    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let mut args: PerformResearchArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidParams(format!("Invalid arguments: {}", e)))?;
        let api_key = args.api_key.take();
        let options = args.into_options(&self.defaults)?;

        tracing::info!(topic = options.topic(), "perform_research tool called");

        let response = self
            .service
            .perform_research(&options, api_key.as_deref())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "perform_research tool failed");
                ToolError::Failed(e.user_message().to_string())
            })?;

        serde_json::to_value(&response)
            .map_err(|e| ToolError::Failed(format!("Failed to serialize response: {}", e)))
    }
}

/// Handler for `list_research_options`
#[derive(Debug)]
pub struct ListResearchOptionsHandler;

#[async_trait::async_trait]
impl ToolHandler for ListResearchOptionsHandler {
    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(json!({
            "complexity_level": option_table::<ComplexityLevel>(),
            "response_format": option_table::<ResponseFormat>(),
            "language": option_table::<Language>(),
            "search_focus": option_table::<SearchFocus>(),
        }))
    }
}
