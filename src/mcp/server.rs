//! MCP server implementation using pmcp (Pragmatic AI's rust-mcp-sdk).
//!
//! Exposes the research tools over stdio or streamable HTTP.

use crate::config::DefaultsConfig;
use crate::mcp::tools::{ToolError, ToolRegistry};
use crate::research::ResearchService;
use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::StreamableHttpServer, Error, RequestHandlerExtra, Server,
    ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// The MCP server for Research Cards
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
}

impl McpServer {
    /// Create a new MCP server backed by `service`.
    ///
    /// `defaults` fill any option a tool call leaves out.
    pub fn new(service: Arc<ResearchService>, defaults: DefaultsConfig) -> Result<Self, Error> {
        let tools = ToolRegistry::for_service(service, defaults);
        let server = Self::build_server_impl(tools)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
        })
    }

    fn build_server_impl(tools: ToolRegistry) -> Result<Server, Error> {
        let mut builder = Server::builder()
            .name("research-cards")
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.all() {
            let tool_handler = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema.clone(),
                handler: tool.handler.clone(),
            };
            builder = builder.tool(tool_handler.name.clone(), tool_handler);
        }

        builder.build()
    }

    /// Run the server in stdio mode
    pub async fn run(self) -> Result<(), Error> {
        tracing::info!("Starting MCP server in stdio mode");

        // run_stdio() takes ownership of the Server
        let server = Arc::try_unwrap(self.server)
            .map_err(|_| Error::internal("Cannot unwrap Arc - multiple references exist"))?
            .into_inner();

        server.run_stdio().await
    }

    /// Run the server in streamable HTTP mode
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), Error> {
        tracing::info!("Starting MCP server in HTTP mode on {}", addr);

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))?;

        StreamableHttpServer::new(socket_addr, self.server.clone())
            .start()
            .await
    }
}

/// Adapts a registry tool to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        self.handler.execute(args).await.map_err(|e| match e {
            ToolError::InvalidParams(msg) => Error::invalid_params(msg),
            ToolError::Failed(msg) => Error::internal(msg),
        })
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialConfig;
    use crate::llm::{MockModel, ModelSelection};

    #[test]
    fn test_server_builds() {
        let service = ResearchService::new(
            Arc::new(MockModel::new("{}")),
            ModelSelection::default(),
            CredentialConfig::none(),
        );
        let server = McpServer::new(Arc::new(service), DefaultsConfig::default());
        assert!(server.is_ok());
    }

    #[test]
    fn test_wrapper_metadata() {
        let wrapper = ToolWrapper {
            name: "list_research_options".to_string(),
            description: Some("List options".to_string()),
            input_schema: serde_json::json!({ "type": "object" }),
            handler: Arc::new(crate::mcp::tools::ListResearchOptionsHandler),
        };
        let info = wrapper.metadata().unwrap();
        assert_eq!(info.name, "list_research_options");
    }
}
