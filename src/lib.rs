//! # Research Cards
//!
//! Web-grounded research assistant: send a topic to a Gemini model with
//! Google Search grounding, repair its JSON output, and return a summary,
//! insights, typed source cards and follow-up questions.
//!
//! ## Architecture
//!
//! - [`models`]: Research options and the response document
//! - [`research`]: Prompt composition, output repair and [`ResearchService`]
//! - [`llm`]: Model client trait and the Gemini implementation
//! - [`mcp`]: MCP protocol server exposing the research tools
//! - [`config`]: Configuration files, environment and credentials
//! - [`utils`]: HTTP client, validation and rendering helpers
//! - [`ui`]: Terminal output

pub mod config;
pub mod llm;
pub mod mcp;
pub mod models;
pub mod research;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{ResearchCard, ResearchOptions, ResearchResponse};
pub use research::{ResearchError, ResearchService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
