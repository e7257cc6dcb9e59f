//! Utility modules supporting research operations.
//!
//! - [`HttpClient`]: shared `reqwest` client with user agent and timeouts
//! - [`validate_topic`], [`validate_endpoint`], [`looks_like_api_key`]: input checks
//! - [`response_markdown`], [`card_markdown`], [`cards_table`]: result rendering
//!
//! # Rendering
//!
//! ```rust,no_run
//! use research_cards::models::ResearchResponse;
//! use research_cards::utils::{card_markdown, response_markdown};
//!
//! # fn example(response: &ResearchResponse) {
//! print!("{}", response_markdown(response));
//! if let Some(card) = response.card("card_1") {
//!     print!("{}", card_markdown(card));
//! }
//! # }
//! ```

mod display;
mod http;
mod validate;

pub use display::{
    card_markdown, card_plain, cards_table, is_terminal, response_markdown, response_plain,
    source_line, terminal_info, terminal_width, truncate_with_ellipsis, type_badge, Terminal,
    DEFAULT_WIDTH,
};
pub use http::{user_agent, HttpClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
pub use validate::{
    looks_like_api_key, validate_endpoint, validate_topic, ValidationError, MAX_TOPIC_CHARS,
};
