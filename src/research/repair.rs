//! Repair and decoding of model output.
//!
//! The model is asked for bare JSON but often wraps it in a code fence,
//! surrounds it with prose, or puts a period after a closing bracket. Each
//! repair pass fixes one of these and leaves everything else untouched.

use regex::Regex;
use std::sync::OnceLock;

use super::ParseFailure;
use crate::models::ResearchResponse;

/// A single named repair pass
pub type RepairPass = fn(&str) -> String;

/// Repair passes in the order they run
pub const PASSES: &[(&str, RepairPass)] = &[
    ("strip_code_fence", strip_code_fence),
    ("extract_outer_object", extract_outer_object),
    ("fix_period_after_array", fix_period_after_array),
];

fn fence_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```json\s*").expect("valid regex"))
}

fn fence_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^```\s*").expect("valid regex"))
}

fn fence_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```$").expect("valid regex"))
}

fn period_after_array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\]\.\s*""#).expect("valid regex"))
}

/// Remove a leading ```` ```json ```` or ```` ``` ```` fence and a trailing
/// ```` ``` ````, then trim.
pub fn strip_code_fence(text: &str) -> String {
    let text = fence_json_re().replace(text, "");
    let text = fence_open_re().replace(&text, "");
    let text = fence_close_re().replace(&text, "");
    text.trim().to_string()
}

/// Keep the span from the first `{` to the last `}`, inclusive
pub fn extract_outer_object(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(first), Some(last)) if last > first => text[first..=last].to_string(),
        _ => text.to_string(),
    }
}

/// Replace `].` followed by optional whitespace and a quote with `], "`.
///
/// Operates on raw text, so the same sequence inside a string value is
/// rewritten too.
pub fn fix_period_after_array(text: &str) -> String {
    period_after_array_re()
        .replace_all(text, r#"], ""#)
        .into_owned()
}

/// Run every repair pass in order
pub fn repair(raw: &str) -> String {
    PASSES.iter().fold(raw.to_string(), |text, (name, pass)| {
        let repaired = pass(&text);
        if repaired != text {
            tracing::trace!(pass = name, "Repair pass changed model output");
        }
        repaired
    })
}

/// Repair model output and decode it strictly into a response
pub fn decode(raw: &str) -> Result<ResearchResponse, ParseFailure> {
    let repaired = repair(raw);
    serde_json::from_str(&repaired).map_err(|e| ParseFailure::new(e.to_string(), repaired))
}
