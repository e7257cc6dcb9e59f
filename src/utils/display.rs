//! Rendering of research results for terminals and text front ends.
//!
//! Everything here returns strings or tables so the CLI and tests share one
//! rendering path. Colour and spinners live in [`crate::ui`].

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use std::io::{self, IsTerminal};
use std::sync::OnceLock;
use terminal_size::terminal_size;
use unicode_width::UnicodeWidthChar;

use crate::models::{ResearchCard, ResearchResponse};

/// Default width when terminal size cannot be determined.
pub const DEFAULT_WIDTH: usize = 100;

/// Terminal information with cached size and capabilities.
#[derive(Debug, Clone)]
pub struct Terminal {
    width: usize,
    is_tty: bool,
}

static TERMINAL_INFO: OnceLock<Terminal> = OnceLock::new();

/// Get the global terminal information, initialized on first call.
pub fn terminal_info() -> &'static Terminal {
    TERMINAL_INFO.get_or_init(|| Terminal {
        width: terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(DEFAULT_WIDTH),
        is_tty: io::stdout().is_terminal(),
    })
}

/// Current terminal width in characters.
#[inline]
pub fn terminal_width() -> usize {
    terminal_info().width
}

/// Whether stdout is a terminal.
#[inline]
pub fn is_terminal() -> bool {
    terminal_info().is_tty
}

/// Truncate text to a display width, appending `...` when cut.
///
/// Wide characters count as two columns.
///
/// ```
/// use research_cards::utils::truncate_with_ellipsis;
///
/// assert_eq!(truncate_with_ellipsis("Hello World", 8), "Hello...");
/// assert_eq!(truncate_with_ellipsis("Hi", 8), "Hi");
/// ```
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let char_widths: Vec<(char, usize)> = text
        .chars()
        .map(|c| (c, UnicodeWidthChar::width(c).unwrap_or(1)))
        .collect();

    let total_width: usize = char_widths.iter().map(|(_, w)| *w).sum();
    if total_width <= max_width {
        return text.to_string();
    }

    let budget = max_width.saturating_sub(3);
    let mut current_width = 0;
    let mut end_idx = 0;

    for (i, (_, w)) in char_widths.iter().enumerate() {
        if current_width + w > budget {
            break;
        }
        current_width += w;
        end_idx = i + 1;
    }

    if end_idx == 0 {
        return "...".to_string();
    }

    let truncated: String = char_widths[..end_idx].iter().map(|(c, _)| *c).collect();
    format!("{}...", truncated)
}

/// Uppercase badge for a card type, e.g. `ACADEMIC`
pub fn type_badge(card: &ResearchCard) -> String {
    card.card_type.id().to_uppercase()
}

/// `source - date`, or just the source when no usable date was given
pub fn source_line(card: &ResearchCard) -> String {
    match card
        .publication_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("n/a"))
    {
        Some(date) => format!("{} - {}", card.source, date),
        None => card.source.clone(),
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String], markdown: bool) {
    if items.is_empty() {
        return;
    }
    if markdown {
        out.push_str(&format!("**{}**\n\n", heading));
    } else {
        out.push_str(&format!("{}:\n", heading));
    }
    for item in items {
        out.push_str(&format!("- {}\n", item));
    }
    out.push('\n');
}

fn push_numbered(out: &mut String, items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, item));
    }
}

/// Render one card in full as Markdown
pub fn card_markdown(card: &ResearchCard) -> String {
    let mut out = String::new();

    out.push_str(&format!("### {}\n\n", card.title));
    out.push_str(&format!("`{}` {}\n\n", type_badge(card), source_line(card)));
    if let Some(authors) = card.authors_display() {
        out.push_str(&format!("*{}*\n\n", authors));
    }

    out.push_str(&format!("{}\n\n", card.level_adapted_explanation));
    push_list(&mut out, "Key points", &card.key_points, true);

    let modal = &card.modal_content;
    if !modal.detailed_explanation.trim().is_empty() {
        out.push_str(&format!("**In depth**\n\n{}\n\n", modal.detailed_explanation));
    }
    push_list(&mut out, "Examples", &modal.examples, true);
    push_list(&mut out, "Related concepts", &modal.related_concepts, true);
    push_list(&mut out, "Caveats", &modal.caveats_or_limitations, true);

    if let Some(url) = card.url.as_deref().filter(|u| !u.trim().is_empty()) {
        out.push_str(&format!("Source: <{}>\n", url));
    }

    out.trim_end().to_string() + "\n"
}

/// Render one card in full as plain text
pub fn card_plain(card: &ResearchCard) -> String {
    let mut out = String::new();

    out.push_str(&format!("[{}] {}\n", type_badge(card), source_line(card)));
    out.push_str(&format!("{}\n", card.title));
    if let Some(authors) = card.authors_display() {
        out.push_str(&format!("By {}\n", authors));
    }
    out.push('\n');

    out.push_str(&format!("{}\n\n", card.level_adapted_explanation));
    push_list(&mut out, "Key points", &card.key_points, false);

    let modal = &card.modal_content;
    if !modal.detailed_explanation.trim().is_empty() {
        out.push_str(&format!("In depth:\n{}\n\n", modal.detailed_explanation));
    }
    push_list(&mut out, "Examples", &modal.examples, false);
    push_list(&mut out, "Related concepts", &modal.related_concepts, false);
    push_list(&mut out, "Caveats", &modal.caveats_or_limitations, false);

    if let Some(url) = card.url.as_deref().filter(|u| !u.trim().is_empty()) {
        out.push_str(&format!("Source: {}\n", url));
    }

    out.trim_end().to_string() + "\n"
}

/// Render a whole response as Markdown.
///
/// Safety notes come first, then the summary, insights, cards by relevance
/// and numbered follow-up questions.
pub fn response_markdown(response: &ResearchResponse) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", response.query));

    if !response.safety_notes.is_empty() {
        for note in &response.safety_notes {
            out.push_str(&format!("> **Note:** {}\n", note));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "*{} · {} · {}*\n\n",
        response.language, response.complexity_level, response.response_format
    ));

    out.push_str(&format!("## Summary\n\n{}\n\n", response.global_summary));

    if !response.insights.is_empty() {
        out.push_str("## Insights\n\n");
        for insight in &response.insights {
            out.push_str(&format!("- {}\n", insight));
        }
        out.push('\n');
    }

    if !response.cards.is_empty() {
        out.push_str(&format!("## Sources ({})\n\n", response.cards.len()));
        for card in response.cards_by_relevance() {
            out.push_str(&card_markdown(card));
            out.push('\n');
        }
    }

    if !response.follow_up_suggestions.is_empty() {
        out.push_str("## Follow-up questions\n\n");
        push_numbered(&mut out, &response.follow_up_suggestions);
    }

    out.trim_end().to_string() + "\n"
}

/// Render a whole response as plain text, one card summary per source
pub fn response_plain(response: &ResearchResponse) -> String {
    let mut out = String::new();

    for note in &response.safety_notes {
        out.push_str(&format!("NOTE: {}\n", note));
    }
    if !response.safety_notes.is_empty() {
        out.push('\n');
    }

    out.push_str(&format!("{}\n\n", response.query));
    out.push_str(&format!("{}\n\n", response.global_summary));
    push_list(&mut out, "Insights", &response.insights, false);

    for card in response.cards_by_relevance() {
        out.push_str(&format!(
            "[{}] {} ({})\n",
            card.id,
            card.title,
            source_line(card)
        ));
        out.push_str(&format!("  {}\n", card.snippet));
        if let Some(url) = &card.url {
            out.push_str(&format!("  URL: {}\n", url));
        }
        out.push('\n');
    }

    if !response.follow_up_suggestions.is_empty() {
        out.push_str("Follow-up questions:\n");
        push_numbered(&mut out, &response.follow_up_suggestions);
    }

    out.trim_end().to_string() + "\n"
}

/// Table of cards ordered by relevance
pub fn cards_table(response: &ResearchResponse, width: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width.min(u16::MAX as usize) as u16)
        .set_header(vec!["ID", "Type", "Title", "Source", "Relevance"]);

    let title_width = (width / 2).max(20);
    for card in response.cards_by_relevance() {
        table.add_row(vec![
            Cell::new(&card.id),
            Cell::new(card.card_type.id()),
            Cell::new(truncate_with_ellipsis(&card.title, title_width)).add_attribute(Attribute::Bold),
            Cell::new(source_line(card)),
            Cell::new(format!("{:.2}", card.relevance_score)),
        ]);
    }

    table
}
