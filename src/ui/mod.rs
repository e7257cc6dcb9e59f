//! Terminal UI helpers: colours, icons and spinners.
//!
//! Status lines and spinners go to stderr so stdout carries only results.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::models::{CardType, ResearchResponse};
use crate::utils::{cards_table, terminal_width};

/// Status types for coloured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Icon for each kind of card
pub fn card_type_icon(card_type: CardType) -> &'static str {
    match card_type {
        CardType::News => "📰",
        CardType::Academic => "🎓",
        CardType::Book => "📚",
        CardType::Web => "🌐",
        CardType::Other => "📄",
    }
}

/// Print a styled status line to stderr.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
        Status::Search => eprintln!("{} {}", icon.yellow(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Welcome banner shown when no command is given.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");

    println!();
    println!("{}", format!("🔬 Research Cards v{}", version).bold().cyan());
    println!("   Grounded research, organised into knowledge cards.");
    println!();
    println!("   Examples:");
    println!("     research-cards research \"coral bleaching\" --language English");
    println!("     research-cards r \"quantum computing\" --level expert --focus academic --deep");
    println!("     research-cards options");
    println!("     research-cards serve");
    println!();
}

/// Print a response for an interactive terminal.
pub fn print_response(response: &ResearchResponse, duration: Duration) {
    println!();
    println!(
        "{} {}",
        status_icon(Status::Search).yellow().bold(),
        response.query.cyan().bold()
    );
    println!(
        "{} {} sources in {:.1}s · {} · {} · {}",
        "─".repeat(20).dimmed(),
        response.cards.len().to_string().green().bold(),
        duration.as_secs_f64(),
        response.language,
        response.complexity_level,
        response.response_format,
    );

    for note in &response.safety_notes {
        println!("{} {}", status_icon(Status::Warning).yellow().bold(), note.yellow());
    }

    print_section("Summary");
    println!("{}", response.global_summary);

    if !response.insights.is_empty() {
        print_section("Insights");
        for insight in &response.insights {
            println!("  {} {}", "•".cyan(), insight);
        }
    }

    if !response.cards.is_empty() {
        print_section("Sources");
        for card in response.cards_by_relevance() {
            println!("  {} {}", card_type_icon(card.card_type), card.title.bold());
        }
        println!();
        println!("{}", cards_table(response, terminal_width()));
        println!(
            "{}",
            "Use --card <ID> to print one card in full.".dimmed()
        );
    }

    if !response.follow_up_suggestions.is_empty() {
        print_section("Follow-up questions");
        for (i, suggestion) in response.follow_up_suggestions.iter().enumerate() {
            println!("  {} {}", format!("{}.", i + 1).cyan(), suggestion);
        }
    }
    println!();
}

fn style(template: &str, tick_chars: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(tick_chars)
}

/// Spinner shown while waiting on the model.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    pub fn new(msg: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(style("{spinner:.cyan} {msg} {elapsed:.dim}", "🔬⚗️🧪🧫🔭📡🧬⚛️ "));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(150));

        Self { pb }
    }

    /// A spinner that never draws, for quiet or non-interactive runs.
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_success(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.green} {msg}", "✓✓"));
        self.pb.finish_with_message(msg.to_string());
    }

    pub fn finish_with_error(&self, msg: &str) {
        self.pb.set_style(style("{spinner:.red} {msg}", "✗✗"));
        self.pb.finish_with_message(msg.to_string());
    }

    /// Remove the spinner without leaving a line behind.
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}
