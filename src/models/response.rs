//! Typed research response: the summary plus one knowledge card per source.
//!
//! Field names follow the camelCase JSON the model is instructed to emit.

use serde::{Deserialize, Deserializer, Serialize};

use super::options::{ComplexityLevel, Language, OptionValue, ResponseFormat};

/// Decode an echoed option value with the same leniency as user input.
///
/// The model may echo `"Português"` or `"high school"` instead of the exact
/// wire value.
fn lenient_option<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: OptionValue,
{
    let value = String::deserialize(deserializer)?;
    T::parse_value(&value).map_err(serde::de::Error::custom)
}

/// Kind of source a card represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    News,
    Academic,
    Book,
    Web,
    /// Anything the model labels with a type outside the known set
    #[serde(other)]
    Other,
}

impl CardType {
    pub fn id(&self) -> &'static str {
        match self {
            CardType::News => "news",
            CardType::Academic => "academic",
            CardType::Book => "book",
            CardType::Web => "web",
            CardType::Other => "other",
        }
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Expanded content shown when a card is opened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalContent {
    pub detailed_explanation: String,
    pub examples: Vec<String>,
    pub related_concepts: Vec<String>,
    pub caveats_or_limitations: Vec<String>,
}

/// One source with its level-adapted explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchCard {
    /// Unique within its response only
    pub id: String,

    #[serde(rename = "type")]
    pub card_type: CardType,

    pub title: String,

    /// Publication or site name
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub snippet: String,

    pub key_points: Vec<String>,

    pub level_adapted_explanation: String,

    pub modal_content: ModalContent,

    pub relevance_score: f64,
}

impl ResearchCard {
    /// Authors joined for display, if any were reported
    pub fn authors_display(&self) -> Option<String> {
        self.authors
            .as_ref()
            .filter(|a| !a.is_empty())
            .map(|a| a.join(", "))
    }
}

/// Complete result of one research request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResponse {
    pub query: String,

    #[serde(deserialize_with = "lenient_option")]
    pub language: Language,

    #[serde(deserialize_with = "lenient_option")]
    pub complexity_level: ComplexityLevel,

    #[serde(deserialize_with = "lenient_option")]
    pub response_format: ResponseFormat,

    #[serde(rename = "useDeepResearch", alias = "deepResearch")]
    pub deep_research: bool,

    pub global_summary: String,

    pub insights: Vec<String>,

    pub cards: Vec<ResearchCard>,

    pub follow_up_suggestions: Vec<String>,

    pub safety_notes: Vec<String>,
}

impl ResearchResponse {
    /// Look up a card by id
    pub fn card(&self, id: &str) -> Option<&ResearchCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Cards ordered by descending relevance; ties keep response order
    pub fn cards_by_relevance(&self) -> Vec<&ResearchCard> {
        let mut cards: Vec<&ResearchCard> = self.cards.iter().collect();
        cards.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        cards
    }

    /// Number of cards of the given type
    pub fn count_of(&self, card_type: CardType) -> usize {
        self.cards.iter().filter(|c| c.card_type == card_type).count()
    }
}
