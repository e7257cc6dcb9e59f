//! Research options: the closed option axes a caller picks before a request.
//!
//! Every axis is a closed enum with an exhaustive mapping to its wire value
//! (what the model sees and echoes back), a display label, and, for search
//! focus, the instruction clause used when composing the prompt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::{validate_topic, ValidationError};

/// Errors raised when parsing option values at the boundary
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OptionError {
    /// The value does not name any member of the option axis
    #[error("Unknown {axis} '{value}' (expected one of: {expected})")]
    UnknownValue {
        axis: &'static str,
        value: String,
        expected: String,
    },

    /// The topic failed validation
    #[error(transparent)]
    InvalidTopic(#[from] ValidationError),
}

/// Normalize a user-supplied option value for lookup.
///
/// Lowercases and drops spaces, hyphens and underscores so that
/// `"High School"`, `"high-school"` and `"HighSchool"` compare equal.
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn unknown<T: OptionValue>(value: &str) -> OptionError {
    OptionError::UnknownValue {
        axis: T::AXIS,
        value: value.to_string(),
        expected: T::ALL
            .iter()
            .map(|v| v.wire_value())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Shared behaviour of every option axis.
pub trait OptionValue: Copy + Sized + 'static {
    /// Name of the axis, used in error messages
    const AXIS: &'static str;

    /// Every member, in presentation order
    const ALL: &'static [Self];

    /// Canonical value sent to (and echoed by) the model
    fn wire_value(self) -> &'static str;

    /// Human-readable label
    fn label(self) -> &'static str;

    /// Parse a value leniently with respect to case and separators
    fn parse_value(value: &str) -> Result<Self, OptionError> {
        let needle = normalize(value);
        Self::ALL
            .iter()
            .copied()
            .find(|v| normalize(v.wire_value()) == needle || normalize(v.label()) == needle)
            .ok_or_else(|| unknown::<Self>(value))
    }
}

/// How technical the explanations should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ComplexityLevel {
    Elementary,
    #[serde(rename = "High School", alias = "HighSchool")]
    HighSchool,
    #[default]
    College,
    Expert,
}

impl OptionValue for ComplexityLevel {
    const AXIS: &'static str = "complexity level";
    const ALL: &'static [Self] = &[
        ComplexityLevel::Elementary,
        ComplexityLevel::HighSchool,
        ComplexityLevel::College,
        ComplexityLevel::Expert,
    ];

    fn wire_value(self) -> &'static str {
        match self {
            ComplexityLevel::Elementary => "Elementary",
            ComplexityLevel::HighSchool => "High School",
            ComplexityLevel::College => "College",
            ComplexityLevel::Expert => "Expert",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ComplexityLevel::Elementary => "Elementary school",
            ComplexityLevel::HighSchool => "High school",
            ComplexityLevel::College => "Undergraduate",
            ComplexityLevel::Expert => "Specialist",
        }
    }
}

/// Shape of the synthesized answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ResponseFormat {
    #[default]
    Detailed,
    Concise,
    #[serde(rename = "Bullet Points", alias = "BulletPoints")]
    BulletPoints,
    Table,
    #[serde(rename = "Step-by-Step", alias = "StepByStep")]
    StepByStep,
}

impl OptionValue for ResponseFormat {
    const AXIS: &'static str = "response format";
    const ALL: &'static [Self] = &[
        ResponseFormat::Detailed,
        ResponseFormat::Concise,
        ResponseFormat::BulletPoints,
        ResponseFormat::Table,
        ResponseFormat::StepByStep,
    ];

    fn wire_value(self) -> &'static str {
        match self {
            ResponseFormat::Detailed => "Detailed",
            ResponseFormat::Concise => "Concise",
            ResponseFormat::BulletPoints => "Bullet Points",
            ResponseFormat::Table => "Table",
            ResponseFormat::StepByStep => "Step-by-Step",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ResponseFormat::Detailed => "Detailed",
            ResponseFormat::Concise => "Concise",
            ResponseFormat::BulletPoints => "Bullet list",
            ResponseFormat::Table => "Comparison table",
            ResponseFormat::StepByStep => "Step by step",
        }
    }
}

/// Language every piece of generated text must be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    English,
    Spanish,
    French,
    German,
    Mandarin,
    Japanese,
    Hindi,
    Arabic,
    #[default]
    Portuguese,
    Russian,
}

impl OptionValue for Language {
    const AXIS: &'static str = "language";
    const ALL: &'static [Self] = &[
        Language::Portuguese,
        Language::English,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Mandarin,
        Language::Japanese,
        Language::Hindi,
        Language::Arabic,
        Language::Russian,
    ];

    fn wire_value(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Mandarin => "Mandarin",
            Language::Japanese => "Japanese",
            Language::Hindi => "Hindi",
            Language::Arabic => "Arabic",
            Language::Portuguese => "Portuguese",
            Language::Russian => "Russian",
        }
    }

    /// Endonym, as a speaker of the language would write it
    fn label(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Spanish => "Español",
            Language::French => "Français",
            Language::German => "Deutsch",
            Language::Mandarin => "中文",
            Language::Japanese => "日本語",
            Language::Hindi => "हिन्दी",
            Language::Arabic => "العربية",
            Language::Portuguese => "Português",
            Language::Russian => "Русский",
        }
    }
}

/// Kind of sources the model should prioritise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFocus {
    General,
    News,
    Academic,
    Scientific,
    Posts,
    Book,
}

impl SearchFocus {
    /// Instruction clause describing the sources this focus asks for
    pub fn instruction(self) -> &'static str {
        match self {
            SearchFocus::General => "A broad, general overview",
            SearchFocus::News => "Recent news, journalism and current events",
            SearchFocus::Academic => {
                "Peer-reviewed papers, academic articles and university publications"
            }
            SearchFocus::Scientific => {
                "Rigorous scientific data, laboratory studies and technical findings"
            }
            SearchFocus::Posts => {
                "Community discussions, forums (Reddit, etc.), blogs and public opinion"
            }
            SearchFocus::Book => "Books, literature, book chapters and renowned authors",
        }
    }
}

impl OptionValue for SearchFocus {
    const AXIS: &'static str = "search focus";
    const ALL: &'static [Self] = &[
        SearchFocus::General,
        SearchFocus::News,
        SearchFocus::Academic,
        SearchFocus::Scientific,
        SearchFocus::Book,
        SearchFocus::Posts,
    ];

    fn wire_value(self) -> &'static str {
        match self {
            SearchFocus::General => "general",
            SearchFocus::News => "news",
            SearchFocus::Academic => "academic",
            SearchFocus::Scientific => "scientific",
            SearchFocus::Posts => "posts",
            SearchFocus::Book => "book",
        }
    }

    fn label(self) -> &'static str {
        match self {
            SearchFocus::General => "General",
            SearchFocus::News => "News",
            SearchFocus::Academic => "Academic",
            SearchFocus::Scientific => "Scientific",
            SearchFocus::Posts => "Posts/Forums",
            SearchFocus::Book => "Books",
        }
    }
}

macro_rules! impl_option_traits {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.wire_value())
                }
            }

            impl FromStr for $ty {
                type Err = OptionError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Self::parse_value(s)
                }
            }
        )+
    };
}

impl_option_traits!(ComplexityLevel, ResponseFormat, Language, SearchFocus);

/// Selected search foci.
///
/// Ordered by selection and never empty. `General` is only ever present on
/// its own: selecting it clears every other focus, and selecting anything
/// else drops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchFocusSet(Vec<SearchFocus>);

impl Default for SearchFocusSet {
    fn default() -> Self {
        Self(vec![SearchFocus::General])
    }
}

impl SearchFocusSet {
    /// Build a set by selecting each focus in turn, starting from `{general}`
    pub fn from_selection<I>(foci: I) -> Self
    where
        I: IntoIterator<Item = SearchFocus>,
    {
        foci.into_iter().fold(Self::default(), |mut set, focus| {
            set.select(focus);
            set
        })
    }

    /// Parse a list of focus names; unknown names are rejected
    pub fn parse_all<S: AsRef<str>>(values: &[S]) -> Result<Self, OptionError> {
        let foci = values
            .iter()
            .map(|v| SearchFocus::parse_value(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_selection(foci))
    }

    /// Add a focus (idempotent)
    pub fn select(&mut self, focus: SearchFocus) {
        if focus == SearchFocus::General {
            self.0 = vec![SearchFocus::General];
            return;
        }
        self.0.retain(|f| *f != SearchFocus::General);
        if !self.0.contains(&focus) {
            self.0.push(focus);
        }
    }

    /// Flip a focus on or off, as a multi-select menu does
    pub fn toggle(&mut self, focus: SearchFocus) {
        if focus == SearchFocus::General {
            self.0 = vec![SearchFocus::General];
            return;
        }
        if self.is_general() {
            self.0 = vec![focus];
            return;
        }
        if self.0.contains(&focus) {
            self.0.retain(|f| *f != focus);
            if self.0.is_empty() {
                self.0.push(SearchFocus::General);
            }
            return;
        }
        self.0.push(focus);
    }

    /// Whether the set is exactly `{general}`
    pub fn is_general(&self) -> bool {
        self.0 == [SearchFocus::General]
    }

    pub fn contains(&self, focus: SearchFocus) -> bool {
        self.0.contains(&focus)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SearchFocus> + '_ {
        self.0.iter().copied()
    }

    /// Short summary for menus: "General", a single label, or "N selected"
    pub fn summary_label(&self) -> String {
        match self.0.as_slice() {
            [single] => single.label().to_string(),
            foci => format!("{} selected", foci.len()),
        }
    }
}

impl<'de> Deserialize<'de> for SearchFocusSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let foci = Vec::<SearchFocus>::deserialize(deserializer)?;
        Ok(Self::from_selection(foci))
    }
}

/// Everything needed to compose one research request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchOptions {
    topic: String,
    pub complexity_level: ComplexityLevel,
    pub response_format: ResponseFormat,
    pub language: Language,
    pub search_focus: SearchFocusSet,
    pub deep_research: bool,
}

impl ResearchOptions {
    /// Create options for a topic with default axes.
    ///
    /// The topic is trimmed and validated.
    pub fn new(topic: &str) -> Result<Self, OptionError> {
        Ok(Self {
            topic: validate_topic(topic)?,
            complexity_level: ComplexityLevel::default(),
            response_format: ResponseFormat::default(),
            language: Language::default(),
            search_focus: SearchFocusSet::default(),
            deep_research: false,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn complexity_level(mut self, level: ComplexityLevel) -> Self {
        self.complexity_level = level;
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn search_focus(mut self, focus: SearchFocusSet) -> Self {
        self.search_focus = focus;
        self
    }

    pub fn deep_research(mut self, enabled: bool) -> Self {
        self.deep_research = enabled;
        self
    }
}
