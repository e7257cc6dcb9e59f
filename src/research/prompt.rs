//! Instruction composition.
//!
//! Turns [`ResearchOptions`] into the system instruction and user prompt sent
//! to the model. Output structure is requested in the prompt text itself:
//! the API does not accept a JSON response mode together with the search
//! tool.

use crate::models::{OptionValue, ResearchOptions, SearchFocus};

/// Text sent to the model for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructions {
    pub system_instruction: String,
    pub prompt: String,
}

/// Focus clauses for every selected focus, joined with `"; "`
pub fn focus_instruction(options: &ResearchOptions) -> String {
    options
        .search_focus
        .iter()
        .map(SearchFocus::instruction)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Compose the instructions for a request. Pure and deterministic.
pub fn compose(options: &ResearchOptions) -> Instructions {
    Instructions {
        system_instruction: system_instruction(options),
        prompt: user_prompt(options),
    }
}

fn system_instruction(options: &ResearchOptions) -> String {
    let language = options.language.wire_value();
    let level = options.complexity_level.wire_value();
    let format = options.response_format.wire_value();
    let focus = focus_instruction(options);

    let mut text = format!(
        "[ROLE]
You are a research assistant for academic study and guided curiosity, focused on teaching and on making knowledge visible.
Act like a teacher-researcher who turns the chaos of the internet into structured knowledge adapted to the reader's level.

[OBJECTIVE]
Given a research topic and the reader's preferences:
1. Research the topic with the connected search tools.
2. Organize the results into cards, distinguishing news, academic articles, books and general content.
3. For every card, write an adapted summary, key points and metadata.
4. Write a global summary and follow-up questions.

[CRITERIA]
- ALWAYS answer in this language: {language}.
- Complexity level: {level}.
- Response format: {format}.
- Research focuses (COMBINED): {focus}.
"
    );

    if options.search_focus.contains(SearchFocus::Book) {
        text.push_str(
            "- Books are a selected focus: find relevant books and categorize them with type: \"book\".\n",
        );
    }

    if options.deep_research {
        text.push_str("- Deep research is on: search more thoroughly and synthesize in depth.\n");
    }

    text
}

fn user_prompt(options: &ResearchOptions) -> String {
    let topic = json_string(options.topic());
    let language = options.language.wire_value();
    let level = options.complexity_level.wire_value();
    let format = options.response_format.wire_value();
    let deep = options.deep_research;
    let focus = focus_instruction(options);
    let focus_values = options
        .search_focus
        .iter()
        .map(SearchFocus::wire_value)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Carry out thorough research on: {topic}.

Parameters:
- Language: {language}
- Level: {level}
- Format: {format}
- Deep research enabled: {deep}
- Priority source types: {focus_values}

Focus instruction: actively look for sources that fit: {focus}.

IMPORTANT: Return ONLY valid JSON. Do not include introductory text or markdown code fences (```json).
Make sure all textual content (titles, summaries, explanations) is written in {language}.
Do NOT put a period after the closing bracket of an array or the closing brace of an object ("],." is invalid).

Follow exactly this JSON structure:
{{
  "query": {topic},
  "language": "{language}",
  "complexityLevel": "{level}",
  "responseFormat": "{format}",
  "useDeepResearch": {deep},
  "globalSummary": "General summary of the topic...",
  "insights": ["Interesting fact 1", "Interesting fact 2"],
  "cards": [
    {{
      "id": "unique_id_1",
      "type": "news" | "academic" | "book" | "web" | "other",
      "title": "Title of the resource",
      "source": "Name of the source or site",
      "authors": ["Author 1", "Author 2"],
      "publicationDate": "Date or 'N/A'",
      "url": "URL if available",
      "snippet": "Short summary of the content...",
      "keyPoints": ["Key point 1", "Key point 2"],
      "levelAdaptedExplanation": "Explanation adapted to the {level} level...",
      "modalContent": {{
        "detailedExplanation": "In-depth explanation...",
        "examples": ["Practical example 1"],
        "relatedConcepts": ["Related concept A"],
        "caveatsOrLimitations": ["Limitation or important context"]
      }},
      "relevanceScore": 0.9
    }}
  ],
  "followUpSuggestions": ["Suggested question 1?", "Suggested question 2?"],
  "safetyNotes": ["Note about bias or safety if needed"]
}}
"#
    )
}

/// Quote and escape a string as a JSON literal
fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplexityLevel, Language, ResponseFormat, SearchFocusSet};

    fn options(topic: &str) -> ResearchOptions {
        ResearchOptions::new(topic).unwrap()
    }

    #[test]
    fn test_compose_is_deterministic() {
        let opts = options("photosynthesis")
            .language(Language::French)
            .search_focus(SearchFocusSet::from_selection([
                SearchFocus::News,
                SearchFocus::Book,
            ]));
        assert_eq!(compose(&opts), compose(&opts.clone()));
    }

    #[test]
    fn test_focus_clauses_joined_in_order() {
        let opts = options("volcanoes").search_focus(SearchFocusSet::from_selection([
            SearchFocus::Scientific,
            SearchFocus::News,
        ]));
        assert_eq!(
            focus_instruction(&opts),
            format!(
                "{}; {}",
                SearchFocus::Scientific.instruction(),
                SearchFocus::News.instruction()
            )
        );
    }

    #[test]
    fn test_directives_name_every_axis() {
        let opts = options("black holes")
            .complexity_level(ComplexityLevel::Elementary)
            .response_format(ResponseFormat::StepByStep)
            .language(Language::Japanese);
        let instructions = compose(&opts);

        assert!(instructions
            .system_instruction
            .contains("ALWAYS answer in this language: Japanese."));
        assert!(instructions
            .system_instruction
            .contains("Complexity level: Elementary."));
        assert!(instructions
            .system_instruction
            .contains("Response format: Step-by-Step."));
        assert!(instructions
            .system_instruction
            .contains(SearchFocus::General.instruction()));

        assert!(instructions.prompt.contains("\"language\": \"Japanese\""));
        assert!(instructions.prompt.contains("\"complexityLevel\": \"Elementary\""));
        assert!(instructions.prompt.contains("\"responseFormat\": \"Step-by-Step\""));
        assert!(instructions.prompt.contains("\"useDeepResearch\": false"));
        assert!(instructions.prompt.contains("Priority source types: general"));
    }

    #[test]
    fn test_book_directive_only_with_book_focus() {
        let without = compose(&options("novels"));
        assert!(!without.system_instruction.contains("type: \"book\""));

        let with = compose(&options("novels").search_focus(SearchFocusSet::from_selection([
            SearchFocus::Academic,
            SearchFocus::Book,
        ])));
        assert!(with.system_instruction.contains("type: \"book\""));
        assert!(with.prompt.contains("Priority source types: academic, book"));
    }

    #[test]
    fn test_deep_research_directive() {
        let shallow = compose(&options("tides"));
        assert!(!shallow.system_instruction.contains("Deep research is on"));

        let deep = compose(&options("tides").deep_research(true));
        assert!(deep.system_instruction.contains("Deep research is on"));
        assert!(deep.prompt.contains("\"useDeepResearch\": true"));
        assert!(deep.prompt.contains("Deep research enabled: true"));
    }

    #[test]
    fn test_topic_is_json_escaped() {
        let instructions = compose(&options(r#"the "quoted" \ topic"#));
        assert!(instructions
            .prompt
            .contains(r#""query": "the \"quoted\" \\ topic","#));
    }

    #[test]
    fn test_prompt_forbids_fences_and_trailing_periods() {
        let prompt = compose(&options("tides")).prompt;
        assert!(prompt.contains("Return ONLY valid JSON"));
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("\"],.\" is invalid"));
    }
}
