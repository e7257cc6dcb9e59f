//! Core data models for research options and responses.

mod options;
mod response;

pub use options::{
    ComplexityLevel, Language, OptionError, OptionValue, ResearchOptions, ResponseFormat,
    SearchFocus, SearchFocusSet,
};
pub use response::{CardType, ModalContent, ResearchCard, ResearchResponse};

#[cfg(test)]
pub(crate) use response::fixtures;
