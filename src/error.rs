//! # Error Module
//!
//! Library-level error types. Binaries wrap these in `anyhow::Error` and add
//! context; the library keeps them typed so callers can match on them.

use thiserror::Error;

use crate::prompts::PromptError;
use crate::search::SearchError;

/// Top-level error for the research library.
///
/// # Rust Concept: `#[from]`
///
/// `#[from]` generates a `From` impl, which is what lets the `?` operator
/// convert a `PromptError` or `SearchError` into a `ResearchError`.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} is not set")]
    MissingApiKey(&'static str),

    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Could not parse {what} from model response: {reason}")]
    Parse { what: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Shorthand used across the library.
pub type Result<T> = std::result::Result<T, ResearchError>;
