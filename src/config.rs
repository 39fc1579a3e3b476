//! # Configuration Module
//!
//! This module handles the agent's named defaults, environment overrides and
//! the Gemini credential. It demonstrates several important Rust patterns:
//! - Structs with named fields and a hand-written `Default`
//! - Consuming builder setters (`with_*`)
//! - Error handling with Result types
//! - Keeping secrets out of `Debug` output

use std::env;
use std::fmt;

use tracing::debug;

use crate::error::{ResearchError, Result};
use crate::state::ResearchState;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Models and loop limits used by the research graph.
///
/// Values stored in a [`ResearchState`] (initial query count, loop limit,
/// reasoning model) win over these when a run starts; see the `effective_*`
/// helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Model that writes the search queries and runs the grounded searches
    pub query_generator_model: String,

    /// Model that judges whether the gathered research is sufficient
    pub reflection_model: String,

    /// Model that writes the final answer
    pub answer_model: String,

    /// How many queries the first round fans out to
    pub number_of_initial_queries: usize,

    /// Upper bound on reflection -> search iterations
    pub max_research_loops: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            query_generator_model: "gemini-2.0-flash".to_string(),
            reflection_model: "gemini-2.5-flash".to_string(),
            answer_model: "gemini-2.5-pro".to_string(),
            number_of_initial_queries: 3,
            max_research_loops: 2,
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Configuration {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if one exists. Each field can then be
    /// overridden by its upper-cased name, e.g. `MAX_RESEARCH_LOOPS=3`.
    ///
    /// # Example
    /// ```no_run
    /// use deep_research_agent::Configuration;
    ///
    /// let config = Configuration::from_env()?;
    /// println!("Answer model: {}", config.answer_model);
    /// # Ok::<(), deep_research_agent::ResearchError>(())
    /// ```
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Configuration::default();

        if let Ok(val) = env::var("QUERY_GENERATOR_MODEL") {
            config.query_generator_model = val;
        }

        if let Ok(val) = env::var("REFLECTION_MODEL") {
            config.reflection_model = val;
        }

        if let Ok(val) = env::var("ANSWER_MODEL") {
            config.answer_model = val;
        }

        if let Ok(val) = env::var("NUMBER_OF_INITIAL_QUERIES") {
            config.number_of_initial_queries = parse_count("NUMBER_OF_INITIAL_QUERIES", &val)?;
        }

        if let Ok(val) = env::var("MAX_RESEARCH_LOOPS") {
            config.max_research_loops = parse_count("MAX_RESEARCH_LOOPS", &val)?;
        }

        debug!(?config, "Configuration loaded from environment");
        Ok(config)
    }

    /// Quick answers: one query, one loop, flash models everywhere but the answer.
    pub fn fast() -> Self {
        Self::default()
            .with_query_generator_model("gemini-2.0-flash")
            .with_reflection_model("gemini-2.0-flash")
            .with_answer_model("gemini-2.5-flash")
            .with_initial_queries(1)
            .with_max_research_loops(1)
    }

    /// The middle ground between [`Configuration::fast`] and [`Configuration::thorough`].
    pub fn balanced() -> Self {
        Self::default()
            .with_query_generator_model("gemini-2.0-flash")
            .with_reflection_model("gemini-2.5-flash")
            .with_answer_model("gemini-2.5-pro")
            .with_initial_queries(3)
            .with_max_research_loops(2)
    }

    /// Wide first round, more loops and pro models for judging and answering.
    pub fn thorough() -> Self {
        Self::default()
            .with_query_generator_model("gemini-2.5-flash")
            .with_reflection_model("gemini-2.5-pro")
            .with_answer_model("gemini-2.5-pro")
            .with_initial_queries(5)
            .with_max_research_loops(3)
    }

    pub fn with_query_generator_model(mut self, model: impl Into<String>) -> Self {
        self.query_generator_model = model.into();
        self
    }

    pub fn with_reflection_model(mut self, model: impl Into<String>) -> Self {
        self.reflection_model = model.into();
        self
    }

    pub fn with_answer_model(mut self, model: impl Into<String>) -> Self {
        self.answer_model = model.into();
        self
    }

    pub fn with_initial_queries(mut self, count: usize) -> Self {
        self.number_of_initial_queries = count;
        self
    }

    pub fn with_max_research_loops(mut self, loops: usize) -> Self {
        self.max_research_loops = loops;
        self
    }

    /// Validate the configuration.
    ///
    /// It's better to fail fast with a clear error than halfway through a
    /// research run.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("query_generator_model", &self.query_generator_model),
            ("reflection_model", &self.reflection_model),
            ("answer_model", &self.answer_model),
        ] {
            if value.trim().is_empty() {
                return Err(ResearchError::Config(format!("{} cannot be empty", name)));
            }
        }

        if self.number_of_initial_queries == 0 {
            return Err(ResearchError::Config(
                "number_of_initial_queries must be at least 1".to_string(),
            ));
        }

        if self.max_research_loops == 0 {
            return Err(ResearchError::Config(
                "max_research_loops must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Initial fan-out for a run: the state's value if set, else ours.
    pub fn effective_initial_queries(&self, state: &ResearchState) -> usize {
        state
            .initial_search_query_count
            .unwrap_or(self.number_of_initial_queries)
    }

    /// Loop limit for a run: the state's value if set, else ours.
    pub fn effective_max_loops(&self, state: &ResearchState) -> usize {
        state.max_research_loops.unwrap_or(self.max_research_loops)
    }

    /// Answer model for a run: the state's `reasoning_model` if set, else ours.
    pub fn effective_answer_model<'a>(&'a self, state: &'a ResearchState) -> &'a str {
        state
            .reasoning_model
            .as_deref()
            .unwrap_or(&self.answer_model)
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        ResearchError::Config(format!(
            "{} must be a valid positive integer, got: {:?}",
            name, value
        ))
    })
}

// =============================================================================
// API KEY
// =============================================================================
/// The Gemini API key.
///
/// # Rust Concept: Custom Debug
///
/// We implement `Debug` by hand so the key never ends up in logs; only
/// [`ApiKey::preview`] shows any of it.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Number of leading characters shown by [`ApiKey::preview`].
    pub const PREVIEW_CHARS: usize = 10;

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read `GEMINI_API_KEY` (after loading `.env` if present).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        match env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self(key)),
            _ => Err(ResearchError::MissingApiKey(API_KEY_ENV)),
        }
    }

    /// The first few characters followed by `...`, safe to print.
    pub fn preview(&self) -> String {
        let shown: String = self.0.chars().take(Self::PREVIEW_CHARS).collect();
        format!("{}...", shown)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.preview())
    }
}

/// Setup instructions printed whenever the key is missing.
pub fn api_key_help() -> String {
    format!(
        "   1. Get a key at: https://ai.google.dev/\n   \
         2. Create a .env file next to where you run the binary\n   \
         3. Add: {}=your_key_here",
        API_KEY_ENV
    )
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Configuration::default();

        assert_eq!(config.query_generator_model, "gemini-2.0-flash");
        assert_eq!(config.reflection_model, "gemini-2.5-flash");
        assert_eq!(config.answer_model, "gemini-2.5-pro");
        assert_eq!(config.number_of_initial_queries, 3);
        assert_eq!(config.max_research_loops, 2);
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Configuration::default().validate().is_ok());
        assert!(Configuration::fast().validate().is_ok());
        assert!(Configuration::thorough().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_queries() {
        let config = Configuration::default().with_initial_queries(0);
        assert!(matches!(config.validate(), Err(ResearchError::Config(_))));
    }

    #[test]
    fn test_config_validation_empty_model() {
        let config = Configuration::default().with_answer_model("  ");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("answer_model"));
    }

    #[test]
    fn test_custom_config() {
        let config = Configuration::default()
            .with_initial_queries(5)
            .with_max_research_loops(3)
            .with_query_generator_model("gemini-2.5-flash");

        assert_eq!(config.number_of_initial_queries, 5);
        assert_eq!(config.max_research_loops, 3);
        assert_eq!(config.query_generator_model, "gemini-2.5-flash");
        assert_eq!(config.answer_model, "gemini-2.5-pro");
    }

    #[test]
    fn test_presets_scale() {
        let fast = Configuration::fast();
        let thorough = Configuration::thorough();
        assert!(fast.number_of_initial_queries < thorough.number_of_initial_queries);
        assert!(fast.max_research_loops < thorough.max_research_loops);
        assert_eq!(Configuration::balanced(), Configuration::default());
    }

    #[test]
    fn test_state_values_win() {
        let config = Configuration::default();
        let state = ResearchState::from_question("q")
            .with_initial_search_query_count(7)
            .with_reasoning_model("gemini-2.0-flash");

        assert_eq!(config.effective_initial_queries(&state), 7);
        assert_eq!(config.effective_max_loops(&state), 2);
        assert_eq!(config.effective_answer_model(&state), "gemini-2.0-flash");
    }

    #[test]
    fn test_parse_count_rejects_garbage() {
        assert_eq!(parse_count("X", " 4 ").unwrap(), 4);
        assert!(parse_count("X", "four").is_err());
        assert!(parse_count("X", "-1").is_err());
    }

    #[test]
    fn test_api_key_preview_hides_the_rest() {
        let key = ApiKey::new("AIzaSyABCDEFGHIJKLMNOP");
        assert_eq!(key.preview(), "AIzaSyABCD...");
        assert!(!format!("{:?}", key).contains("KLMNOP"));
    }

    #[test]
    fn test_api_key_preview_short_key() {
        assert_eq!(ApiKey::new("abc").preview(), "abc...");
    }
}
