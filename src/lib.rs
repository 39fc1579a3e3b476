//! deep-research-agent: a Gemini-powered research loop
//!
//! Given a question, the agent:
//! - writes a handful of web search queries
//! - runs them as grounded Google searches, concurrently, with citations
//! - reflects on what it found and searches again if there are gaps
//! - writes a final answer that links the sources it used
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use deep_research_agent::{ApiKey, Configuration, ResearchGraph, ResearchState};
//!
//! # async fn run() -> Result<(), deep_research_agent::ResearchError> {
//! let graph = ResearchGraph::gemini(Configuration::from_env()?, ApiKey::from_env()?);
//! let state = ResearchState::from_question("What is artificial intelligence?")
//!     .with_initial_search_query_count(2);
//!
//! let result = graph.invoke(state).await?;
//! println!("{}", result.final_answer().unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! The model and search provider sit behind the [`LanguageModel`] and
//! [`SearchProvider`] traits; [`mock`] has scripted versions of both for
//! running the graph offline.

pub mod config;
pub mod display;
pub mod error;
pub mod graph;
pub mod llm;
pub mod logging;
pub mod mock;
pub mod prompts;
pub mod report;
pub mod search;
pub mod state;
pub mod utils;

// Re-exports for convenience
pub use config::{ApiKey, Configuration};
pub use display::StreamPrinter;
pub use error::{ResearchError, Result};
pub use graph::{ResearchGraph, StreamEvent, StreamMode};
pub use llm::{CompletionRequest, LanguageModel, RigGemini};
pub use prompts::{PromptBuilder, PromptError, PromptTemplate};
pub use report::{load_result, save_result, ResultAnalysis, RunSummary};
pub use search::{GoogleSearchGrounding, GroundedResponse, SearchError, SearchProvider};
pub use state::{Message, MessageKind, ResearchState, Source, StateUpdate};
