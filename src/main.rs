//! # Deep Research
//!
//! Streams a research run to the terminal: node progress as each step
//! finishes, the answer token by token, then the final answer.
//!
//! ## Quick Start
//! ```bash
//! cargo run --bin deep-research -- "What are the latest developments in Rust?"
//! ```

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tracing::{error, info};

use deep_research_agent::config::api_key_help;
use deep_research_agent::display::{rule, RULE_WIDTH};
use deep_research_agent::{
    save_result, ApiKey, Configuration, ResearchGraph, ResearchState, StreamMode, StreamPrinter,
};

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
#[derive(Parser, Debug)]
#[command(
    name = "deep-research",
    version,
    about = "Run the research agent with streaming output",
    long_about = r#"
Deep Research - a Gemini research agent with live progress.

The agent will:
  1. Generate web search queries for your question
  2. Run grounded Google searches and collect citations
  3. Reflect on the results and search again if needed
  4. Stream a final answer with links to its sources

PREREQUISITES:
  Set GEMINI_API_KEY in the environment or in a .env file.

EXAMPLES:
  deep-research "How do solid-state batteries work?"
  deep-research --initial-queries 1 --max-loops 1 "What is Rust?"
  deep-research --output result.json "Latest fusion energy milestones"
"#
)]
struct Args {
    /// Research question
    #[arg(value_name = "QUESTION")]
    question: String,

    /// Number of initial search queries
    #[arg(long = "initial-queries", default_value_t = 3, value_parser = positive_count)]
    initial_queries: usize,

    /// Maximum number of research loops
    #[arg(long = "max-loops", default_value_t = 2, value_parser = positive_count)]
    max_loops: usize,

    /// Model for the final answer
    #[arg(long = "reasoning-model", default_value = "gemini-2.5-pro")]
    reasoning_model: String,

    /// Save the final state as JSON
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", default_value = "false")]
    verbose: bool,
}

/// Counts of queries and loops must be at least 1.
fn positive_count(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Args {
    fn initial_state(&self) -> ResearchState {
        ResearchState::from_question(&self.question)
            .with_initial_search_query_count(self.initial_queries)
            .with_max_research_loops(self.max_loops)
            .with_reasoning_model(&self.reasoning_model)
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    deep_research_agent::logging::init_logging(args.verbose)?;

    let api_key = match ApiKey::from_env() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 To configure:\n{}", api_key_help());
            return Err(e.into());
        }
    };

    let config = Configuration::from_env()?;
    config.validate()?;
    info!(?config, key = %api_key.preview(), "Configuration loaded");

    let graph = ResearchGraph::gemini(config, api_key);

    if let Err(e) = run(&graph, &args).await {
        error!(error = %e, "Research failed");
        eprintln!("\n❌ Research failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

async fn run(graph: &ResearchGraph, args: &Args) -> Result<()> {
    let input = args.initial_state();

    println!("🔍 Starting research: {}", args.question);
    println!("{}", rule('=', RULE_WIDTH));

    let mut final_state = input.clone();
    let mut printer = StreamPrinter::new(io::stdout());
    let mut events = graph.stream(input, &StreamMode::ALL);

    while let Some(event) = events.next().await {
        let event = event?;
        printer.handle(&event)?;
        if let deep_research_agent::StreamEvent::Updates { update, .. } = event {
            final_state.apply(update);
        }
    }
    printer.finish()?;

    if let Some(path) = &args.output {
        save_result(path, &final_state)
            .with_context(|| format!("Failed to save result to {}", path.display()))?;
        println!("\n💾 Result saved to: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["deep-research", "What is Rust?"]);
        assert_eq!(args.question, "What is Rust?");
        assert_eq!(args.initial_queries, 3);
        assert_eq!(args.max_loops, 2);
        assert_eq!(args.reasoning_model, "gemini-2.5-pro");
        assert!(args.output.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_with_flags() {
        let args = Args::parse_from([
            "deep-research",
            "--initial-queries",
            "1",
            "--max-loops",
            "3",
            "--reasoning-model",
            "gemini-2.5-flash",
            "--output",
            "out.json",
            "--verbose",
            "Test question",
        ]);

        assert_eq!(args.question, "Test question");
        assert_eq!(args.initial_queries, 1);
        assert_eq!(args.max_loops, 3);
        assert_eq!(args.reasoning_model, "gemini-2.5-flash");
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
        assert!(args.verbose);
    }

    #[test]
    fn test_initial_state_from_args() {
        let args = Args::parse_from(["deep-research", "--max-loops", "1", "Why?"]);
        let state = args.initial_state();

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, "Why?");
        assert_eq!(state.initial_search_query_count, Some(3));
        assert_eq!(state.max_research_loops, Some(1));
        assert_eq!(state.reasoning_model.as_deref(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn test_zero_counts_are_rejected() {
        assert!(Args::try_parse_from(["deep-research", "--max-loops", "0", "Why?"]).is_err());
        assert!(Args::try_parse_from(["deep-research", "--initial-queries", "0", "Why?"]).is_err());
        assert!(Args::try_parse_from(["deep-research", "--max-loops", "many", "Why?"]).is_err());
    }

    #[test]
    fn test_missing_question_is_rejected() {
        assert!(Args::try_parse_from(["deep-research"]).is_err());
    }
}
