//! Exercise 1: configuration basics
//!
//! Builds the default and a custom [`Configuration`], sketches an initial
//! research state and checks that a Gemini key is available.
//!
//! ```bash
//! cargo run --bin exercise_01_configuration
//! ```

use anyhow::Result;
use tracing::Level;

use deep_research_agent::config::api_key_help;
use deep_research_agent::display::{banner, rule};
use deep_research_agent::{ApiKey, Configuration, ResearchState};

fn default_and_custom_config() -> (Configuration, Configuration) {
    println!("{}", banner("🔧 STEP 1: Basic configuration"));

    let default = Configuration::default();
    println!("📊 Default configuration:");
    println!("  - Query model: {}", default.query_generator_model);
    println!("  - Reflection model: {}", default.reflection_model);
    println!("  - Answer model: {}", default.answer_model);
    println!("  - Initial queries: {}", default.number_of_initial_queries);
    println!("  - Max loops: {}", default.max_research_loops);

    println!("\n🎛️ Custom configuration:");
    let custom = Configuration::default()
        .with_initial_queries(5)
        .with_max_research_loops(3)
        .with_query_generator_model("gemini-2.5-flash");
    println!("  - Initial queries: {}", custom.number_of_initial_queries);
    println!("  - Max loops: {}", custom.max_research_loops);
    println!("  - Query model: {}", custom.query_generator_model);

    (default, custom)
}

fn initial_state() -> ResearchState {
    println!("\n{}", banner("📊 STEP 2: Agent state"));

    let state = ResearchState::from_question("What is artificial intelligence?")
        .with_initial_search_query_count(3)
        .with_max_research_loops(2)
        .with_reasoning_model("gemini-2.5-pro");

    if let Some(question) = state.messages.first() {
        println!("💬 Initial message: {}", question.content);
    }
    if let Some(count) = state.initial_search_query_count {
        println!("🔍 Initial queries: {}", count);
    }
    if let Some(loops) = state.max_research_loops {
        println!("🔄 Max loops: {}", loops);
    }
    if let Some(model) = &state.reasoning_model {
        println!("🤖 Reasoning model: {}", model);
    }

    state
}

fn check_api_key() -> bool {
    println!("\n{}", banner("🔑 STEP 3: API key check"));

    match ApiKey::from_env() {
        Ok(key) => {
            println!("✅ API key found!");
            println!("🔐 First characters: {}", key.preview());
            true
        }
        Err(e) => {
            println!("❌ {}", e);
            println!("💡 To configure:\n{}", api_key_help());
            false
        }
    }
}

fn main() -> Result<()> {
    deep_research_agent::logging::init_logging_with_level(Level::WARN)?;

    println!("🎓 PRACTICE EXERCISES - CONFIGURATION AND STATE");
    println!("{}", rule('=', 60));

    let (default, custom) = default_and_custom_config();
    default.validate()?;
    custom.validate()?;
    let _state = initial_state();
    let key_ok = check_api_key();

    println!("\n📋 SUMMARY:");
    println!("✅ Default configuration created");
    println!("✅ Custom configuration created");
    println!("✅ Initial state simulated");
    println!(
        "{} API key {}",
        if key_ok { "✅" } else { "❌" },
        if key_ok { "valid" } else { "missing" }
    );

    println!("\n🚀 NEXT STEP:");
    if key_ok {
        println!("Run: cargo run --bin exercise_02_prompts");
    } else {
        println!("Set your GEMINI_API_KEY first!");
    }

    Ok(())
}
