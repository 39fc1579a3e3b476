//! Exercise 4: running the agent for real
//!
//! Requires `GEMINI_API_KEY`. Runs a quick research question, then offers a
//! slower detailed run and a comparison of two configurations. Results are
//! written to `result_simple.json` and `result_detailed.json`.
//!
//! ```bash
//! cargo run --bin exercise_04_live_run
//! ```

use std::io::{self, BufRead, Write};
use std::time::Instant;

use anyhow::Result;
use tracing::{error, Level};

use deep_research_agent::config::api_key_help;
use deep_research_agent::display::{banner, rule};
use deep_research_agent::utils::truncate;
use deep_research_agent::{
    save_result, ApiKey, Configuration, ResearchGraph, ResearchState, ResultAnalysis, RunSummary,
};

fn check_prerequisites() -> Option<ApiKey> {
    println!("🔍 CHECKING PREREQUISITES");
    println!("{}", rule('=', 40));

    let key = match ApiKey::from_env() {
        Ok(key) => key,
        Err(e) => {
            println!("❌ {}", e);
            println!("💡 To configure:\n{}", api_key_help());
            return None;
        }
    };
    println!("✅ API key found: {}", key.preview());

    match Configuration::from_env().and_then(|c| c.validate()) {
        Ok(()) => {
            println!("✅ Gemini client configured");
            Some(key)
        }
        Err(e) => {
            println!("❌ Invalid configuration: {}", e);
            None
        }
    }
}

async fn simple_run(graph: &ResearchGraph) -> Option<ResearchState> {
    println!("\n{}", banner("🚀 RUN 1: Simple"));

    let question = "What is artificial intelligence?";
    println!("❓ Question: {}", question);
    println!("⏳ Running the agent...");

    let state = ResearchState::from_question(question)
        .with_initial_search_query_count(2)
        .with_max_research_loops(1)
        .with_reasoning_model("gemini-2.0-flash");

    let start = Instant::now();
    let result = match graph.invoke(state).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Simple run failed");
            println!("❌ Run failed: {}", e);
            println!("💡 Check that your API key is valid");
            return None;
        }
    };

    println!("✅ Finished in {:.2}s", start.elapsed().as_secs_f64());
    println!("📊 Result analysis:");
    if let Some(last) = result.messages.last() {
        println!("  - Response type: {}", last.kind.as_str());
        println!("  - Response length: {} chars", last.content.chars().count());
        println!("  - Response start: {}", truncate(&last.content, 100));
    }
    println!("  - Queries generated: {}", result.search_query.len());
    println!("  - Queries: {:?}", result.search_query);
    println!("  - Sources gathered: {}", result.sources_gathered.len());
    println!("  - Loops executed: {}", result.research_loop_count);

    Some(result)
}

async fn detailed_run(graph: &ResearchGraph) -> Option<ResearchState> {
    println!("\n{}", banner("🔬 RUN 2: Detailed"));

    let question = "What are the latest developments in renewable energy in 2024?";
    println!("❓ Question: {}", question);

    let state = ResearchState::from_question(question)
        .with_initial_search_query_count(3)
        .with_max_research_loops(2)
        .with_reasoning_model("gemini-2.5-pro");

    println!("⚙️ Configuration:");
    println!("  - Initial queries: 3");
    println!("  - Max loops: 2");
    println!("  - Model: gemini-2.5-pro");
    println!("⏳ Running (this can take a few minutes)...");

    let start = Instant::now();
    match graph.invoke(state).await {
        Ok(result) => {
            println!("✅ Finished in {:.2}s", start.elapsed().as_secs_f64());
            println!("\n{}", banner("📊 DETAILED RESULT ANALYSIS"));
            print!("{}", ResultAnalysis::from_state(&result).render());
            Some(result)
        }
        Err(e) => {
            error!(error = %e, "Detailed run failed");
            println!("❌ Run failed: {}", e);
            None
        }
    }
}

async fn compare_configurations(graph: &ResearchGraph) {
    println!("\n{}", banner("⚖️ RUN 3: Comparing configurations"));

    let question = "What is machine learning?";
    let setups = [("Fast", 1, 1, "gemini-2.0-flash"), ("Default", 3, 2, "gemini-2.5-flash")];

    let mut summaries = Vec::new();
    for (name, queries, loops, model) in setups {
        println!("\n🧪 Testing configuration: {}", name);

        let state = ResearchState::from_question(question)
            .with_initial_search_query_count(queries)
            .with_max_research_loops(loops)
            .with_reasoning_model(model);

        let start = Instant::now();
        match graph.invoke(state).await {
            Ok(result) => {
                let summary = RunSummary::new(name, start.elapsed(), &result);
                println!("  ✅ Time: {:.2}s", summary.elapsed.as_secs_f64());
                println!("  📊 Queries: {}", summary.queries);
                println!("  📚 Sources: {}", summary.sources);
                println!("  🔄 Loops: {}", summary.loops);
                println!("  📝 Answer: {} chars", summary.answer_chars);
                summaries.push(summary);
            }
            Err(e) => println!("  ❌ Error: {}", e),
        }
    }

    if summaries.len() > 1 {
        println!("\n📊 FINAL COMPARISON:");
        println!("{}", rule('=', 30));
        for summary in &summaries {
            println!("{}", summary.one_line());
        }
    }
}

fn save(state: &ResearchState, file: &str) {
    match save_result(file, state) {
        Ok(()) => println!("\n💾 Result saved to: {}", file),
        Err(e) => println!("\n❌ Could not save {}: {}", file, e),
    }
}

/// Ask a yes/no question on stdin; anything but `y` means no.
fn confirm(question: &str) -> Result<bool> {
    print!("\n🤔 {} [y/N]: ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

#[tokio::main]
async fn main() -> Result<()> {
    deep_research_agent::logging::init_logging_with_level(Level::WARN)?;

    println!("🎓 PRACTICE EXERCISES - RUNNING THE AGENT");
    println!("{}", rule('=', 60));

    let Some(api_key) = check_prerequisites() else {
        println!("\n❌ Prerequisites not met!");
        println!("Configure the API key and try again.");
        std::process::exit(1);
    };

    let graph = ResearchGraph::gemini(Configuration::from_env()?, api_key);

    println!("\n🚀 Starting the runs...");
    println!("\n{}", rule('=', 60));
    if let Some(result) = simple_run(&graph).await {
        save(&result, "result_simple.json");
    }

    if confirm("Run the detailed research (slower)?")? {
        if let Some(result) = detailed_run(&graph).await {
            save(&result, "result_detailed.json");
        }
    }

    if confirm("Compare configurations?")? {
        compare_configurations(&graph).await;
    }

    println!("\n🎉 EXERCISES COMPLETE!");
    println!("💡 NEXT STEPS:");
    println!("  1. Look through the generated JSON files");
    println!("  2. Run: cargo run --bin exercise_05_customization");

    Ok(())
}
