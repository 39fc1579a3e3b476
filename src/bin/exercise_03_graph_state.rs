//! Exercise 3: the graph and its state
//!
//! Inspects the research graph, prepares a run configuration and initial
//! state, shows what each node hands to the next, and walks through a run
//! without calling any model.
//!
//! ```bash
//! cargo run --bin exercise_03_graph_state
//! ```

use std::sync::Arc;

use anyhow::Result;
use tracing::Level;

use deep_research_agent::config::api_key_help;
use deep_research_agent::display::{banner, rule};
use deep_research_agent::mock::{ScriptedModel, StaticSearch};
use deep_research_agent::state::{QueryPlan, Reflection, WebSearchTask};
use deep_research_agent::{ApiKey, Configuration, ResearchGraph, ResearchState};

fn graph_structure(graph: &ResearchGraph) {
    println!("{}", banner("🏗️ STEP 1: Graph structure"));

    println!("📊 Graph information:");
    println!("  - Name: {}", graph.name());
    println!("  - Nodes: {:?}", graph.nodes());

    println!("\n🔄 Execution flow:");
    for edge in graph.flow_diagram().lines() {
        println!("  {}", edge);
    }
}

fn runnable_configs() -> (Configuration, Configuration) {
    println!("\n{}", banner("⚙️ STEP 2: Runnable configuration"));

    let default = Configuration::default();
    println!("🔧 Default configuration:");
    println!("  - Query model: {}", default.query_generator_model);
    println!("  - Reflection model: {}", default.reflection_model);
    println!("  - Answer model: {}", default.answer_model);
    println!("  - Initial queries: {}", default.number_of_initial_queries);
    println!("  - Max loops: {}", default.max_research_loops);

    let test = Configuration::default()
        .with_initial_queries(2)
        .with_max_research_loops(1)
        .with_query_generator_model("gemini-2.0-flash");
    println!("\n🧪 Test configuration:");
    println!("  - Initial queries: {}", test.number_of_initial_queries);
    println!("  - Max loops: {}", test.max_research_loops);
    println!("  - Query model: {}", test.query_generator_model);

    (default, test)
}

fn initial_state() -> Result<ResearchState> {
    println!("\n{}", banner("📊 STEP 3: Initial state"));

    let question = "What are the benefits of renewable energy?";
    let state = ResearchState::from_question(question)
        .with_initial_search_query_count(2)
        .with_max_research_loops(1)
        .with_reasoning_model("gemini-2.5-flash");

    println!("❓ Question: {}", question);
    println!("🔍 Initial queries: 2");
    println!("🔄 Max loops: 1");
    println!("🤖 Model: gemini-2.5-flash");

    println!("\n📋 State structure:");
    let value = serde_json::to_value(&state)?;
    if let Some(fields) = value.as_object() {
        for (key, value) in fields {
            match value.as_array() {
                Some(items) if key == "messages" => println!("  - {}: {} message(s)", key, items.len()),
                Some(items) => println!("  - {}: list ({} items)", key, items.len()),
                None => println!("  - {}: {}", key, value),
            }
        }
    }
    println!("  (empty lists and zero counters are omitted until a node fills them)");

    Ok(state)
}

fn intermediate_records() {
    println!("\n{}", banner("🏷️ STEP 4: What the nodes exchange"));

    println!("📁 Records:");
    println!("  1. ResearchState - the global state of a run");
    println!("  2. QueryPlan - output of query generation");
    println!("  3. WebSearchTask - one unit of web research");
    println!("  4. Reflection - the sufficiency verdict");

    let plan = QueryPlan {
        rationale: "Cover the main topic and the specific technologies".to_string(),
        query: vec![
            "renewable energy benefits".to_string(),
            "solar wind power advantages".to_string(),
        ],
    };
    let task = WebSearchTask {
        search_query: "renewable energy benefits".to_string(),
        id: 1,
    };
    let reflection = Reflection {
        is_sufficient: false,
        knowledge_gap: "Missing information about costs".to_string(),
        follow_up_queries: vec!["renewable energy costs 2024".to_string()],
    };

    println!("\n🔍 QueryPlan example:");
    println!("  - Queries: {}", plan.query.len());
    println!("\n🌐 WebSearchTask example:");
    println!("  - Query: {}", task.search_query);
    println!("  - ID: {}", task.id);
    println!("\n🤔 Reflection example:");
    println!("  - Sufficient: {}", reflection.is_sufficient);
    println!("  - Gap: {}", reflection.knowledge_gap);
    println!("  - Follow-ups: {}", reflection.follow_up_queries.len());
}

fn simulated_flow() {
    println!("\n{}", banner("🎭 STEP 5: Simulated flow"));
    println!("🎬 Simulating an agent run:\n");

    println!("1️⃣ GENERATE_QUERY");
    println!("   ├─ Receives: 'What are the benefits of renewable energy?'");
    println!("   ├─ Processes: the query model writes search queries");
    println!("   └─ Returns: ['renewable energy benefits', 'solar wind advantages']\n");

    println!("2️⃣ WEB_RESEARCH (concurrently, one per query)");
    println!("   ├─ Query 1: 'renewable energy benefits'");
    println!("   │   ├─ Runs: grounded Google Search");
    println!("   │   └─ Result: text + citations");
    println!("   ├─ Query 2: 'solar wind advantages'");
    println!("   │   ├─ Runs: grounded Google Search");
    println!("   │   └─ Result: text + citations");
    println!("   └─ Merges: all results\n");

    println!("3️⃣ REFLECTION");
    println!("   ├─ Analyses: the research results");
    println!("   ├─ Decides: is the information sufficient?");
    println!("   ├─ If NO: writes follow-up queries");
    println!("   └─ If YES: moves on to the answer\n");

    println!("4️⃣ FINALIZE_ANSWER");
    println!("   ├─ Synthesises: every result");
    println!("   ├─ Formats: answer with citations");
    println!("   └─ Returns: the final structured answer\n");

    println!("🏁 END: complete answer delivered to the user");
}

fn check_api_key() -> bool {
    println!("\n{}", banner("🔍 STEP 6: API check"));

    match ApiKey::from_env() {
        Ok(key) => {
            println!("✅ API key found!");
            println!("🔐 Prefix: {}", key.preview());
            println!("🚀 You can run the full agent!");
            true
        }
        Err(e) => {
            println!("❌ {}", e);
            println!("💡 To run the real agent:\n{}", api_key_help());
            false
        }
    }
}

fn main() -> Result<()> {
    deep_research_agent::logging::init_logging_with_level(Level::WARN)?;

    println!("🎓 PRACTICE EXERCISES - GRAPH AND STATE");
    println!("{}", rule('=', 55));

    // Inspection only: nothing here calls a model.
    let graph = ResearchGraph::new(
        Configuration::default(),
        Arc::new(ScriptedModel::new()),
        Arc::new(StaticSearch::new()),
    );

    graph_structure(&graph);
    let (default, test) = runnable_configs();
    default.validate()?;
    test.validate()?;
    let _state = initial_state()?;
    intermediate_records();
    simulated_flow();
    let key_ok = check_api_key();

    println!("\n📋 SUMMARY:");
    println!("✅ Graph structure inspected");
    println!("✅ Configurations tested");
    println!("✅ Initial state prepared");
    println!("✅ Intermediate records shown");
    println!("✅ Flow simulated");
    println!(
        "{} API {}",
        if key_ok { "✅" } else { "❌" },
        if key_ok { "available" } else { "unavailable" }
    );

    println!("\n🚀 NEXT STEP:");
    if key_ok {
        println!("Run: cargo run --bin exercise_04_live_run");
    } else {
        println!("Set your API key, then run: cargo run --bin exercise_04_live_run");
    }

    println!("\n💡 IMPORTANT:");
    println!("The graph runs its nodes in a fixed order.");
    println!("Every node reads the shared state and returns an update to it!");

    Ok(())
}
