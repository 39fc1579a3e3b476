//! Exercise 2: the prompt templates
//!
//! Formats each of the four prompts with sample inputs and shows how the
//! research topic is pulled out of a conversation.
//!
//! ```bash
//! cargo run --bin exercise_02_prompts
//! ```

use anyhow::Result;
use tracing::Level;

use deep_research_agent::display::{banner, rule};
use deep_research_agent::prompts::{self, current_date};
use deep_research_agent::utils::{research_topic, truncate};
use deep_research_agent::Message;

fn show(prompt: &str, preview_chars: usize) {
    println!("{}", rule('-', 60));
    println!("{}", truncate(prompt, preview_chars));
    println!("{}", rule('-', 60));
}

fn query_prompt() -> Result<String> {
    println!("\n{}", banner("🔍 STEP 2: Query generation prompt"));

    let topic = "What are the latest developments in quantum computing?";
    let number_queries = 3;
    let prompt = prompts::query_writer(topic, number_queries, &current_date())?;

    println!("📝 Topic: {}", topic);
    println!("🔢 Number of queries: {}", number_queries);
    println!("\n📋 Formatted prompt:");
    show(&prompt, 500);
    Ok(prompt)
}

fn web_search_prompt() -> Result<String> {
    println!("\n{}", banner("🌐 STEP 3: Web search prompt"));

    let topic = "machine learning applications in healthcare";
    let prompt = prompts::web_searcher(topic, &current_date())?;

    println!("🎯 Research topic: {}", topic);
    println!("\n📋 Search prompt:");
    println!("{}", rule('-', 40));
    println!("{}", prompt);
    println!("{}", rule('-', 40));
    Ok(prompt)
}

fn reflection_prompt() -> Result<String> {
    println!("\n{}", banner("🤔 STEP 4: Reflection prompt"));

    let topic = "artificial intelligence trends";
    let summaries = [
        "AI is rapidly growing in healthcare applications...",
        "Machine learning models are becoming more efficient...",
        "Ethical concerns about AI deployment are increasing...",
    ];
    let prompt = prompts::reflection(topic, &summaries)?;

    println!("🎯 Topic: {}", topic);
    println!("📚 Number of summaries: {}", summaries.len());
    println!("\n📋 Reflection prompt:");
    show(&prompt, 400);
    Ok(prompt)
}

fn topic_extraction() {
    println!("\n{}", banner("💬 STEP 5: Topic extraction"));

    println!("📞 Simple conversation:");
    let simple = vec![Message::human("What is quantum computing?")];
    println!("  Message: {}", simple[0].content);
    println!("  Extracted topic: {}", research_topic(&simple));

    println!("\n📞 Multi-turn conversation:");
    let conversation = vec![
        Message::human("Tell me about AI"),
        Message::ai("AI is a field of computer science..."),
        Message::human("What about machine learning specifically?"),
        Message::ai("Machine learning is a subset of AI..."),
        Message::human("Can you give examples of ML in healthcare?"),
    ];
    println!("  Number of messages: {}", conversation.len());
    println!("  Extracted topic: {}", truncate(&research_topic(&conversation), 100));
}

fn answer_prompt() -> Result<String> {
    println!("\n{}", banner("✅ STEP 6: Final answer prompt"));

    let topic = "renewable energy trends 2024";
    let summaries = [
        "Solar energy costs have decreased by 15% in 2024...",
        "Wind power installations reached record highs...",
        "Battery storage technology improved significantly...",
    ];
    let prompt = prompts::answer(topic, &summaries, &current_date())?;

    println!("🎯 Topic: {}", topic);
    println!("📚 Summaries: {} results", summaries.len());
    println!("\n📋 Answer prompt:");
    show(&prompt, 300);
    Ok(prompt)
}

fn main() -> Result<()> {
    deep_research_agent::logging::init_logging_with_level(Level::WARN)?;

    println!("🎓 PRACTICE EXERCISES - PROMPTS AND GENERATIVE AI");
    println!("{}", rule('=', 60));

    println!("{}", banner("📅 STEP 1: Current date"));
    let date = current_date();
    println!("📆 Formatted date: {}", date);

    let queries = query_prompt()?;
    let search = web_search_prompt()?;
    let reflection = reflection_prompt()?;
    topic_extraction();
    let answer = answer_prompt()?;

    println!("\n📋 SUMMARY:");
    println!("✅ Current date: {}", date);
    println!("✅ Query prompt formatted ({} chars)", queries.chars().count());
    println!("✅ Search prompt formatted ({} chars)", search.chars().count());
    println!("✅ Reflection prompt formatted ({} chars)", reflection.chars().count());
    println!("✅ Topics extracted: simple and multi-turn");
    println!("✅ Answer prompt formatted ({} chars)", answer.chars().count());

    println!("\n🚀 NEXT STEP:");
    println!("Run: cargo run --bin exercise_03_graph_state");

    println!("\n💡 TIP:");
    println!("Look at how each prompt is structured and formatted.");
    println!("Try adapting the prompts to other domains!");

    Ok(())
}
