//! Research prompt templates
//!
//! The four templates the graph formats, one per LLM-backed node:
//! - Query writer: turns the research topic into search queries
//! - Web searcher: drives a single grounded search
//! - Reflection: decides whether the gathered summaries are enough
//! - Answer: writes the final cited answer
//!
//! Templates use `{name}` placeholders and `{{` / `}}` for literal braces,
//! the same convention as `format!`, so the JSON examples inside them stay
//! readable.

use std::collections::HashMap;

use chrono::Local;
use thiserror::Error;

/// Separator between summaries in the reflection prompt.
pub const REFLECTION_SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

/// Separator between summaries in the answer prompt.
pub const ANSWER_SUMMARY_SEPARATOR: &str = "\n---\n\n";

pub const QUERY_WRITER_INSTRUCTIONS: &str = r#"Your goal is to generate sophisticated and diverse web search queries. These queries are intended for an advanced automated web research tool capable of analyzing complex results, following links, and synthesizing information.

Instructions:
- Always prefer a single search query, only add another query if the original question requests multiple aspects or elements and one query is not enough.
- Each query should focus on one specific aspect of the original question.
- Don't produce more than {number_queries} queries.
- Queries should be diverse, if the topic is broad, generate more than 1 query.
- Don't generate multiple similar queries, 1 is enough.
- Query should ensure that the most current information is gathered. The current date is {current_date}.

Format:
- Format your response as a JSON object with ALL two of these exact keys:
   - "rationale": Brief explanation of why these queries are relevant
   - "query": A list of search queries

Example:

Topic: What revenue grew more last year apple stock or the number of people buying an iphone
```json
{{
    "rationale": "To answer this comparative growth question accurately, we need specific data points on Apple's stock performance and iPhone sales metrics. These queries target the precise financial information needed.",
    "query": ["Apple total revenue growth fiscal year 2024", "iPhone unit sales growth fiscal year 2024", "Apple stock price growth fiscal year 2024"]
}}
```

Context: {research_topic}"#;

pub const WEB_SEARCHER_INSTRUCTIONS: &str = r#"Conduct targeted Google Searches to gather the most recent, credible information on "{research_topic}" and synthesize it into a verifiable text artifact.

Instructions:
- Query should ensure that the most current information is gathered. The current date is {current_date}.
- Conduct multiple, diverse searches to gather comprehensive information.
- Consolidate key findings while meticulously tracking the source(s) for each specific piece of information.
- The output should be a well-written summary or report based on your search findings.
- Only include the information found in the search results, don't make up any information.

Research Topic:
{research_topic}
"#;

pub const REFLECTION_INSTRUCTIONS: &str = r#"You are an expert research assistant analyzing summaries about "{research_topic}".

Instructions:
- Identify knowledge gaps or areas that need deeper exploration and generate a follow-up query (1 or multiple).
- If provided summaries are sufficient to answer the user's question, don't generate a follow-up query.
- If there is a knowledge gap, generate a follow-up query that would help expand your understanding.
- Focus on technical details, implementation specifics, or emerging trends that weren't fully covered.

Requirements:
- Ensure the follow-up query is self-contained and includes necessary context for web search.

Output Format:
- Format your response as a JSON object with these exact keys:
   - "is_sufficient": true or false
   - "knowledge_gap": Describe what information is missing or needs clarification
   - "follow_up_queries": Write a specific question to address this gap

Example:
```json
{{
    "is_sufficient": true, // or false
    "knowledge_gap": "The summary lacks information about performance metrics and benchmarks", // "" if is_sufficient is true
    "follow_up_queries": ["What are typical performance benchmarks and metrics used to evaluate [specific technology]?"] // [] if is_sufficient is true
}}
```

Reflect carefully on the Summaries to identify knowledge gaps and produce a follow-up query. Then, produce your output following this JSON format:

Summaries:
{summaries}
"#;

pub const ANSWER_INSTRUCTIONS: &str = r#"Generate a high-quality answer to the user's question based on the provided summaries.

Instructions:
- The current date is {current_date}.
- You are the final step of a multi-step research process, don't mention that you are the final step.
- You have access to all the information gathered from the previous steps.
- You have access to the user's question.
- Generate a high-quality answer to the user's question based on the provided summaries and the user's question.
- Include the sources you used from the Summaries in the answer correctly, use markdown format (e.g. [apnews](https://vertexaisearch.cloud.google.com/id/1-0)). THIS IS A MUST.

User Context:
- {research_topic}

Summaries:
{summaries}"#;

// =============================================================================
// TEMPLATE ENGINE
// =============================================================================

/// Errors raised while formatting a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("missing value for placeholder {{{0}}}")]
    MissingKey(String),

    #[error("malformed template at byte {position}: {reason}")]
    Malformed { position: usize, reason: &'static str },
}

/// A prompt template with `{name}` placeholders.
///
/// Formatting is a single left-to-right pass: substituted values are copied
/// verbatim and never scanned for placeholders themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Result<Vec<String>, PromptError> {
        let mut names: Vec<String> = Vec::new();
        self.walk(|piece| {
            if let Piece::Placeholder(name) = piece {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            Ok(())
        })?;
        Ok(names)
    }

    /// Substitute every placeholder from `values`.
    ///
    /// Keys that the template doesn't use are ignored; a placeholder without
    /// a value is an error.
    pub fn format(&self, values: &HashMap<&str, String>) -> Result<String, PromptError> {
        let mut out = String::with_capacity(self.template.len());
        self.walk(|piece| {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Placeholder(name) => {
                    let value = values
                        .get(name)
                        .ok_or_else(|| PromptError::MissingKey(name.to_string()))?;
                    out.push_str(value);
                }
            }
            Ok(())
        })?;
        Ok(out)
    }

    fn walk<'t, F>(&'t self, mut visit: F) -> Result<(), PromptError>
    where
        F: FnMut(Piece<'t>) -> Result<(), PromptError>,
    {
        let text = self.template.as_str();
        let bytes = text.as_bytes();
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    visit(Piece::Literal(&text[literal_start..=i]))?;
                    i += 2;
                    literal_start = i;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    visit(Piece::Literal(&text[literal_start..=i]))?;
                    i += 2;
                    literal_start = i;
                }
                b'{' => {
                    visit(Piece::Literal(&text[literal_start..i]))?;
                    let close = text[i + 1..].find('}').ok_or(PromptError::Malformed {
                        position: i,
                        reason: "unclosed '{'",
                    })?;
                    let name = &text[i + 1..i + 1 + close];
                    if name.is_empty() || name.contains('{') {
                        return Err(PromptError::Malformed {
                            position: i,
                            reason: "invalid placeholder name",
                        });
                    }
                    visit(Piece::Placeholder(name))?;
                    i += close + 2;
                    literal_start = i;
                }
                b'}' => {
                    return Err(PromptError::Malformed {
                        position: i,
                        reason: "single '}' encountered",
                    });
                }
                _ => i += 1,
            }
        }

        visit(Piece::Literal(&text[literal_start..]))
    }
}

enum Piece<'t> {
    Literal(&'t str),
    Placeholder(&'t str),
}

/// Fluent helper for filling a template.
///
/// ```
/// use deep_research_agent::prompts::PromptBuilder;
///
/// let prompt = PromptBuilder::new("Hello {name}, today is {date}!")
///     .with("name", "Ada")
///     .with("date", "June 01, 2025")
///     .build()?;
/// assert_eq!(prompt, "Hello Ada, today is June 01, 2025!");
/// # Ok::<(), deep_research_agent::prompts::PromptError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder<'k> {
    template: PromptTemplate,
    values: HashMap<&'k str, String>,
}

impl<'k> PromptBuilder<'k> {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: PromptTemplate::new(template),
            values: HashMap::new(),
        }
    }

    /// Set the value for `{name}`.
    pub fn with(mut self, name: &'k str, value: impl ToString) -> Self {
        self.values.insert(name, value.to_string());
        self
    }

    pub fn build(self) -> Result<String, PromptError> {
        self.template.format(&self.values)
    }
}

// =============================================================================
// FORMATTED PROMPTS
// =============================================================================

/// Today's date as it appears in the prompts, e.g. `June 01, 2025`.
pub fn current_date() -> String {
    Local::now().format("%B %d, %Y").to_string()
}

pub fn query_writer(
    research_topic: &str,
    number_queries: usize,
    current_date: &str,
) -> Result<String, PromptError> {
    PromptBuilder::new(QUERY_WRITER_INSTRUCTIONS)
        .with("current_date", current_date)
        .with("research_topic", research_topic)
        .with("number_queries", number_queries)
        .build()
}

pub fn web_searcher(research_topic: &str, current_date: &str) -> Result<String, PromptError> {
    PromptBuilder::new(WEB_SEARCHER_INSTRUCTIONS)
        .with("current_date", current_date)
        .with("research_topic", research_topic)
        .build()
}

pub fn reflection<S: AsRef<str>>(research_topic: &str, summaries: &[S]) -> Result<String, PromptError> {
    PromptBuilder::new(REFLECTION_INSTRUCTIONS)
        .with("research_topic", research_topic)
        .with("summaries", join(summaries, REFLECTION_SUMMARY_SEPARATOR))
        .build()
}

pub fn answer<S: AsRef<str>>(
    research_topic: &str,
    summaries: &[S],
    current_date: &str,
) -> Result<String, PromptError> {
    PromptBuilder::new(ANSWER_INSTRUCTIONS)
        .with("current_date", current_date)
        .with("research_topic", research_topic)
        .with("summaries", join(summaries, ANSWER_SUMMARY_SEPARATOR))
        .build()
}

fn join<S: AsRef<str>>(parts: &[S], separator: &str) -> String {
    parts
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_builder() {
        let prompt = PromptBuilder::new("Hello {name}, today is {date}!")
            .with("name", "Claude")
            .with("date", "2024-01-01")
            .build()
            .unwrap();

        assert_eq!(prompt, "Hello Claude, today is 2024-01-01!");
    }

    #[test]
    fn test_prompt_builder_multiple_same_placeholder() {
        let prompt = PromptBuilder::new("{x} + {x} = {result}")
            .with("x", 2)
            .with("result", 4)
            .build()
            .unwrap();

        assert_eq!(prompt, "2 + 2 = 4");
    }

    #[test]
    fn test_escaped_braces_become_literal() {
        let prompt = PromptBuilder::new("{{\"query\": [{q}]}}")
            .with("q", "\"rust\"")
            .build()
            .unwrap();
        assert_eq!(prompt, "{\"query\": [\"rust\"]}");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let prompt = PromptBuilder::new("Topic: {research_topic}")
            .with("research_topic", "what does {current_date} mean?")
            .build()
            .unwrap();
        assert_eq!(prompt, "Topic: what does {current_date} mean?");
    }

    #[test]
    fn test_missing_key() {
        let err = PromptBuilder::new("{a} and {b}").with("a", 1).build().unwrap_err();
        assert_eq!(err, PromptError::MissingKey("b".to_string()));
    }

    #[test]
    fn test_malformed_templates() {
        assert!(matches!(
            PromptTemplate::new("oops {name").placeholders(),
            Err(PromptError::Malformed { .. })
        ));
        assert!(matches!(
            PromptTemplate::new("stray } here").placeholders(),
            Err(PromptError::Malformed { .. })
        ));
    }

    #[test]
    fn test_placeholders_of_builtin_templates() {
        let names = PromptTemplate::new(QUERY_WRITER_INSTRUCTIONS).placeholders().unwrap();
        assert_eq!(names, vec!["number_queries", "current_date", "research_topic"]);

        let names = PromptTemplate::new(REFLECTION_INSTRUCTIONS).placeholders().unwrap();
        assert_eq!(names, vec!["research_topic", "summaries"]);

        let names = PromptTemplate::new(ANSWER_INSTRUCTIONS).placeholders().unwrap();
        assert_eq!(names, vec!["current_date", "research_topic", "summaries"]);

        let names = PromptTemplate::new(WEB_SEARCHER_INSTRUCTIONS).placeholders().unwrap();
        assert_eq!(names, vec!["research_topic", "current_date"]);
    }

    #[test]
    fn test_query_writer_prompt() {
        let prompt = query_writer(
            "What are the latest developments in quantum computing?",
            3,
            "June 01, 2025",
        )
        .unwrap();

        assert!(prompt.contains("Don't produce more than 3 queries."));
        assert!(prompt.contains("The current date is June 01, 2025."));
        assert!(prompt.ends_with("Context: What are the latest developments in quantum computing?"));
        assert!(prompt.contains("```json\n{\n"));
    }

    #[test]
    fn test_reflection_prompt_joins_summaries() {
        let prompt = reflection("ai trends", &["first", "second"]).unwrap();
        assert!(prompt.contains("summaries about \"ai trends\""));
        assert!(prompt.contains("first\n\n---\n\nsecond"));
    }

    #[test]
    fn test_answer_prompt_joins_summaries() {
        let prompt = answer("energy", &["solar", "wind"], "May 05, 2025").unwrap();
        assert!(prompt.contains("solar\n---\n\nwind"));
        assert!(prompt.contains("The current date is May 05, 2025."));
        assert!(prompt.contains("- energy"));
    }

    #[test]
    fn test_current_date_shape() {
        let date = current_date();
        assert!(date.contains(", "));
        assert!(date.chars().next().unwrap().is_ascii_uppercase());
    }
}
