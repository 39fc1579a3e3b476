//! Scripted test doubles.
//!
//! Both doubles are deterministic and record what they were asked, so tests
//! (and the offline tutorial run) can drive the whole graph without network
//! access.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{ResearchError, Result};
use crate::llm::{CompletionRequest, LanguageModel, TokenStream};
use crate::search::{
    GroundedResponse, GroundingChunk, GroundingSupport, SearchError, SearchProvider, SearchRequest,
};
use crate::utils::SHORT_URL_PREFIX;

/// Text that only the query writer prompt contains.
pub const QUERY_PROMPT_MARKER: &str = "generate sophisticated and diverse web search queries";
/// Text that only the reflection prompt contains.
pub const REFLECTION_PROMPT_MARKER: &str = "analyzing summaries about";
/// Text that only the answer prompt contains.
pub const ANSWER_PROMPT_MARKER: &str = "Generate a high-quality answer";

// =============================================================================
// SCRIPTED MODEL
// =============================================================================

struct Script {
    marker: String,
    responses: VecDeque<String>,
}

/// A [`LanguageModel`] that answers from a script.
///
/// Each response is registered under a marker; a prompt containing the marker
/// gets the next queued response. The last response for a marker repeats once
/// the queue is down to it. Unmatched prompts fail with [`ResearchError::Llm`].
#[derive(Default)]
pub struct ScriptedModel {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `response` for prompts containing `marker`.
    pub fn respond(self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        let marker = marker.into();
        {
            let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
            match scripts.iter_mut().find(|s| s.marker == marker) {
                Some(script) => script.responses.push_back(response.into()),
                None => scripts.push(Script {
                    marker,
                    responses: VecDeque::from([response.into()]),
                }),
            }
        }
        self
    }

    /// A plausible single-loop research run about `topic`.
    ///
    /// The answer cites the first source of the first search, so it pairs
    /// with [`StaticSearch`].
    pub fn research_run(topic: &str) -> Self {
        let plan = serde_json::json!({
            "rationale": format!("Cover the key aspects of {}.", topic),
            "query": [format!("{} overview", topic), format!("{} latest developments", topic)],
        });
        let reflection = serde_json::json!({
            "is_sufficient": true,
            "knowledge_gap": "",
            "follow_up_queries": [],
        });
        let answer = format!(
            "{} is covered by recent reporting [example]({}0-0). The findings agree on the main points.",
            topic, SHORT_URL_PREFIX
        );

        Self::new()
            .respond(QUERY_PROMPT_MARKER, plan.to_string())
            .respond(REFLECTION_PROMPT_MARKER, reflection.to_string())
            .respond(ANSWER_PROMPT_MARKER, answer)
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_response(&self, prompt: &str) -> Option<String> {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        let script = scripts.iter_mut().find(|s| prompt.contains(&s.marker))?;
        if script.responses.len() > 1 {
            script.responses.pop_front()
        } else {
            script.responses.front().cloned()
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        self.next_response(&request.prompt).ok_or_else(|| {
            ResearchError::Llm(format!("no scripted response for model {}", request.model))
        })
    }

    /// Streams the scripted response word by word.
    async fn stream(&self, request: &CompletionRequest) -> Result<TokenStream> {
        let text = self.complete(request).await?;
        let words: Vec<Result<String>> = text.split_inclusive(' ').map(|w| Ok(w.to_string())).collect();
        Ok(Box::pin(futures::stream::iter(words)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// =============================================================================
// STATIC SEARCH
// =============================================================================

/// A [`SearchProvider`] returning one grounded sentence and one source per
/// query.
///
/// Query `q` is answered with `"Findings about q."` backed by
/// `https://example.com/<slug of q>`.
#[derive(Default)]
pub struct StaticSearch {
    queries: Mutex<Vec<String>>,
    fail: bool,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every search is rejected as unauthorized.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Queries searched so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn url_for(query: &str) -> String {
        let slug: String = query
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        format!("https://example.com/{}", slug)
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, request: &SearchRequest) -> std::result::Result<GroundedResponse, SearchError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.query.clone());

        if self.fail {
            return Err(SearchError::Unauthorized);
        }

        let text = format!("Findings about {}.", request.query);
        Ok(GroundedResponse {
            supports: vec![GroundingSupport {
                start_index: 0,
                end_index: text.len(),
                chunk_indices: vec![0],
            }],
            chunks: vec![GroundingChunk {
                uri: Self::url_for(&request.query),
                title: "example.com".to_string(),
            }],
            text,
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_queues_then_repeats() {
        let model = ScriptedModel::new().respond("alpha", "one").respond("alpha", "two");
        let request = CompletionRequest::new("m", "say alpha", 0.0);

        assert_eq!(model.complete(&request).await.unwrap(), "one");
        assert_eq!(model.complete(&request).await.unwrap(), "two");
        assert_eq!(model.complete(&request).await.unwrap(), "two");
        assert_eq!(model.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_scripted_model_unmatched_prompt_fails() {
        let model = ScriptedModel::new().respond("alpha", "one");
        let err = model
            .complete(&CompletionRequest::new("m", "beta", 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::Llm(_)));
    }

    #[tokio::test]
    async fn test_static_search_is_grounded() {
        let search = StaticSearch::new();
        let request = SearchRequest {
            query: "Rust async".to_string(),
            prompt: String::new(),
            model: "m".to_string(),
        };
        let response = search.search(&request).await.unwrap();

        assert_eq!(response.text, "Findings about Rust async.");
        assert_eq!(response.chunks[0].uri, "https://example.com/rust-async");
        assert_eq!(response.supports[0].end_index, response.text.len());
        assert_eq!(search.queries(), vec!["Rust async"]);
    }
}
