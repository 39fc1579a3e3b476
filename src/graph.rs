//! # Research Graph
//!
//! The research loop as a small fixed graph:
//!
//! ```text
//! START -> generate_query -> web_research (xN, concurrent) -> reflection
//!                                 ^                              |
//!                                 +------ follow-up queries -----+
//!                                                                |
//!                                    sufficient / budget spent   v
//!                                                     finalize_answer -> END
//! ```
//!
//! Every node returns a [`StateUpdate`]. [`ResearchGraph::stream`] emits
//! those updates (and the answer tokens) as they happen, and
//! [`ResearchGraph::invoke`] folds them onto the input state.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures::future::try_join_all;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ApiKey, Configuration};
use crate::error::{ResearchError, Result};
use crate::llm::{CompletionRequest, LanguageModel, RigGemini};
use crate::prompts;
use crate::search::{GoogleSearchGrounding, SearchProvider, SearchRequest};
use crate::state::{Message, QueryPlan, Reflection, ResearchState, Source, StateUpdate, WebSearchTask};
use crate::utils::{citations, insert_citation_markers, parse_json_object, research_topic, resolve_urls};

/// Name the compiled graph reports.
pub const GRAPH_NAME: &str = "pro-search-agent";

pub const GENERATE_QUERY: &str = "generate_query";
pub const WEB_RESEARCH: &str = "web_research";
pub const REFLECTION: &str = "reflection";
pub const FINALIZE_ANSWER: &str = "finalize_answer";

/// Nodes in execution order.
pub const NODES: [&str; 4] = [GENERATE_QUERY, WEB_RESEARCH, REFLECTION, FINALIZE_ANSWER];

const QUERY_TEMPERATURE: f64 = 1.0;
const REFLECTION_TEMPERATURE: f64 = 1.0;
const ANSWER_TEMPERATURE: f64 = 0.0;

/// Which events a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// One event per finished node, carrying its state delta
    Updates,
    /// One event per generated answer token
    Messages,
}

impl StreamMode {
    pub const ALL: [StreamMode; 2] = [StreamMode::Updates, StreamMode::Messages];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updates => "updates",
            Self::Messages => "messages",
        }
    }
}

/// Identifies the node that produced a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    pub node: String,
}

/// One item of [`ResearchGraph::stream`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Updates { node: String, update: StateUpdate },
    Messages { token: String, metadata: MessageMetadata },
}

impl StreamEvent {
    pub fn mode(&self) -> StreamMode {
        match self {
            Self::Updates { .. } => StreamMode::Updates,
            Self::Messages { .. } => StreamMode::Messages,
        }
    }
}

/// Boxed stream of graph events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

// =============================================================================
// GRAPH
// =============================================================================
/// The research agent graph.
///
/// Cloning is cheap: the model and search provider are shared.
#[derive(Clone)]
pub struct ResearchGraph {
    config: Configuration,
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
}

impl ResearchGraph {
    pub fn new(
        config: Configuration,
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        Self {
            config,
            model,
            search,
        }
    }

    /// Graph backed by Gemini for both completions and grounded search.
    pub fn gemini(config: Configuration, api_key: ApiKey) -> Self {
        let model = Arc::new(RigGemini::new(&api_key));
        let search = Arc::new(GoogleSearchGrounding::new(api_key));
        Self::new(config, model, search)
    }

    pub fn name(&self) -> &str {
        GRAPH_NAME
    }

    pub fn nodes(&self) -> &'static [&'static str] {
        &NODES
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Human-readable description of the edges.
    pub fn flow_diagram(&self) -> String {
        [
            format!("START -> {}", GENERATE_QUERY),
            format!("{} -> {} (one branch per query)", GENERATE_QUERY, WEB_RESEARCH),
            format!("{} -> {}", WEB_RESEARCH, REFLECTION),
            format!("{} -> {} (follow-up queries, while budget remains)", REFLECTION, WEB_RESEARCH),
            format!("{} -> {} (sufficient or budget spent)", REFLECTION, FINALIZE_ANSWER),
            format!("{} -> END", FINALIZE_ANSWER),
        ]
        .join("\n")
    }

    /// Run to completion and return the final state.
    pub async fn invoke(&self, input: ResearchState) -> Result<ResearchState> {
        let mut state = input.clone();
        let mut events = self.stream(input, &[StreamMode::Updates]);
        while let Some(event) = events.next().await {
            if let StreamEvent::Updates { update, .. } = event? {
                state.apply(update);
            }
        }
        Ok(state)
    }

    /// Run the graph, yielding the events selected by `modes`.
    ///
    /// The stream ends with the first error any node returns.
    pub fn stream(&self, input: ResearchState, modes: &[StreamMode]) -> EventStream {
        let graph = self.clone();
        let want_updates = modes.contains(&StreamMode::Updates);
        let want_messages = modes.contains(&StreamMode::Messages);

        Box::pin(try_stream! {
            let mut state = input;
            graph.check_loop_budget(&state)?;
            let topic = research_topic(&state.messages);
            info!(graph = GRAPH_NAME, topic = %topic, "Starting research run");

            let update = graph.generate_query(&state, &topic).await?;
            let mut tasks: Vec<WebSearchTask> = update
                .search_query
                .iter()
                .flatten()
                .enumerate()
                .map(|(id, query)| WebSearchTask { search_query: query.clone(), id })
                .collect();
            state.apply(update.clone());
            if want_updates {
                yield StreamEvent::Updates { node: GENERATE_QUERY.to_string(), update };
            }

            loop {
                let updates = try_join_all(tasks.iter().map(|task| graph.web_research(task))).await?;
                for update in updates {
                    state.apply(update.clone());
                    if want_updates {
                        yield StreamEvent::Updates { node: WEB_RESEARCH.to_string(), update };
                    }
                }

                let update = graph.reflection(&state, &topic).await?;
                state.apply(update.clone());
                if want_updates {
                    yield StreamEvent::Updates { node: REFLECTION.to_string(), update };
                }

                if graph.should_finalize(&state) {
                    break;
                }

                tasks = state
                    .follow_up_queries
                    .iter()
                    .flatten()
                    .enumerate()
                    .map(|(i, query)| WebSearchTask {
                        search_query: query.clone(),
                        id: state.number_of_ran_queries + i,
                    })
                    .collect();
                info!(follow_ups = tasks.len(), loop_count = state.research_loop_count, "Continuing research");
            }

            let request = graph.answer_request(&state, &topic)?;
            let mut tokens = graph.model.stream(&request).await?;
            let mut answer = String::new();
            while let Some(token) = tokens.next().await {
                let token = token?;
                if token.is_empty() {
                    continue;
                }
                answer.push_str(&token);
                if want_messages {
                    yield StreamEvent::Messages {
                        token,
                        metadata: MessageMetadata { node: FINALIZE_ANSWER.to_string() },
                    };
                }
            }

            info!(answer_len = answer.len(), "Research run finished");
            let update = finalize_update(&state.sources_gathered, answer);
            state.apply(update.clone());
            if want_updates {
                yield StreamEvent::Updates { node: FINALIZE_ANSWER.to_string(), update };
            }
        })
    }

    // =========================================================================
    // NODES
    // =========================================================================

    async fn generate_query(&self, state: &ResearchState, topic: &str) -> Result<StateUpdate> {
        let wanted = self.config.effective_initial_queries(state);
        let prompt = prompts::query_writer(topic, wanted, &prompts::current_date())?;
        let request = CompletionRequest::new(&self.config.query_generator_model, prompt, QUERY_TEMPERATURE);

        let response = self.model.complete(&request).await?;
        let plan: QueryPlan = parse_json_object(&response, "query plan")?;

        let mut queries: Vec<String> = plan
            .query
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(wanted)
            .collect();
        if queries.is_empty() {
            warn!("Model returned no queries, searching for the topic itself");
            queries.push(topic.to_string());
        }

        info!(count = queries.len(), "Generated search queries");
        Ok(StateUpdate {
            search_query: Some(queries),
            ..Default::default()
        })
    }

    async fn web_research(&self, task: &WebSearchTask) -> Result<StateUpdate> {
        debug!(id = task.id, query = %task.search_query, "Running web research");
        let prompt = prompts::web_searcher(&task.search_query, &prompts::current_date())?;
        let request = SearchRequest {
            query: task.search_query.clone(),
            prompt,
            model: self.config.query_generator_model.clone(),
        };

        let response = self.search.search(&request).await?;
        let resolved = resolve_urls(&response.chunks, task.id);
        let cites = citations(&response, &resolved);
        let marked = insert_citation_markers(&response.text, &cites);
        let sources: Vec<Source> = cites.into_iter().flat_map(|c| c.segments).collect();

        Ok(StateUpdate {
            sources_gathered: Some(sources),
            search_query: Some(vec![task.search_query.clone()]),
            web_research_result: Some(vec![marked]),
            ..Default::default()
        })
    }

    async fn reflection(&self, state: &ResearchState, topic: &str) -> Result<StateUpdate> {
        let loop_count = state.research_loop_count + 1;
        let model = state
            .reasoning_model
            .as_deref()
            .unwrap_or(&self.config.reflection_model);
        let prompt = prompts::reflection(topic, &state.web_research_result)?;
        let request = CompletionRequest::new(model, prompt, REFLECTION_TEMPERATURE);

        let response = self.model.complete(&request).await?;
        let reflection: Reflection = parse_json_object(&response, "reflection")?;

        info!(
            loop_count,
            is_sufficient = reflection.is_sufficient,
            follow_ups = reflection.follow_up_queries.len(),
            "Reflected on research"
        );
        Ok(StateUpdate {
            is_sufficient: Some(reflection.is_sufficient),
            knowledge_gap: Some(reflection.knowledge_gap),
            follow_up_queries: Some(reflection.follow_up_queries),
            research_loop_count: Some(loop_count),
            number_of_ran_queries: Some(state.search_query.len()),
            ..Default::default()
        })
    }

    /// Reflection always runs once, so a run needs at least one loop.
    fn check_loop_budget(&self, state: &ResearchState) -> Result<()> {
        if self.config.effective_max_loops(state) == 0 {
            return Err(ResearchError::Config(
                "max_research_loops must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn should_finalize(&self, state: &ResearchState) -> bool {
        state.is_sufficient.unwrap_or(false)
            || state.research_loop_count >= self.config.effective_max_loops(state)
            || state.follow_up_queries.as_ref().map_or(true, Vec::is_empty)
    }

    fn answer_request(&self, state: &ResearchState, topic: &str) -> Result<CompletionRequest> {
        let prompt = prompts::answer(topic, &state.web_research_result, &prompts::current_date())?;
        let model = self.config.effective_answer_model(state);
        Ok(CompletionRequest::new(model, prompt, ANSWER_TEMPERATURE))
    }
}

/// Swap each short URL used in the answer for its original and keep only the
/// sources the answer actually cites.
///
/// Only whole link targets `(short_url)` are replaced, since one short URL
/// can be a prefix of another (`.../1-1` and `.../1-10`).
fn finalize_update(sources: &[Source], mut answer: String) -> StateUpdate {
    let mut used = Vec::new();
    for source in sources {
        if source.short_url.is_empty() {
            continue;
        }
        let target = format!("({})", source.short_url);
        if answer.contains(&target) {
            answer = answer.replace(&target, &format!("({})", source.value));
            used.push(source.clone());
        }
    }

    StateUpdate {
        messages: Some(vec![Message::ai(answer)]),
        sources_gathered: Some(used),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_update_replaces_only_cited_sources() {
        let sources = vec![
            Source::new("a", "https://s/id/0-0", "https://a.com/page"),
            Source::new("b", "https://s/id/0-1", "https://b.com/page"),
            Source::new("a", "https://s/id/0-0", "https://a.com/page"),
        ];
        let update = finalize_update(&sources, "See [a](https://s/id/0-0).".to_string());

        let messages = update.messages.unwrap();
        assert_eq!(messages[0].content, "See [a](https://a.com/page).");
        assert_eq!(update.sources_gathered.unwrap(), vec![sources[0].clone()]);
    }

    #[test]
    fn test_finalize_update_does_not_match_short_url_prefixes() {
        let sources = vec![
            Source::new("a", "https://s/id/1-1", "https://a.com/page0"),
            Source::new("k", "https://s/id/1-10", "https://k.com/page10"),
        ];
        let update = finalize_update(&sources, "Only k is cited [k](https://s/id/1-10).".to_string());

        let messages = update.messages.unwrap();
        assert_eq!(messages[0].content, "Only k is cited [k](https://k.com/page10).");
        assert_eq!(update.sources_gathered.unwrap(), vec![sources[1].clone()]);

        let update = finalize_update(
            &sources,
            "Both [a](https://s/id/1-1) and [k](https://s/id/1-10).".to_string(),
        );
        assert_eq!(
            update.messages.unwrap()[0].content,
            "Both [a](https://a.com/page0) and [k](https://k.com/page10)."
        );
        assert_eq!(update.sources_gathered.unwrap().len(), 2);
    }

    #[test]
    fn test_flow_diagram_names_every_node() {
        let diagram = ResearchGraph::new(
            Configuration::default(),
            Arc::new(crate::mock::ScriptedModel::new()),
            Arc::new(crate::mock::StaticSearch::new()),
        )
        .flow_diagram();
        for node in NODES {
            assert!(diagram.contains(node), "missing {}", node);
        }
    }

    #[test]
    fn test_stream_mode_names() {
        assert_eq!(StreamMode::Updates.as_str(), "updates");
        assert_eq!(StreamMode::Messages.as_str(), "messages");
    }
}
