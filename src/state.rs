//! Research state definition
//!
//! The state flows through the graph as a plain serde struct. Each node
//! returns a [`StateUpdate`] and [`ResearchState::apply`] folds it in:
//! list fields are appended, scalar fields are overwritten.
//!
//! The JSON shape uses the same keys the result files use, and unknown keys
//! survive a round trip through `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Human,
    Ai,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
        }
    }
}

/// A chat message, serialised as `{"type": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Ai,
            content: content.into(),
        }
    }
}

/// A citation source gathered during web research.
///
/// `short_url` is the token-cheap placeholder the models see; `value` is the
/// original URL it stands for. Only `value` is required when loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub short_url: String,
    pub value: String,

    /// Other keys on the record, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source {
    pub fn new(
        label: impl Into<String>,
        short_url: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            short_url: short_url.into(),
            value: value.into(),
            extra: Map::new(),
        }
    }
}

/// Structured output of the query generation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default)]
    pub rationale: String,
    pub query: Vec<String>,
}

/// One unit of web research: a query plus the id used to build short URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchTask {
    pub search_query: String,
    pub id: usize,
}

/// Structured output of the reflection step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub is_sufficient: bool,
    #[serde(default)]
    pub knowledge_gap: String,
    #[serde(default)]
    pub follow_up_queries: Vec<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// The complete research state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    /// Conversation so far; the last message is the answer after a run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,

    /// Every query run so far, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_query: Vec<String>,

    /// Citation-marked text gathered per query
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub web_research_result: Vec<String>,

    /// Citation sources; may repeat, dedupe by `value` for reporting
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources_gathered: Vec<Source>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_search_query_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_research_loops: Option<usize>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub research_loop_count: usize,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub number_of_ran_queries: usize,

    /// Model used for the final answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sufficient: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_gap: Option<String>,

    /// Set by every reflection, kept in saved files even when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_queries: Option<Vec<String>>,

    /// Keys this crate doesn't know about, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResearchState {
    /// Initial state holding a single human message.
    pub fn from_question(question: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::human(question)],
            ..Default::default()
        }
    }

    pub fn with_initial_search_query_count(mut self, count: usize) -> Self {
        self.initial_search_query_count = Some(count);
        self
    }

    pub fn with_max_research_loops(mut self, loops: usize) -> Self {
        self.max_research_loops = Some(loops);
        self
    }

    pub fn with_reasoning_model(mut self, model: impl Into<String>) -> Self {
        self.reasoning_model = Some(model.into());
        self
    }

    /// Attach a key this crate doesn't model (e.g. `"domain": "medical"`).
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The content of the last message, i.e. the answer after a run.
    pub fn final_answer(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }

    /// Number of distinct source URLs.
    pub fn unique_source_count(&self) -> usize {
        let unique: std::collections::HashSet<&str> = self
            .sources_gathered
            .iter()
            .map(|s| s.value.as_str())
            .collect();
        unique.len()
    }

    /// Fold a node's output into the state.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(messages) = update.messages {
            self.messages.extend(messages);
        }
        if let Some(queries) = update.search_query {
            self.search_query.extend(queries);
        }
        if let Some(results) = update.web_research_result {
            self.web_research_result.extend(results);
        }
        if let Some(sources) = update.sources_gathered {
            self.sources_gathered.extend(sources);
        }
        if let Some(count) = update.research_loop_count {
            self.research_loop_count = count;
        }
        if let Some(count) = update.number_of_ran_queries {
            self.number_of_ran_queries = count;
        }
        if let Some(sufficient) = update.is_sufficient {
            self.is_sufficient = Some(sufficient);
        }
        if let Some(gap) = update.knowledge_gap {
            self.knowledge_gap = Some(gap);
        }
        if let Some(follow_ups) = update.follow_up_queries {
            self.follow_up_queries = Some(follow_ups);
        }
    }
}

/// Partial output of one node.
///
/// Only the fields a node sets are `Some`; [`ResearchState::apply`] decides
/// whether a field appends or overwrites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_research_result: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_gathered: Option<Vec<Source>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_loop_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_ran_queries: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sufficient: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_gap: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_queries: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initial_state_has_only_requested_fields() {
        let state = ResearchState::from_question("What is artificial intelligence?")
            .with_initial_search_query_count(2);

        let value = serde_json::to_value(&state).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<_> = object.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["initial_search_query_count", "messages"]);
        assert_eq!(object["initial_search_query_count"], json!(2));

        let messages = object["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"], json!("What is artificial intelligence?"));
        assert_eq!(messages[0]["type"], json!("human"));
    }

    #[test]
    fn test_apply_appends_lists_and_overwrites_scalars() {
        let mut state = ResearchState::from_question("q");
        state.apply(StateUpdate {
            search_query: Some(vec!["a".into(), "b".into()]),
            research_loop_count: Some(1),
            follow_up_queries: Some(vec!["x".into()]),
            ..Default::default()
        });
        state.apply(StateUpdate {
            search_query: Some(vec!["c".into()]),
            research_loop_count: Some(2),
            follow_up_queries: Some(vec![]),
            ..Default::default()
        });

        assert_eq!(state.search_query, vec!["a", "b", "c"]);
        assert_eq!(state.research_loop_count, 2);
        assert_eq!(state.follow_up_queries, Some(vec![]));
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let state = ResearchState::from_question("diabetes treatments")
            .with_extra("domain", "medical")
            .with_extra("evidence_level", "peer_reviewed");

        let text = serde_json::to_string(&state).unwrap();
        let back: ResearchState = serde_json::from_str(&text).unwrap();

        assert_eq!(back, state);
        assert_eq!(back.extra["domain"], json!("medical"));
    }

    #[test]
    fn test_unique_source_count_dedupes_by_value() {
        let mut state = ResearchState::default();
        state.sources_gathered = vec![
            Source::new("a", "https://s/0-0", "https://a.com"),
            Source::new("a", "https://s/1-0", "https://a.com"),
            Source::new("b", "https://s/0-1", "https://b.com"),
        ];
        assert_eq!(state.unique_source_count(), 2);
    }

    #[test]
    fn test_reflection_tolerates_missing_optional_fields() {
        let reflection: Reflection = serde_json::from_value(json!({"is_sufficient": true})).unwrap();
        assert!(reflection.is_sufficient);
        assert!(reflection.follow_up_queries.is_empty());
    }

    #[test]
    fn test_final_answer() {
        let mut state = ResearchState::from_question("q");
        state.apply(StateUpdate {
            messages: Some(vec![Message::ai("answer")]),
            ..Default::default()
        });
        assert_eq!(state.final_answer(), Some("answer"));
    }
}
