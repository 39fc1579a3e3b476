//! # Result Reports
//!
//! Persisting a finished [`ResearchState`] and summarising it.
//!
//! The JSON file is the only artifact a run leaves behind. Messages are
//! written as `{"type", "content"}` pairs, every other key as-is, and
//! non-ASCII text is kept verbatim.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::state::{MessageKind, ResearchState};
use crate::utils::truncate;

/// Characters of the answer kept in [`ResultAnalysis::answer_preview`].
pub const ANSWER_PREVIEW_CHARS: usize = 200;

/// Write `state` to `path` as pretty-printed JSON.
pub fn save_result(path: impl AsRef<Path>, state: &ResearchState) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "Result saved");
    Ok(())
}

/// Read a state written by [`save_result`].
pub fn load_result(path: impl AsRef<Path>) -> Result<ResearchState> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Per-message summary used by [`ResultAnalysis`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStat {
    pub kind: MessageKind,
    pub chars: usize,
}

/// What a finished run produced, in numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultAnalysis {
    pub messages: Vec<MessageStat>,
    pub queries: Vec<String>,
    /// Length in characters of each research result
    pub result_lengths: Vec<usize>,
    pub sources: usize,
    /// Sources counted once per `value`
    pub unique_sources: usize,
    pub loops: usize,
    pub answer_chars: usize,
    /// Whether the answer contains a markdown link
    pub has_citations: bool,
    pub answer_preview: String,
}

impl ResultAnalysis {
    pub fn from_state(state: &ResearchState) -> Self {
        let answer = state.final_answer().unwrap_or_default();
        let unique: HashSet<&str> = state
            .sources_gathered
            .iter()
            .map(|s| s.value.as_str())
            .collect();

        Self {
            messages: state
                .messages
                .iter()
                .map(|m| MessageStat {
                    kind: m.kind,
                    chars: m.content.chars().count(),
                })
                .collect(),
            queries: state.search_query.clone(),
            result_lengths: state
                .web_research_result
                .iter()
                .map(|r| r.chars().count())
                .collect(),
            sources: state.sources_gathered.len(),
            unique_sources: unique.len(),
            loops: state.research_loop_count,
            answer_chars: answer.chars().count(),
            has_citations: answer.contains('[') && answer.contains("]("),
            answer_preview: truncate(answer, ANSWER_PREVIEW_CHARS),
        }
    }

    /// Multi-line report for the console.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("💬 Messages: {}\n", self.messages.len()));
        for (i, m) in self.messages.iter().enumerate() {
            out.push_str(&format!("  {}. {}: {} chars\n", i + 1, m.kind.as_str(), m.chars));
        }

        out.push_str(&format!("\n🔍 Search queries: {}\n", self.queries.len()));
        for (i, q) in self.queries.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, q));
        }

        out.push_str(&format!("\n🌐 Research results: {}\n", self.result_lengths.len()));
        for (i, len) in self.result_lengths.iter().enumerate() {
            out.push_str(&format!("  {}. {} chars\n", i + 1, len));
        }

        out.push_str(&format!("\n📚 Sources gathered: {}\n", self.sources));
        out.push_str(&format!("  - Unique sources: {}\n", self.unique_sources));
        out.push_str(&format!("\n📈 Loops executed: {}\n", self.loops));

        out.push_str("\n📝 Final answer:\n");
        out.push_str(&format!("  - Length: {} characters\n", self.answer_chars));
        out.push_str(&format!("  - Has citations: {}\n", self.has_citations));
        out.push_str(&format!("  - Preview: {}\n", self.answer_preview));
        out
    }
}

/// One line of a configuration comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub elapsed: Duration,
    pub queries: usize,
    pub sources: usize,
    pub loops: usize,
    pub answer_chars: usize,
}

impl RunSummary {
    pub fn new(name: impl Into<String>, elapsed: Duration, state: &ResearchState) -> Self {
        Self {
            name: name.into(),
            elapsed,
            queries: state.search_query.len(),
            sources: state.sources_gathered.len(),
            loops: state.research_loop_count,
            answer_chars: state.final_answer().map_or(0, |a| a.chars().count()),
        }
    }

    /// `name: 1.23s, 2 queries, 4 sources`
    pub fn one_line(&self) -> String {
        format!(
            "{}: {:.2}s, {} queries, {} sources",
            self.name,
            self.elapsed.as_secs_f64(),
            self.queries,
            self.sources
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Message, Source};

    fn finished_state() -> ResearchState {
        let mut state = ResearchState::from_question("What is AI?");
        state.messages.push(Message::ai("AI is [wiki](https://en.wikipedia.org/wiki/AI)."));
        state.search_query = vec!["AI definition".into(), "AI history".into()];
        state.web_research_result = vec!["abc".into(), "de".into()];
        state.sources_gathered = vec![
            Source::new("wiki", "s0", "https://en.wikipedia.org/wiki/AI"),
            Source::new("wiki", "s1", "https://en.wikipedia.org/wiki/AI"),
        ];
        state.research_loop_count = 1;
        state
    }

    #[test]
    fn test_analysis_counts() {
        let analysis = ResultAnalysis::from_state(&finished_state());

        assert_eq!(analysis.messages.len(), 2);
        assert_eq!(analysis.messages[1].kind, MessageKind::Ai);
        assert_eq!(analysis.queries.len(), 2);
        assert_eq!(analysis.result_lengths, vec![3, 2]);
        assert_eq!(analysis.sources, 2);
        assert_eq!(analysis.unique_sources, 1);
        assert_eq!(analysis.loops, 1);
        assert!(analysis.has_citations);
        assert!(analysis.render().contains("Unique sources: 1"));
    }

    #[test]
    fn test_analysis_of_empty_state() {
        let analysis = ResultAnalysis::from_state(&ResearchState::default());
        assert_eq!(analysis.answer_chars, 0);
        assert!(!analysis.has_citations);
        assert_eq!(analysis.answer_preview, "");
    }

    #[test]
    fn test_run_summary_line() {
        let summary = RunSummary::new("Fast", Duration::from_millis(1500), &finished_state());
        assert_eq!(summary.one_line(), "Fast: 1.50s, 2 queries, 2 sources");
    }
}
