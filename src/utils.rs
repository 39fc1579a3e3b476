//! Helpers shared by the graph nodes and the printers.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::{ResearchError, Result};
use crate::search::{GroundedResponse, GroundingChunk};
use crate::state::{Message, MessageKind, Source};

/// Prefix of the placeholder URLs handed to the models instead of the long
/// grounding redirect URLs.
pub const SHORT_URL_PREFIX: &str = "https://vertexaisearch.cloud.google.com/id/";

/// Marker appended to truncated previews.
pub const ELLIPSIS: &str = "...";

/// The topic to research, derived from the conversation.
///
/// A single message is used as-is; longer conversations are flattened into
/// `User: ...` / `Assistant: ...` lines so the models see the whole exchange.
pub fn research_topic(messages: &[Message]) -> String {
    if let [only] = messages {
        return only.content.clone();
    }

    let mut topic = String::new();
    for message in messages {
        let speaker = match message.kind {
            MessageKind::Human => "User",
            MessageKind::Ai => "Assistant",
        };
        topic.push_str(speaker);
        topic.push_str(": ");
        topic.push_str(&message.content);
        topic.push('\n');
    }
    topic
}

/// Shorten `text` to `max` characters plus [`ELLIPSIS`]; shorter text is
/// returned unchanged.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Map every distinct grounding URI to a short placeholder URL.
///
/// The suffix is `{id}-{idx}` where `idx` is the position of the URI's first
/// occurrence, so ids stay stable no matter how often a URI repeats.
/// Chunks without a URI (non-web grounding) get no short URL.
pub fn resolve_urls(chunks: &[GroundingChunk], id: usize) -> HashMap<String, String> {
    let mut resolved = HashMap::new();
    for (idx, chunk) in chunks.iter().enumerate() {
        if chunk.uri.is_empty() {
            continue;
        }
        resolved
            .entry(chunk.uri.clone())
            .or_insert_with(|| format!("{}{}-{}", SHORT_URL_PREFIX, id, idx));
    }
    resolved
}

/// A span of the grounded text backed by one or more sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub start_index: usize,
    pub end_index: usize,
    pub segments: Vec<Source>,
}

/// Build one [`Citation`] per grounding support.
///
/// Supports that point at chunks we don't have, or at chunks without a URI,
/// are skipped silently.
pub fn citations(response: &GroundedResponse, resolved: &HashMap<String, String>) -> Vec<Citation> {
    let mut out = Vec::new();
    for support in &response.supports {
        let segments: Vec<Source> = support
            .chunk_indices
            .iter()
            .filter_map(|&idx| response.chunks.get(idx))
            .filter(|chunk| !chunk.uri.is_empty())
            .filter_map(|chunk| {
                let short_url = resolved.get(&chunk.uri)?;
                Some(Source::new(source_label(&chunk.title), short_url, &chunk.uri))
            })
            .collect();

        if segments.is_empty() {
            continue;
        }

        out.push(Citation {
            start_index: support.start_index,
            end_index: support.end_index,
            segments,
        });
    }
    out
}

/// `"apnews.com"` -> `"apnews"`; titles without a dot are kept whole.
fn source_label(title: &str) -> String {
    match title.split_once('.') {
        Some((head, _)) if !head.is_empty() => head.to_string(),
        _ => title.to_string(),
    }
}

/// Insert ` [label](short_url)` markers after each cited span.
///
/// Indices are UTF-8 byte offsets. Citations are applied from the end of the
/// text backwards so earlier offsets stay valid; an offset past the end or
/// inside a code point is moved back to the nearest char boundary.
pub fn insert_citation_markers(text: &str, citations: &[Citation]) -> String {
    let mut ordered: Vec<&Citation> = citations.iter().collect();
    ordered.sort_by(|a, b| {
        b.end_index
            .cmp(&a.end_index)
            .then_with(|| b.start_index.cmp(&a.start_index))
    });

    let mut out = text.to_string();
    for citation in ordered {
        let mut at = citation.end_index.min(out.len());
        while !out.is_char_boundary(at) {
            at -= 1;
        }
        let marker: String = citation
            .segments
            .iter()
            .map(|s| format!(" [{}]({})", s.label, s.short_url))
            .collect();
        out.insert_str(at, &marker);
    }
    out
}

/// Parse the JSON object a model was asked to produce.
///
/// Models wrap JSON in ```json fences or add a sentence around it, so we
/// take the outermost `{ ... }` span of the response.
pub fn parse_json_object<T: DeserializeOwned>(text: &str, what: &'static str) -> Result<T> {
    let start = text.find('{');
    let end = text.rfind('}');
    let candidate = match (start, end) {
        (Some(s), Some(e)) if e > s => &text[s..=e],
        _ => {
            return Err(ResearchError::Parse {
                what,
                reason: format!("no JSON object in {:?}", truncate(text, 80)),
            })
        }
    };

    serde_json::from_str(candidate).map_err(|e| ResearchError::Parse {
        what,
        reason: e.to_string(),
    })
}
