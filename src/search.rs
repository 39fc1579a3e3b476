//! # Search Module
//!
//! Grounded web search: a model answers a research prompt with Google Search
//! enabled and reports which parts of its answer came from which pages.
//!
//! This module demonstrates:
//! - A trait seam (`SearchProvider`) so the graph can run against test doubles
//! - Typed errors with thiserror and a retry policy keyed on them
//! - Serde for the Gemini request/response bodies

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ApiKey;

/// Public Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default timeout for one search request
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 1000;

// =============================================================================
// CUSTOM ERROR TYPE
// =============================================================================
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check GEMINI_API_KEY")]
    Unauthorized,

    #[error("Rate limited by search provider, please wait")]
    RateLimited,

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("No grounded text returned for query: {0}")]
    Empty(String),
}

impl SearchError {
    /// Whether retrying the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchError::Timeout
                | SearchError::Connection(_)
                | SearchError::RateLimited
                | SearchError::ServerError(_, _)
        )
    }
}

// =============================================================================
// SEARCH TYPES
// =============================================================================

/// What the graph asks a provider to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// The bare search query (used for logging and by test doubles)
    pub query: String,
    /// The full web-searcher prompt
    pub prompt: String,
    /// Model that performs the grounded search
    pub model: String,
}

/// A page the grounded answer drew on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    pub uri: String,
    pub title: String,
}

/// A byte span of the answer text and the chunks that back it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSupport {
    pub start_index: usize,
    pub end_index: usize,
    pub chunk_indices: Vec<usize>,
}

/// Text produced by a grounded search plus its grounding metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedResponse {
    pub text: String,
    pub chunks: Vec<GroundingChunk>,
    pub supports: Vec<GroundingSupport>,
}

/// Anything that can run a grounded search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<GroundedResponse, SearchError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

// =============================================================================
// GOOGLE SEARCH GROUNDING
// =============================================================================

/// Gemini `generateContent` with the `google_search` tool enabled.
///
/// # Example
/// ```no_run
/// use deep_research_agent::config::ApiKey;
/// use deep_research_agent::search::GoogleSearchGrounding;
///
/// let search = GoogleSearchGrounding::new(ApiKey::from_env()?);
/// # Ok::<(), deep_research_agent::ResearchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GoogleSearchGrounding {
    api_key: ApiKey,
    client: Client,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl GoogleSearchGrounding {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
        }
    }

    /// Point at a different endpoint (a proxy, or a mock server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    async fn execute_with_retry(
        &self,
        request: &SearchRequest,
    ) -> Result<GenerateContentResponse, SearchError> {
        let mut attempt = 0;
        loop {
            match self.execute_single_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * 2u64.pow(attempt));
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Search failed, will retry");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn execute_single_request(
        &self,
        request: &SearchRequest,
    ) -> Result<GenerateContentResponse, SearchError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "tools": [{ "google_search": {} }],
            "generationConfig": { "temperature": 0 },
        });

        let url = self.endpoint(&request.model);
        debug!(url = %url, query = %request.query, "Sending grounded search request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else if e.is_connect() {
                    SearchError::Connection(e.to_string())
                } else {
                    SearchError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<GenerateContentResponse>()
                .await
                .map_err(|e| SearchError::ParseError(e.to_string()));
        }

        let error_text = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(SearchError::Unauthorized),
            429 => Err(SearchError::RateLimited),
            code @ 500..=599 => Err(SearchError::ServerError(code, error_text)),
            code => Err(SearchError::HttpError(code, error_text)),
        }
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchGrounding {
    async fn search(&self, request: &SearchRequest) -> Result<GroundedResponse, SearchError> {
        info!(query = %request.query, model = %request.model, "Performing grounded web search");

        let response = self.execute_with_retry(request).await?;
        let grounded = response.into_grounded();

        if grounded.text.trim().is_empty() {
            return Err(SearchError::Empty(request.query.clone()));
        }

        info!(
            query = %request.query,
            sources = grounded.chunks.len(),
            "Search completed"
        );
        Ok(grounded)
    }

    fn name(&self) -> &str {
        "google-search-grounding"
    }
}

// =============================================================================
// WIRE FORMAT
// =============================================================================
// Only the parts of the generateContent response we read. Everything is
// optional on the wire, so every field defaults.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireChunk>,
    #[serde(default)]
    grounding_supports: Vec<WireSupport>,
}

#[derive(Debug, Default, Deserialize)]
struct WireChunk {
    #[serde(default)]
    web: Option<WireWeb>,
}

#[derive(Debug, Default, Deserialize)]
struct WireWeb {
    #[serde(default)]
    uri: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSupport {
    #[serde(default)]
    segment: WireSegment,
    #[serde(default)]
    grounding_chunk_indices: Vec<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSegment {
    #[serde(default)]
    start_index: usize,
    #[serde(default)]
    end_index: usize,
}

impl GenerateContentResponse {
    fn into_grounded(self) -> GroundedResponse {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return GroundedResponse::default();
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let metadata = candidate.grounding_metadata.unwrap_or_default();

        // Non-web chunks keep their slot so support indices stay aligned.
        let chunks = metadata
            .grounding_chunks
            .into_iter()
            .map(|c| {
                let web = c.web.unwrap_or_default();
                GroundingChunk {
                    uri: web.uri,
                    title: web.title,
                }
            })
            .collect();

        let supports = metadata
            .grounding_supports
            .into_iter()
            .map(|s| GroundingSupport {
                start_index: s.segment.start_index,
                end_index: s.segment.end_index,
                chunk_indices: s.grounding_chunk_indices,
            })
            .collect();

        GroundedResponse {
            text,
            chunks,
            supports,
        }
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(SearchError::Timeout.is_retryable());
        assert!(SearchError::RateLimited.is_retryable());
        assert!(SearchError::ServerError(503, String::new()).is_retryable());
        assert!(!SearchError::Unauthorized.is_retryable());
        assert!(!SearchError::HttpError(404, String::new()).is_retryable());
        assert!(!SearchError::Empty("q".into()).is_retryable());
    }

    #[test]
    fn test_endpoint_and_base_url_trim() {
        let search = GoogleSearchGrounding::new(ApiKey::new("k")).with_base_url("http://localhost:1234/");
        assert_eq!(
            search.endpoint("gemini-2.0-flash"),
            "http://localhost:1234/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_into_grounded_parses_metadata() {
        let raw = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Solar is cheap. " }, { "text": "Wind too." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a.example/1", "title": "a.example" } },
                        { "retrievedContext": {} }
                    ],
                    "groundingSupports": [
                        { "segment": { "endIndex": 15, "text": "Solar is cheap." }, "groundingChunkIndices": [0] }
                    ]
                }
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let grounded = response.into_grounded();

        assert_eq!(grounded.text, "Solar is cheap. Wind too.");
        assert_eq!(grounded.chunks.len(), 2);
        assert_eq!(grounded.chunks[0].title, "a.example");
        assert_eq!(grounded.chunks[1].uri, "");
        assert_eq!(
            grounded.supports,
            vec![GroundingSupport { start_index: 0, end_index: 15, chunk_indices: vec![0] }]
        );
    }

    #[test]
    fn test_into_grounded_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(response.into_grounded(), GroundedResponse::default());
    }

    // =========================================================================
    // HTTP tests against a mock Gemini endpoint
    // =========================================================================
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    fn request() -> SearchRequest {
        SearchRequest {
            query: "solar costs".to_string(),
            prompt: "Research solar costs".to_string(),
            model: "gemini-2.0-flash".to_string(),
        }
    }

    fn client(server: &MockServer) -> GoogleSearchGrounding {
        GoogleSearchGrounding::new(ApiKey::new("test-api-key"))
            .with_base_url(server.uri())
            .with_timeout(Duration::from_secs(5))
    }

    fn sample_success_response() -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Solar got cheaper." }] },
                "groundingMetadata": {
                    "groundingChunks": [{ "web": { "uri": "https://redirect/abc", "title": "iea.org" } }],
                    "groundingSupports": [{
                        "segment": { "startIndex": 0, "endIndex": 18 },
                        "groundingChunkIndices": [0]
                    }]
                }
            }]
        })
    }

    #[tokio::test]
    async fn test_http_successful_search() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "test-api-key"))
            .and(body_partial_json(json!({
                "tools": [{ "google_search": {} }],
                "generationConfig": { "temperature": 0 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_success_response()))
            .mount(&mock_server)
            .await;

        let response = client(&mock_server).search(&request()).await.unwrap();

        assert_eq!(response.text, "Solar got cheaper.");
        assert_eq!(response.chunks[0].title, "iea.org");
        assert_eq!(response.supports[0].end_index, 18);
    }

    #[tokio::test]
    async fn test_http_unauthorized_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).search(&request()).await;
        assert!(matches!(result, Err(SearchError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_http_rate_limited_without_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("Quota exceeded"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).with_max_retries(0).search(&request()).await;
        assert!(matches!(result, Err(SearchError::RateLimited)));
    }

    #[tokio::test]
    async fn test_http_server_error_is_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("Unavailable"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_success_response()))
            .mount(&mock_server)
            .await;

        let response = client(&mock_server).with_max_retries(1).search(&request()).await.unwrap();
        assert_eq!(response.text, "Solar got cheaper.");
    }

    #[tokio::test]
    async fn test_http_bad_request_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).search(&request()).await;
        assert!(matches!(result, Err(SearchError::HttpError(400, ref body)) if body == "bad model"));
    }

    #[tokio::test]
    async fn test_http_empty_text_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).search(&request()).await;
        assert!(matches!(result, Err(SearchError::Empty(ref q)) if q == "solar costs"));
    }

    #[tokio::test]
    async fn test_http_malformed_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).search(&request()).await;
        assert!(matches!(result, Err(SearchError::ParseError(_))));
    }
}
