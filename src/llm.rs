//! Language model seam.
//!
//! The graph only needs "prompt in, text out" plus an optional token stream
//! for the final answer. [`RigGemini`] bridges that to rig-core's Gemini
//! client; tests plug in [`crate::mock::ScriptedModel`].

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::gemini::client::GeminiApiKey;
use rig::providers::gemini::Client;
use tracing::debug;

use crate::config::ApiKey;
use crate::error::{ResearchError, Result};

/// One prompt for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f64) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature,
        }
    }
}

/// Text fragments of a streamed completion, in order.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat model the research graph can call.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a full completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Generate a completion as a stream of text fragments.
    ///
    /// Default implementation falls back to [`LanguageModel::complete`] and
    /// yields the whole response as one fragment.
    async fn stream(&self, request: &CompletionRequest) -> Result<TokenStream> {
        let text = self.complete(request).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Gemini through rig-core.
pub struct RigGemini {
    client: Client,
}

impl RigGemini {
    pub fn new(api_key: &ApiKey) -> Self {
        Self {
            client: Client::from_val(GeminiApiKey::from(api_key.expose())),
        }
    }
}

#[async_trait]
impl LanguageModel for RigGemini {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!(model = %request.model, temperature = request.temperature, "Calling Gemini");

        let agent = self
            .client
            .agent(&request.model)
            .temperature(request.temperature)
            .build();

        agent
            .prompt(request.prompt.as_str())
            .await
            .map_err(|e| ResearchError::Llm(format!("Gemini completion failed ({}): {}", request.model, e)))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
