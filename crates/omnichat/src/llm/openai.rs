//! OpenAI-compatible LLM provider.
//!
//! Serves OpenAI, Perplexity, and any configured custom endpoint that speaks
//! the same `/chat/completions` format.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::{LLMError, decode_json, error_for_status};
use super::provider::{Adapter, LLMProvider};
use super::types::{ChatRequest, ChatResponse, Credential};

/// OpenAI-compatible provider.
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    adapter: Adapter,
}

impl OpenAICompatibleProvider {
    pub const OPENAI_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const PERPLEXITY_BASE_URL: &'static str = "https://api.perplexity.ai";

    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, adapter: Adapter) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            adapter,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn adapter(&self) -> Adapter {
        self.adapter
    }

    async fn chat(
        &self,
        request: ChatRequest<'_>,
        credential: &Credential,
    ) -> Result<String, LLMError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", credential.expose()))
            .json(&request)
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let body: ChatResponse = decode_json(response).await?;
        first_choice_text(body)
    }
}

/// The first choice's message content is the reply.
fn first_choice_text(response: ChatResponse) -> Result<String, LLMError> {
    if let Some(usage) = &response.usage {
        debug!(
            id = response.id.as_deref().unwrap_or_default(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "chat completion usage"
        );
    }

    let Some(choice) = response.choices.into_iter().next() else {
        return Err(LLMError::InvalidResponse(
            "response contained no choices".to_string(),
        ));
    };

    choice.message.content.ok_or_else(|| {
        LLMError::InvalidResponse(format!(
            "first choice has no text content (finish_reason: {})",
            choice.finish_reason.as_deref().unwrap_or("none")
        ))
    })
}
