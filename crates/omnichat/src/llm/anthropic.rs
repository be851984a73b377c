//! Anthropic LLM provider with native API format.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::{LLMError, decode_json, error_for_status};
use super::provider::{Adapter, LLMProvider};
use super::types::{ChatRequest, Credential, Role};

/// Anthropic provider with native API format.
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_version: String,
    max_tokens: u32,
    last_user_message_only: bool,
}

impl AnthropicProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";
    pub const DEFAULT_API_VERSION: &'static str = "2023-06-01";
    pub const DEFAULT_MAX_TOKENS: u32 = 1024;

    /// Create a provider that sends only the latest user message, with the
    /// last system message as the system prompt.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: Self::DEFAULT_API_VERSION.to_string(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            last_user_message_only: true,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// When `false`, the whole user/assistant history is sent instead of
    /// only the latest user turn. Leading assistant turns are dropped and
    /// adjacent turns with the same role are merged, since the Messages API
    /// requires a user-first, strictly alternating conversation.
    #[must_use]
    pub fn with_last_user_message_only(mut self, enabled: bool) -> Self {
        self.last_user_message_only = enabled;
        self
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn adapter(&self) -> Adapter {
        Adapter::Anthropic
    }

    async fn chat(
        &self,
        request: ChatRequest<'_>,
        credential: &Credential,
    ) -> Result<String, LLMError> {
        let anthropic_request =
            to_request(&request, self.max_tokens, self.last_user_message_only)?;
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", credential.expose())
            .header("anthropic-version", &self.api_version)
            .json(&anthropic_request)
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let anthropic_response: Response = decode_json(response).await?;
        from_response(anthropic_response)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, serde::Serialize)]
struct Request {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<RequestMessage>,
}

#[derive(Debug, PartialEq, Eq, serde::Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(serde::Deserialize)]
struct Response {
    id: Option<String>,
    #[serde(default)]
    content: Vec<ResponseContent>,
    stop_reason: Option<String>,
    usage: Option<ResponseUsage>,
}

#[derive(serde::Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(serde::Deserialize)]
struct ResponseUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// ============================================================================
// Conversions
// ============================================================================

/// Build the vendor request.
///
/// The last system message becomes `system`. With `last_user_message_only`,
/// earlier user turns and all assistant turns are dropped and only the most
/// recent user message is sent.
fn to_request(
    request: &ChatRequest<'_>,
    max_tokens: u32,
    last_user_message_only: bool,
) -> Result<Request, LLMError> {
    let mut system = String::new();
    let mut history = Vec::new();
    let mut user_turns = Vec::new();

    for msg in request.messages {
        match msg.role {
            Role::System => {
                system = msg.content.clone();
            }
            Role::User => {
                user_turns.push(msg.content.as_str());
                history.push(RequestMessage {
                    role: "user",
                    content: msg.content.clone(),
                });
            }
            Role::Assistant => {
                history.push(RequestMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                });
            }
        }
    }

    let Some(last_user) = user_turns.last() else {
        return Err(LLMError::InvalidConversation(
            "no user messages found".to_string(),
        ));
    };

    let messages = if last_user_message_only {
        if history.len() > 1 {
            debug!(
                dropped = history.len() - 1,
                "anthropic request truncated to the latest user message"
            );
        }
        vec![RequestMessage {
            role: "user",
            content: (*last_user).to_string(),
        }]
    } else {
        alternate(history)
    };

    Ok(Request {
        model: request.model.to_string(),
        max_tokens,
        system,
        messages,
    })
}

/// Drop assistant turns before the first user turn and merge adjacent
/// same-role turns, joined by a blank line.
fn alternate(history: Vec<RequestMessage>) -> Vec<RequestMessage> {
    let total = history.len();
    let mut merged: Vec<RequestMessage> = Vec::with_capacity(total);

    for msg in history.into_iter().skip_while(|m| m.role != "user") {
        if let Some(last) = merged.last_mut()
            && last.role == msg.role
        {
            last.content.push_str("\n\n");
            last.content.push_str(&msg.content);
        } else {
            merged.push(msg);
        }
    }

    if merged.len() < total {
        debug!(
            before = total,
            after = merged.len(),
            "anthropic history normalized to alternating turns"
        );
    }
    merged
}

fn from_response(response: Response) -> Result<String, LLMError> {
    if let Some(usage) = &response.usage {
        debug!(
            id = response.id.as_deref().unwrap_or_default(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "anthropic message usage"
        );
    }

    let texts: Vec<String> = response
        .content
        .into_iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text)
        .collect();

    if texts.is_empty() {
        return Err(LLMError::InvalidResponse(format!(
            "message has no text content (stop_reason: {})",
            response.stop_reason.as_deref().unwrap_or("none")
        )));
    }

    Ok(texts.join(""))
}
