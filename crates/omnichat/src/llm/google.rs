//! Google Gemini provider (`generateContent`).

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{LLMError, decode_json, error_for_status};
use super::provider::{Adapter, LLMProvider};
use super::types::{ChatRequest, Credential, Message, Role};

/// Gemini provider using the REST `generateContent` endpoint.
pub struct GoogleProvider {
    client: Client,
    base_url: String,
}

impl GoogleProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";

    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LLMProvider for GoogleProvider {
    fn adapter(&self) -> Adapter {
        Adapter::Google
    }

    async fn chat(
        &self,
        request: ChatRequest<'_>,
        credential: &Credential,
    ) -> Result<String, LLMError> {
        let url = endpoint(&self.base_url, request.model)?;
        let body = GenerateContentRequest {
            contents: to_contents(request.messages),
        };

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", credential.expose())
            .json(&body)
            .send()
            .await?;

        let response = error_for_status(response).await?;
        let body: GenerateContentResponse = decode_json(response).await?;
        from_response(body)
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

// ============================================================================
// Conversions
// ============================================================================

/// `{base}/v1beta/models/{model}:generateContent`.
///
/// Gemini resource names carry a `models/` prefix, which is accepted and
/// stripped. The rest of the model name is one percent-encoded path segment.
fn endpoint(base_url: &str, model: &str) -> Result<Url, LLMError> {
    let model = model.strip_prefix("models/").unwrap_or(model);
    let mut url = Url::parse(base_url)
        .map_err(|e| LLMError::InvalidEndpoint(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| LLMError::InvalidEndpoint(format!("{base_url}: cannot be a base URL")))?
        .pop_if_empty()
        .extend(["v1beta", "models"])
        .push(&format!("{model}:generateContent"));
    Ok(url)
}

/// `user` stays `user`, `assistant` becomes `model`. Gemini has no system
/// role in `contents`, so system messages are left out.
fn to_content(message: &Message) -> Option<Content> {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "model",
        Role::System => return None,
    };
    Some(Content {
        role,
        parts: vec![Part {
            text: message.content.clone(),
        }],
    })
}

fn to_contents(messages: &[Message]) -> Vec<Content> {
    let contents: Vec<Content> = messages.iter().filter_map(to_content).collect();
    let dropped = messages.len() - contents.len();
    if dropped > 0 {
        debug!(dropped, "system messages left out of gemini request");
    }
    contents
}

fn from_response(response: GenerateContentResponse) -> Result<String, LLMError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "none".to_string());
        return Err(LLMError::InvalidResponse(format!(
            "response contained no candidates (block_reason: {reason})"
        )));
    };

    let texts: Vec<String> = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if texts.is_empty() {
        return Err(LLMError::InvalidResponse(format!(
            "candidate has no text parts (finish_reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("none")
        )));
    }

    Ok(texts.join(""))
}
