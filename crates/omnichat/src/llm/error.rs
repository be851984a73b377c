//! LLM error types.

use serde::de::DeserializeOwned;
use thiserror::Error;

use super::provider::Adapter;

/// Errors that can occur when making LLM API calls.
#[derive(Debug, Error)]
pub enum LLMError {
    /// HTTP request failed
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Vendor rejected the credential (401/403)
    #[error("authentication failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    /// API returned an error response
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited (429)
    #[error("rate limited{}: {message}", retry_hint(.retry_after))]
    RateLimit {
        retry_after: Option<u64>,
        message: String,
    },

    /// The conversation cannot be expressed in the vendor's format.
    #[error("invalid conversation: {0}")]
    InvalidConversation(String),

    /// The configured base URL and model do not form a usable endpoint.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A successful response did not carry the expected reply text.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Placeholder adapter with no vendor binding.
    #[error("{adapter} completions are not implemented")]
    NotImplemented { adapter: Adapter },
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl LLMError {
    /// Upstream HTTP status, when the failure came from a vendor response.
    pub fn status(&self) -> Option<u16> {
        match self {
            LLMError::Authentication { status, .. } | LLMError::Api { status, .. } => {
                Some(*status)
            }
            LLMError::RateLimit { .. } => Some(429),
            LLMError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Pass a successful response through, or turn a non-2xx one into an error.
///
/// The body is consumed for the error message, so nothing is parsed from a
/// failed response.
pub async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, LLMError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let message = response.text().await.unwrap_or_default();
    match code {
        429 => Err(LLMError::RateLimit {
            retry_after,
            message,
        }),
        401 | 403 => Err(LLMError::Authentication {
            status: code,
            message,
        }),
        _ => Err(LLMError::Api {
            status: code,
            message,
        }),
    }
}

/// Decode a successful response body.
///
/// A body that arrived but does not match the vendor's shape is
/// `InvalidResponse`; only a failure to read it stays a transport error.
pub async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LLMError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| LLMError::InvalidResponse(format!("undecodable response body: {e}")))
}
