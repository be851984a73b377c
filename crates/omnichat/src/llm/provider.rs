//! Provider tags, adapter kinds, and the adapter trait.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use super::error::LLMError;
use super::types::{ChatRequest, Credential};

/// Trait for LLM providers with different API formats.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Which adapter this is, for routing checks and error context.
    fn adapter(&self) -> Adapter;

    /// Make a chat completion request and return the reply text.
    async fn chat(
        &self,
        request: ChatRequest<'_>,
        credential: &Credential,
    ) -> Result<String, LLMError>;
}

/// A provider tag as chosen per chat.
///
/// Parsing never fails: unknown tags become [`Provider::Custom`] and are
/// served by the generic OpenAI-compatible adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Google,
    Perplexity,
    /// Accepts both `meta` and `llama`.
    Meta,
    Mistral,
    Custom(String),
}

impl Provider {
    /// Tags with a dedicated adapter.
    pub const KNOWN: &'static [&'static str] = &[
        "openai",
        "anthropic",
        "google",
        "perplexity",
        "meta",
        "llama",
        "mistral",
    ];

    pub fn parse(tag: &str) -> Self {
        match tag {
            "openai" => Provider::OpenAI,
            "anthropic" => Provider::Anthropic,
            "google" => Provider::Google,
            "perplexity" => Provider::Perplexity,
            "meta" | "llama" => Provider::Meta,
            "mistral" => Provider::Mistral,
            other => Provider::Custom(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Perplexity => "perplexity",
            Provider::Meta => "meta",
            Provider::Mistral => "mistral",
            Provider::Custom(tag) => tag,
        }
    }

    /// The adapter that serves this provider.
    pub fn adapter(&self) -> Adapter {
        match self {
            Provider::OpenAI => Adapter::OpenAI,
            Provider::Anthropic => Adapter::Anthropic,
            Provider::Google => Adapter::Google,
            Provider::Perplexity => Adapter::Perplexity,
            Provider::Meta => Adapter::Meta,
            Provider::Mistral => Adapter::Mistral,
            Provider::Custom(_) => Adapter::Generic,
        }
    }

    /// Environment variable the CLI reads the API key from, e.g. `OPENAI_API_KEY`.
    pub fn credential_env_var(&self) -> String {
        let prefix: String = self
            .tag()
            .chars()
            .map(|c| match c {
                '-' | '.' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("{prefix}_API_KEY")
    }
}

impl FromStr for Provider {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// The per-vendor translation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Adapter {
    OpenAI,
    Anthropic,
    Google,
    Perplexity,
    Meta,
    Mistral,
    Generic,
}

impl Adapter {
    pub fn name(self) -> &'static str {
        match self {
            Adapter::OpenAI => "openai",
            Adapter::Anthropic => "anthropic",
            Adapter::Google => "google",
            Adapter::Perplexity => "perplexity",
            Adapter::Meta => "meta",
            Adapter::Mistral => "mistral",
            Adapter::Generic => "generic",
        }
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Adapter with no vendor binding yet. Every call fails with
/// [`LLMError::NotImplemented`].
pub struct UnimplementedProvider {
    adapter: Adapter,
}

impl UnimplementedProvider {
    pub fn new(adapter: Adapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl LLMProvider for UnimplementedProvider {
    fn adapter(&self) -> Adapter {
        self.adapter
    }

    async fn chat(
        &self,
        _request: ChatRequest<'_>,
        _credential: &Credential,
    ) -> Result<String, LLMError> {
        Err(LLMError::NotImplemented {
            adapter: self.adapter,
        })
    }
}
