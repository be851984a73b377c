use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::{AnthropicProvider, GoogleProvider, OpenAICompatibleProvider, Provider};

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Self = serde_saphyr::from_str(&contents)?;
        config.providers.validate()?;
        Ok(config)
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    300
}

// ============================================================================
// HttpConfig
// ============================================================================

/// Outbound HTTP client settings.
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout for vendor calls. `0` disables it.
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
        }
    }
}

fn default_http_timeout() -> u64 {
    120
}

// ============================================================================
// ProvidersConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai")]
    pub openai: EndpointConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
    #[serde(default = "default_google")]
    pub google: EndpointConfig,
    #[serde(default = "default_perplexity")]
    pub perplexity: EndpointConfig,
    /// OpenAI-compatible endpoints keyed by provider tag.
    #[serde(default)]
    pub custom: BTreeMap<String, EndpointConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            anthropic: AnthropicConfig::default(),
            google: default_google(),
            perplexity: default_perplexity(),
            custom: BTreeMap::new(),
        }
    }
}

impl ProvidersConfig {
    /// A custom entry under a built-in tag could never be routed to.
    fn validate(&self) -> Result<(), ConfigError> {
        match self
            .custom
            .keys()
            .find(|tag| Provider::KNOWN.contains(&tag.as_str()))
        {
            Some(tag) => Err(ConfigError::ShadowedProvider(tag.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
}

fn default_openai() -> EndpointConfig {
    EndpointConfig {
        base_url: OpenAICompatibleProvider::OPENAI_BASE_URL.to_string(),
    }
}

fn default_google() -> EndpointConfig {
    EndpointConfig {
        base_url: GoogleProvider::DEFAULT_BASE_URL.to_string(),
    }
}

fn default_perplexity() -> EndpointConfig {
    EndpointConfig {
        base_url: OpenAICompatibleProvider::PERPLEXITY_BASE_URL.to_string(),
    }
}

// ============================================================================
// AnthropicConfig
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_anthropic_max_tokens")]
    pub max_tokens: u32,
    /// Send only the latest user message. Earlier turns are dropped.
    #[serde(default = "default_true")]
    pub last_user_message_only: bool,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            max_tokens: default_anthropic_max_tokens(),
            last_user_message_only: true,
        }
    }
}

fn default_anthropic_base_url() -> String {
    AnthropicProvider::DEFAULT_BASE_URL.to_string()
}

fn default_anthropic_max_tokens() -> u32 {
    AnthropicProvider::DEFAULT_MAX_TOKENS
}

fn default_true() -> bool {
    true
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),

    #[error("custom provider '{0}' reuses a built-in provider tag")]
    ShadowedProvider(String),
}

// ============================================================================
// Tests
// ============================================================================
