//! Completion dispatcher: routes a provider tag to its adapter.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::anthropic::AnthropicProvider;
use super::error::LLMError;
use super::google::GoogleProvider;
use super::openai::OpenAICompatibleProvider;
use super::provider::{Adapter, LLMProvider, Provider, UnimplementedProvider};
use super::types::{ChatRequest, Credential, Message};
use crate::config::{Config, ProvidersConfig};

/// An adapter failure with the provider and adapter it came from.
#[derive(Debug, Error)]
#[error("{adapter} adapter failed for provider '{provider}'")]
pub struct CompletionError {
    pub provider: String,
    pub adapter: Adapter,
    #[source]
    pub source: LLMError,
}

/// Routes completions to one adapter per provider tag.
///
/// Holds only configuration and a shared HTTP client; routing has no state.
pub struct Dispatcher {
    openai: OpenAICompatibleProvider,
    anthropic: AnthropicProvider,
    google: GoogleProvider,
    perplexity: OpenAICompatibleProvider,
    meta: UnimplementedProvider,
    mistral: UnimplementedProvider,
    custom: BTreeMap<String, OpenAICompatibleProvider>,
    generic: UnimplementedProvider,
}

impl Dispatcher {
    pub fn new(client: Client, config: &ProvidersConfig) -> Self {
        let custom = config
            .custom
            .iter()
            .filter(|(tag, _)| {
                let shadowed = Provider::KNOWN.contains(&tag.as_str());
                if shadowed {
                    warn!(provider = %tag, "Ignoring custom provider that reuses a built-in tag");
                }
                !shadowed
            })
            .map(|(tag, endpoint)| {
                info!(provider = %tag, base_url = %endpoint.base_url, "Registered custom provider");
                let provider = OpenAICompatibleProvider::new(
                    client.clone(),
                    endpoint.base_url.clone(),
                    Adapter::Generic,
                );
                (tag.clone(), provider)
            })
            .collect();

        if !config.anthropic.last_user_message_only {
            info!("Anthropic adapter sends the full conversation history");
        }

        Self {
            openai: OpenAICompatibleProvider::new(
                client.clone(),
                config.openai.base_url.clone(),
                Adapter::OpenAI,
            ),
            anthropic: AnthropicProvider::new(client.clone(), config.anthropic.base_url.clone())
                .with_max_tokens(config.anthropic.max_tokens)
                .with_last_user_message_only(config.anthropic.last_user_message_only),
            google: GoogleProvider::new(client.clone(), config.google.base_url.clone()),
            perplexity: OpenAICompatibleProvider::new(
                client,
                config.perplexity.base_url.clone(),
                Adapter::Perplexity,
            ),
            meta: UnimplementedProvider::new(Adapter::Meta),
            mistral: UnimplementedProvider::new(Adapter::Mistral),
            custom,
            generic: UnimplementedProvider::new(Adapter::Generic),
        }
    }

    /// Build the HTTP client from `http` settings, then the dispatcher.
    pub fn from_config(config: &Config) -> Result<Self, LLMError> {
        let mut builder = Client::builder();
        if config.http.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(config.http.timeout_seconds));
        }
        Ok(Self::new(builder.build()?, &config.providers))
    }

    /// The adapter a provider is routed to. Performs no call.
    pub fn adapter_for(&self, provider: &Provider) -> &dyn LLMProvider {
        match provider {
            Provider::OpenAI => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Google => &self.google,
            Provider::Perplexity => &self.perplexity,
            Provider::Meta => &self.meta,
            Provider::Mistral => &self.mistral,
            Provider::Custom(tag) => match self.custom.get(tag) {
                Some(endpoint) => endpoint,
                None => &self.generic,
            },
        }
    }

    /// Custom tags with a configured endpoint.
    pub fn custom_providers(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }

    /// Produce the next assistant message for `conversation`.
    ///
    /// `model` is passed through unchecked. Failures are returned as-is with
    /// the provider and adapter attached; nothing is retried.
    pub async fn complete(
        &self,
        provider: &str,
        model: &str,
        conversation: &[Message],
        credential: &Credential,
    ) -> Result<String, CompletionError> {
        let parsed = Provider::parse(provider);
        let adapter = self.adapter_for(&parsed);
        let request = ChatRequest {
            model,
            messages: conversation,
        };

        debug!(
            provider,
            adapter = %adapter.adapter(),
            model,
            messages = conversation.len(),
            "dispatching completion"
        );

        adapter
            .chat(request, credential)
            .await
            .inspect_err(|e| {
                warn!(provider, adapter = %adapter.adapter(), error = %e, "completion failed");
            })
            .map_err(|source| CompletionError {
                provider: provider.to_string(),
                adapter: adapter.adapter(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    fn dispatcher() -> Dispatcher {
        let mut config = ProvidersConfig::default();
        config.custom.insert(
            "groq".to_string(),
            EndpointConfig {
                base_url: "http://127.0.0.1:9/openai/v1".to_string(),
            },
        );
        Dispatcher::new(Client::new(), &config)
    }

    #[test]
    fn routing_is_total() {
        let dispatcher = dispatcher();
        let cases = [
            ("openai", Adapter::OpenAI),
            ("anthropic", Adapter::Anthropic),
            ("google", Adapter::Google),
            ("perplexity", Adapter::Perplexity),
            ("meta", Adapter::Meta),
            ("llama", Adapter::Meta),
            ("mistral", Adapter::Mistral),
            ("groq", Adapter::Generic),
            ("my-gateway", Adapter::Generic),
            ("", Adapter::Generic),
        ];

        for (tag, expected) in cases {
            let routed = dispatcher.adapter_for(&Provider::parse(tag)).adapter();
            assert_eq!(routed, expected, "tag {tag:?}");
        }
    }

    #[test]
    fn routing_is_idempotent() {
        let dispatcher = dispatcher();
        for tag in Provider::KNOWN.iter().copied().chain(["groq", "unknown"]) {
            let provider = Provider::parse(tag);
            let first = dispatcher.adapter_for(&provider) as *const dyn LLMProvider;
            let second = dispatcher.adapter_for(&provider) as *const dyn LLMProvider;
            assert!(std::ptr::addr_eq(first, second), "tag {tag}");
        }
    }

    #[test]
    fn configured_custom_tags_are_listed() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.custom_providers().collect::<Vec<_>>(), vec!["groq"]);
    }

    #[test]
    fn custom_entries_cannot_shadow_built_in_tags() {
        let mut config = ProvidersConfig::default();
        for tag in ["openai", "llama", "mistral", "local"] {
            config.custom.insert(
                tag.to_string(),
                EndpointConfig {
                    base_url: "http://127.0.0.1:9/v1".to_string(),
                },
            );
        }
        let dispatcher = Dispatcher::new(Client::new(), &config);

        assert_eq!(dispatcher.custom_providers().collect::<Vec<_>>(), vec!["local"]);
        assert_eq!(
            dispatcher.adapter_for(&Provider::parse("mistral")).adapter(),
            Adapter::Mistral
        );
        assert_eq!(
            dispatcher.adapter_for(&Provider::parse("openai")).adapter(),
            Adapter::OpenAI
        );
    }

    #[tokio::test]
    async fn meta_and_mistral_are_not_implemented() {
        let dispatcher = dispatcher();
        let conversation = vec![Message::system("S"), Message::user("hello")];

        for tag in ["meta", "llama", "mistral"] {
            let err = dispatcher
                .complete(tag, "any-model", &conversation, &Credential::new("key"))
                .await
                .unwrap_err();
            assert_eq!(err.provider, tag);
            assert!(
                matches!(err.source, LLMError::NotImplemented { .. }),
                "tag {tag}: {err}"
            );
        }

        let err = dispatcher
            .complete("mistral", "", &[], &Credential::default())
            .await
            .unwrap_err();
        assert_eq!(err.adapter, Adapter::Mistral);
    }

    #[tokio::test]
    async fn unconfigured_custom_provider_is_not_implemented() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .complete(
                "self-hosted",
                "local-model",
                &[Message::user("hi")],
                &Credential::new("key"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.adapter, Adapter::Generic);
        assert!(matches!(
            err.source,
            LLMError::NotImplemented {
                adapter: Adapter::Generic
            }
        ));
        assert_eq!(
            err.to_string(),
            "generic adapter failed for provider 'self-hosted'"
        );
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("generic completions are not implemented".to_string())
        );
    }

    #[tokio::test]
    async fn anthropic_without_user_turns_fails_locally() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .complete(
                "anthropic",
                "claude-3-5-haiku-latest",
                &[Message::system("S"), Message::assistant("B")],
                &Credential::new("key"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.adapter, Adapter::Anthropic);
        assert!(matches!(err.source, LLMError::InvalidConversation(_)));
    }
}
