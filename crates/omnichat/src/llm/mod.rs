//! LLM provider adapters and the completion dispatcher.

mod anthropic;
mod dispatcher;
mod error;
mod google;
mod openai;
mod provider;
mod types;

pub use anthropic::AnthropicProvider;
pub use dispatcher::{CompletionError, Dispatcher};
pub use error::LLMError;
pub use google::GoogleProvider;
pub use openai::OpenAICompatibleProvider;
pub use provider::{Adapter, LLMProvider, Provider, UnimplementedProvider};
pub use types::{ChatRequest, Credential, Message, Role};
