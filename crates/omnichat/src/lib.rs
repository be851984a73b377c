//! Omnichat - one chat abstraction over many LLM vendor APIs.

pub mod chat;
pub mod config;
pub mod handlers;
pub mod llm;
pub mod server;

mod response;
