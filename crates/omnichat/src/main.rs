use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use omnichat::chat::{self, ChatSession};
use omnichat::config::Config;
use omnichat::llm::{Credential, Dispatcher, Message, Provider};
use omnichat::server::{self, AppState};

#[derive(Parser)]
#[command(name = "omnichat", version, about = "Chat with any LLM vendor from one place")]
struct Cli {
    /// Path to the YAML config file. A missing file means defaults.
    #[arg(short, long, global = true, default_value = "omnichat.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message and print the reply.
    Send {
        #[command(flatten)]
        target: Target,
        /// The user message.
        message: String,
    },
    /// Start an interactive chat.
    Chat {
        #[command(flatten)]
        target: Target,
    },
    /// Serve the completion API over HTTP.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct Target {
    /// Provider tag (openai, anthropic, google, perplexity, meta, mistral, or a custom tag).
    #[arg(short, long)]
    provider: String,
    /// Model name, passed to the vendor unchanged.
    #[arg(short, long)]
    model: String,
    /// System prompt.
    #[arg(short, long)]
    system: Option<String>,
    /// API key. Defaults to the `<PROVIDER>_API_KEY` environment variable.
    #[arg(long)]
    api_key: Option<String>,
}

impl Target {
    fn credential(&self) -> Credential {
        if let Some(key) = &self.api_key {
            return Credential::new(key.clone());
        }
        let var = Provider::parse(&self.provider).credential_env_var();
        match std::env::var(&var) {
            Ok(key) => Credential::new(key),
            Err(_) => {
                warn!(provider = %self.provider, env = %var, "no API key found, sending the request without one");
                Credential::default()
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("omnichat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let dispatcher = Dispatcher::from_config(&config).context("building HTTP client")?;

    match cli.command {
        Command::Send { target, message } => {
            let credential = target.credential();
            let mut conversation = Vec::new();
            if let Some(system) = target.system {
                conversation.push(Message::system(system));
            }
            conversation.push(Message::user(message));

            let reply = dispatcher
                .complete(&target.provider, &target.model, &conversation, &credential)
                .await?;
            println!("{reply}");
        }
        Command::Chat { target } => {
            let credential = target.credential();
            let session = ChatSession::new(target.provider, target.model, credential, target.system);
            chat::run(&dispatcher, session).await.context("reading input")?;
        }
        Command::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            let state = AppState {
                dispatcher: Arc::new(dispatcher),
            };
            server::serve(state, &host, port, config.server.request_timeout_seconds)
                .await
                .with_context(|| format!("serving on {host}:{port}"))?;
        }
    }

    Ok(())
}
