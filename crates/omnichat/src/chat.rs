//! Interactive terminal chat.

use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use tracing::debug;

use crate::llm::{CompletionError, Credential, Dispatcher, Message};

/// One conversation with a fixed provider and model.
///
/// The history always alternates user/assistant after the optional system
/// prompt: a failed turn is removed again.
pub struct ChatSession {
    provider: String,
    model: String,
    credential: Credential,
    system: Option<String>,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        credential: Credential,
        system: Option<String>,
    ) -> Self {
        let mut session = Self {
            provider: provider.into(),
            model: model.into(),
            credential,
            system,
            history: Vec::new(),
        };
        session.clear();
        session
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Drop every turn, keeping the system prompt.
    pub fn clear(&mut self) {
        self.history.clear();
        if let Some(system) = &self.system {
            self.history.push(Message::system(system.clone()));
        }
    }

    /// Append `text` as a user turn, dispatch, and record the reply.
    pub async fn send(
        &mut self,
        dispatcher: &Dispatcher,
        text: impl Into<String>,
    ) -> Result<String, CompletionError> {
        self.history.push(Message::user(text));

        match dispatcher
            .complete(&self.provider, &self.model, &self.history, &self.credential)
            .await
        {
            Ok(reply) => {
                self.history.push(Message::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }
}

/// Read lines until `/exit` or Ctrl-D, printing each reply.
pub async fn run(dispatcher: &Dispatcher, mut session: ChatSession) -> std::io::Result<()> {
    let mut line_editor = Reedline::create();
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(format!("{}/{}", session.provider, session.model)),
        DefaultPromptSegment::Empty,
    );

    println!("Type /clear to start over, /exit or Ctrl-D to quit.");

    loop {
        let line = match line_editor.read_line(&prompt)? {
            Signal::Success(line) => line,
            Signal::CtrlD => break,
            _ => continue,
        };

        let text = line.trim();
        match text {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                session.clear();
                println!("(history cleared)");
                continue;
            }
            _ => {}
        }

        match session.send(dispatcher, text).await {
            Ok(reply) => println!("\n{reply}\n"),
            Err(e) => eprintln!("error: {e}: {}", e.source),
        }
        debug!(turns = session.history().len(), "chat turn finished");
    }

    Ok(())
}
