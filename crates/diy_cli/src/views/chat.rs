//! Interactive chat shared by the planning and execution views.
//!
//! Reads lines from stdin and prints assistant replies as they arrive.
//! Lines starting with `/` are view actions; everything else is sent.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use diy_api::ClientConfig;
use diy_chat::{
    ChatError, EntryOrigin, MessageContext, SessionClient, SessionEvent, SessionState,
    WebSocketTransport,
};

use super::render;

const HELP: &str = "Commands: /generate (planning), /done (execution), /reconnect, /help, /quit";

/// The process's one line reader over stdin.
pub type StdinLines = Lines<BufReader<Stdin>>;

/// Open the stdin reader. Create it once and hand it to every prompt and
/// chat; a second buffered reader would swallow lines the first one read
/// ahead.
pub fn stdin_lines() -> StdinLines {
    BufReader::new(tokio::io::stdin()).lines()
}

/// What the user typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Generate,
    Done,
    Reconnect,
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if !trimmed.starts_with('/') {
            return Self::Message(line.to_string());
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "/generate" => Self::Generate,
            "/done" => Self::Done,
            "/reconnect" => Self::Reconnect,
            "/help" | "/?" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

/// View actions the owning command handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Generate,
    Done,
    Quit,
}

pub struct ChatView {
    session: SessionClient<WebSocketTransport>,
    events: broadcast::Receiver<SessionEvent>,
}

impl ChatView {
    /// Open a session and print what the transcript already holds.
    ///
    /// A failed connection is reported but not fatal; the user can
    /// `/reconnect`.
    pub async fn open(config: &ClientConfig, context: MessageContext, initial: Option<String>) -> Self {
        let transport = Arc::new(WebSocketTransport::new(config.ws_url.clone()));
        let session = SessionClient::new(transport, context, initial);
        let events = session.subscribe();

        for entry in session.transcript() {
            println!("{}", render::entry(&entry));
        }

        let view = Self { session, events };
        view.connect().await;
        view
    }

    pub fn session(&self) -> &SessionClient<WebSocketTransport> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionClient<WebSocketTransport> {
        &mut self.session
    }

    async fn connect(&self) {
        match self.session.connect().await {
            Ok(()) => println!("💬 Connected. {}", HELP),
            Err(e) => {
                warn!("{}", e);
                println!("🔌 Could not reach the assistant. Type /reconnect to try again.");
            }
        }
    }

    /// Run the chat until the user asks for a view action.
    ///
    /// End of input reads as `/quit`.
    pub async fn next_action<R>(&mut self, input: &mut Lines<R>) -> Result<ChatAction>
    where
        R: AsyncBufRead + Unpin,
    {
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Ok(event) => show_event(&event),
                    Err(RecvError::Lagged(skipped)) => debug!("Skipped {} session events", skipped),
                    Err(RecvError::Closed) => return Ok(ChatAction::Quit),
                },
                line = input.next_line() => {
                    let Some(line) = line? else {
                        return Ok(ChatAction::Quit);
                    };
                    match Input::parse(&line) {
                        Input::Message(text) => self.send(&text),
                        Input::Generate => return Ok(ChatAction::Generate),
                        Input::Done => return Ok(ChatAction::Done),
                        Input::Quit => return Ok(ChatAction::Quit),
                        Input::Reconnect => self.connect().await,
                        Input::Help => println!("{}", HELP),
                        Input::Unknown(cmd) => println!("Unknown command {}. {}", cmd, HELP),
                    }
                }
            }
        }
    }

    fn send(&self, text: &str) {
        match self.session.send(text) {
            Ok(()) => {}
            Err(ChatError::EmptyMessage) => {}
            Err(ChatError::NotReady {
                state: SessionState::AwaitingReply,
            }) => println!("⏳ Wait for the assistant to reply first."),
            Err(ChatError::NotReady { .. }) => {
                println!("🔌 Not connected. Type /reconnect to try again.")
            }
            Err(e) => warn!("{}", e),
        }
    }

    /// Leave the view: release handlers and close the connection.
    pub async fn close(mut self) {
        self.session.close().await;
    }
}

fn show_event(event: &SessionEvent) {
    match event {
        SessionEvent::EntryAppended(entry) if entry.origin == EntryOrigin::Assistant => {
            println!("{}", render::entry(entry));
        }
        SessionEvent::EntryAppended(_) => {}
        SessionEvent::StateChanged(SessionState::AwaitingReply) => println!("🤖 typing..."),
        SessionEvent::StateChanged(SessionState::Disconnected) => {
            println!("🔌 Disconnected. Type /reconnect to try again.")
        }
        SessionEvent::StateChanged(SessionState::ConnectedIdle) => {}
    }
}
