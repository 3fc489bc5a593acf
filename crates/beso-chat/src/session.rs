//! Chat session state: account screen, transcript, and file import.
//!
//! Frontends drive a [`ChatSession`] and render its notices and transcript;
//! nothing here knows about widgets or terminals.

use crate::dispatcher::{ResponseDispatcher, FAREWELL};
use crate::ocr::{OcrError, TextRecognizer};
use crate::store::{CredentialStore, StoreError};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const BOT_NAME: &str = "Beso Chatbot";
pub const WELCOME: &str = "Hello! I am Beso Chatbot. Type 'bye' to exit.";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "pdf", "docx"];

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("log in before chatting")]
    NotLoggedIn,
    #[error("the conversation has ended; log out to start over")]
    InputDisabled,
    #[error("unsupported file type: {0}")]
    UnsupportedFile(PathBuf),
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("text recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Bot,
}

/// How a user turn entered the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Typed,
    Image,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    pub origin: Origin,
}

impl ConversationTurn {
    fn bot(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.into(),
            origin: Origin::Typed,
        }
    }

    fn user(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            origin,
        }
    }
}

impl fmt::Display for ConversationTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.speaker, self.origin) {
            (Speaker::Bot, _) => write!(f, "{BOT_NAME}: {}", self.text),
            (Speaker::User, Origin::Typed) => write!(f, "You: {}", self.text),
            (Speaker::User, Origin::Image) => write!(f, "You (from image): {}", self.text),
            (Speaker::User, Origin::File) => write!(f, "You (from file): {}", self.text),
        }
    }
}

/// Outcome of an account action, phrased for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub success: bool,
    pub title: String,
    pub message: String,
}

impl Notice {
    fn ok(title: &str, message: impl Into<String>) -> Self {
        Self {
            success: true,
            title: title.to_string(),
            message: message.into(),
        }
    }

    fn failed(title: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

pub struct ChatSession {
    store: CredentialStore,
    dispatcher: ResponseDispatcher,
    ocr: Box<dyn TextRecognizer>,
    screen: Screen,
    user: Option<String>,
    input_enabled: bool,
    transcript: Vec<ConversationTurn>,
}

impl ChatSession {
    pub fn new(
        store: CredentialStore,
        dispatcher: ResponseDispatcher,
        ocr: Box<dyn TextRecognizer>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            ocr,
            screen: Screen::Login,
            user: None,
            input_enabled: true,
            transcript: vec![ConversationTurn::bot(WELCOME)],
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    pub fn render_transcript(&self) -> String {
        self.transcript
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn register(&mut self, username: &str, password: &str) -> Result<Notice, ChatError> {
        if self.store.register(username, password)? {
            Ok(Notice::ok(
                "Registration successful",
                "You can now login with your credentials",
            ))
        } else {
            Ok(Notice::failed("Registration failed", "Username already exists"))
        }
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<Notice, ChatError> {
        if !self.store.authenticate(username, password)? {
            tracing::info!(username, "login rejected");
            return Ok(Notice::failed("Login failed", "Invalid username or password"));
        }

        tracing::info!(username, "logged in");
        self.user = Some(username.to_string());
        self.screen = Screen::Chat;
        Ok(Notice::ok("Login successful", format!("Welcome, {username}!")))
    }

    pub fn recover(&mut self, username: &str) -> Result<Notice, ChatError> {
        match self.store.recover(username)? {
            Some(password) => Ok(Notice::ok(
                "Password Recovery",
                format!("Your password is: {password}"),
            )),
            None => Ok(Notice::failed("Recovery failed", "Username not found")),
        }
    }

    /// Send one message and return the bot's reply.
    ///
    /// A message that is exactly "bye" (any case) ends the conversation:
    /// the farewell is appended and further input is refused until logout.
    pub async fn send(&mut self, message: &str) -> Result<String, ChatError> {
        self.ensure_input()?;

        if message.to_lowercase() == "bye" {
            self.transcript.push(ConversationTurn::bot(FAREWELL));
            self.input_enabled = false;
            tracing::info!(user = ?self.user, "conversation ended");
            return Ok(FAREWELL.to_string());
        }

        let reply = self.dispatcher.respond(message).await;
        self.transcript.push(ConversationTurn::user(message, Origin::Typed));
        self.transcript.push(ConversationTurn::bot(reply.clone()));
        Ok(reply)
    }

    /// Import an image (through OCR) or a text file as a user turn.
    ///
    /// Only needs a logged-in user: imports still work after "bye" has
    /// closed the text input.
    pub fn import_file(&mut self, path: &Path) -> Result<ConversationTurn, ChatError> {
        if self.screen != Screen::Chat {
            return Err(ChatError::NotLoggedIn);
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let turn = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            let text = self.ocr.recognize(path)?;
            ConversationTurn::user(text, Origin::Image)
        } else if TEXT_EXTENSIONS.contains(&extension.as_str()) {
            let text = std::fs::read_to_string(path).map_err(|source| ChatError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
            ConversationTurn::user(text, Origin::File)
        } else {
            return Err(ChatError::UnsupportedFile(path.to_path_buf()));
        };

        tracing::info!(path = %path.display(), origin = ?turn.origin, "file imported");
        self.transcript.push(turn.clone());
        Ok(turn)
    }

    /// Reset the transcript to the welcome line.
    pub fn clear(&mut self) {
        self.transcript = vec![ConversationTurn::bot(WELCOME)];
    }

    /// Back to the login screen with input re-enabled and an empty transcript.
    pub fn logout(&mut self) {
        tracing::info!(user = ?self.user, "logged out");
        self.user = None;
        self.screen = Screen::Login;
        self.input_enabled = true;
        self.clear();
    }

    fn ensure_input(&self) -> Result<(), ChatError> {
        if self.screen != Screen::Chat {
            return Err(ChatError::NotLoggedIn);
        }
        if !self.input_enabled {
            return Err(ChatError::InputDisabled);
        }
        Ok(())
    }
}
