//! Interactive chat REPL and one-shot account commands.

use crate::config::Config;
use anyhow::{Context, Result};
use beso_chat::{
    ChatError, ChatSession, CredentialStore, InstantAnswerClient, Notice, ResponseDispatcher,
    Screen, TesseractOcr,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Register { username: String, password: String },
    Login { username: String, password: String },
    Recover { username: String },
    Clear,
    Logout,
    Import(PathBuf),
    Quit,
    Help,
    /// Anything that is not a slash command goes to the bot verbatim.
    Message(String),
    /// A slash command with missing or unknown arguments.
    Invalid(String),
}

const USAGE: &str = "\
Commands:
  /register <username> <password>
  /login <username> <password>
  /recover <username>
  /import <path>      send an image (OCR) or text file
  /clear              clear the conversation
  /logout
  /quit
Anything else is sent to the bot.";

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match (name, args.as_slice()) {
            ("register", [username, password]) => Self::Register {
                username: username.to_string(),
                password: password.to_string(),
            },
            ("login", [username, password]) => Self::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
            ("recover", [username]) => Self::Recover {
                username: username.to_string(),
            },
            ("import", [_, ..]) => {
                // Paths may contain spaces; take everything after the command.
                let path = rest.trim_start()["import".len()..].trim();
                Self::Import(PathBuf::from(path))
            }
            ("clear", []) => Self::Clear,
            ("logout", []) => Self::Logout,
            ("quit" | "exit", []) => Self::Quit,
            ("help", _) => Self::Help,
            _ => Self::Invalid(line.to_string()),
        }
    }
}

pub fn open_session(config: &Config) -> Result<ChatSession> {
    let store = CredentialStore::open(&config.db_path)
        .with_context(|| format!("opening credential store {}", config.db_path.display()))?;
    let answers = InstantAnswerClient::new().with_endpoint(config.answer_endpoint.clone());
    Ok(ChatSession::new(
        store,
        ResponseDispatcher::new(Box::new(answers)),
        Box::new(TesseractOcr::new(config.tesseract.clone())),
    ))
}

pub async fn run_repl(config: &Config) -> Result<()> {
    let mut session = open_session(config)?;
    println!("{USAGE}\n");
    println!("{}", session.render_transcript());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match ReplCommand::parse(&line) {
            ReplCommand::Quit => break,
            command => {
                if let Err(e) = execute(&mut session, command).await {
                    println!("Error: {e}");
                }
            }
        }
    }

    Ok(())
}

async fn execute(session: &mut ChatSession, command: ReplCommand) -> Result<(), ChatError> {
    match command {
        ReplCommand::Register { username, password } => {
            print_notice(&session.register(&username, &password)?);
        }
        ReplCommand::Login { username, password } => {
            print_notice(&session.login(&username, &password)?);
            if session.screen() == Screen::Chat {
                println!("{}", session.render_transcript());
            }
        }
        ReplCommand::Recover { username } => print_notice(&session.recover(&username)?),
        ReplCommand::Clear => {
            session.clear();
            println!("{}", session.render_transcript());
        }
        ReplCommand::Logout => {
            session.logout();
            println!("Logged out.");
        }
        ReplCommand::Import(path) => {
            let turn = session.import_file(&path)?;
            println!("{turn}");
        }
        ReplCommand::Message(text) => {
            let reply = session.send(&text).await?;
            println!("{}: {reply}", beso_chat::session::BOT_NAME);
            if !session.is_input_enabled() {
                println!("(conversation ended; /logout to start over or /quit)");
            }
        }
        ReplCommand::Help => println!("{USAGE}"),
        ReplCommand::Invalid(line) => println!("Unrecognized command: {line}\n{USAGE}"),
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn print_notice(notice: &Notice) {
    println!("[{}] {}", notice.title, notice.message);
}

/// `beso register`: add an account without entering the REPL.
pub fn register(config: &Config, username: &str, password: &str) -> Result<()> {
    let mut session = open_session(config)?;
    let notice = session.register(username, password)?;
    print_notice(&notice);
    anyhow::ensure!(notice.success, "registration failed");
    Ok(())
}

/// `beso recover`: print the stored password for a user.
pub fn recover(config: &Config, username: &str) -> Result<()> {
    let mut session = open_session(config)?;
    let notice = session.recover(username)?;
    print_notice(&notice);
    anyhow::ensure!(notice.success, "recovery failed");
    Ok(())
}

/// `beso ask`: one dispatcher reply, no login required.
pub async fn ask(config: &Config, question: &str) -> Result<()> {
    let answers = InstantAnswerClient::new().with_endpoint(config.answer_endpoint.clone());
    let reply = ResponseDispatcher::new(Box::new(answers)).respond(question).await;
    println!("{reply}");
    Ok(())
}
