//! chatty chat command: an interactive terminal client
//!
//! Input lines:
//! - `@bob hello there` sends "hello there" to bob
//! - `/friends` lists who is online
//! - `/quit` (or end of input) logs out and exits

use anyhow::Result;
use chatty_core::Envelope;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::client::{ChattyClient, UsernameStatus};
use crate::config::ConfigLoader;

/// Arguments for the chat command
#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Name to chat as
    #[arg(short, long)]
    pub username: String,

    /// Relay base URL (defaults to client.server_url from config)
    #[arg(short, long)]
    pub server: Option<String>,
}

/// One parsed line of user input
#[derive(Debug, PartialEq, Eq)]
enum ChatInput {
    Message { receiver: String, payload: String },
    Friends,
    Quit,
    Empty,
    Invalid(String),
}

impl ChatInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        match line {
            "/quit" | "/exit" => return Self::Quit,
            "/friends" => return Self::Friends,
            _ => {}
        }

        let Some(rest) = line.strip_prefix('@') else {
            return Self::Invalid(format!(
                "Unrecognized input '{}'. Use @user message, /friends or /quit",
                line
            ));
        };

        match rest.split_once(char::is_whitespace) {
            Some((receiver, payload)) if !receiver.is_empty() && !payload.trim().is_empty() => {
                Self::Message {
                    receiver: receiver.to_string(),
                    payload: payload.trim().to_string(),
                }
            }
            _ => Self::Invalid("Usage: @user message".to_string()),
        }
    }
}

/// Run the chat command
pub async fn run(args: ChatArgs) -> Result<()> {
    let server_url = match args.server {
        Some(url) => url,
        None => ConfigLoader::load()?.client.server_url,
    };

    if ChattyClient::check_username(&server_url, &args.username).await? == UsernameStatus::Taken {
        anyhow::bail!("Username '{}' is already taken", args.username);
    }

    let mut client = ChattyClient::connect(&server_url, &args.username).await?;
    info!("Connected to {} as {}", server_url, args.username);
    println!("Connected as {}. Type @user message, /friends or /quit.", client.username());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            incoming = client.recv() => match incoming {
                Some(envelope) => println!("{}", format_incoming(&envelope)),
                None => {
                    println!("Disconnected from relay");
                    return Ok(());
                }
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match ChatInput::parse(&line) {
                    ChatInput::Message { receiver, payload } => {
                        client.send_chat(&local_time(), &receiver, &payload).await?;
                    }
                    ChatInput::Friends => match client.friends().await {
                        Ok(friends) if friends.is_empty() => println!("Nobody else is online"),
                        Ok(friends) => println!("Online: {}", friends.join(", ")),
                        Err(e) => eprintln!("{}", e),
                    },
                    ChatInput::Quit => break,
                    ChatInput::Empty => {}
                    ChatInput::Invalid(message) => eprintln!("{}", message),
                }
            }
        }
    }

    client.logout(&local_time()).await?;
    println!("Logged out");
    Ok(())
}

fn local_time() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

fn format_incoming(envelope: &Envelope) -> String {
    format!(
        "[{}] {}: {}",
        envelope.time, envelope.sender, envelope.payload
    )
}
