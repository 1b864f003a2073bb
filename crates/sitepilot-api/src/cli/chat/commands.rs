//! Slash commands for the chat loop.

use console::style;

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    Help,
    Clear,
    Exit,
    /// Start a fresh conversation.
    New,
    /// Toggle streamed copy drafting.
    Stream,
    /// Show the conversation and site ids.
    Info,
    Unknown(String),
}

/// Parse input as a slash command; `None` for an ordinary message.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let cmd = trimmed.split_whitespace().next().unwrap_or(trimmed).to_lowercase();

    Some(match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/new" => ChatCommand::New,
        "/stream" => ChatCommand::Stream,
        "/info" => ChatCommand::Info,
        other => ChatCommand::Unknown(other.to_string()),
    })
}

pub fn help_text() -> String {
    let rows = [
        ("/help", "Show this help"),
        ("/info", "Show the conversation and site ids"),
        ("/stream", "Toggle live drafting of section copy"),
        ("/new", "Start a new conversation"),
        ("/clear", "Clear the screen"),
        ("/exit", "Leave the chat"),
    ];
    let mut out = String::from("\n");
    for (cmd, desc) in rows {
        out.push_str(&format!("  {:<10} {}\n", style(cmd).cyan(), style(desc).dim()));
    }
    out
}
