//! The interactive chat loop.
//!
//! Each line is one message turn against the local database. The site id the
//! co-pilot reports is carried into later turns so a resumed conversation
//! keeps working on the same site.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline_async::SharedWriter;
use tokio_util::sync::CancellationToken;

use sitepilot_core::orchestrator::TurnInput;
use sitepilot_types::conversation::ConversationId;
use sitepilot_types::site::SiteId;
use sitepilot_types::turn::{StreamRecord, TurnResponse};

use crate::state::AppState;

use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

pub struct ChatOptions {
    pub conversation_id: Option<ConversationId>,
    pub site_id: Option<SiteId>,
    /// Acts as the verified user for release operations.
    pub user_id: Option<String>,
    pub stream: bool,
}

pub async fn run_chat_loop(state: &AppState, options: ChatOptions) -> anyhow::Result<()> {
    let mut conversation_id = options.conversation_id.unwrap_or_default();
    let mut site_id = options.site_id;
    let mut stream = options.stream;

    let (mut input, mut out) = ChatInput::new(format!("{} ", style("you ›").green().bold()))?;

    writeln!(out)?;
    writeln!(out, "  {} SitePilot", style("⚡").bold())?;
    writeln!(
        out,
        "  {}",
        style(format!("conversation {conversation_id} · /help for commands")).dim()
    )?;
    writeln!(out)?;

    loop {
        let line = match input.read_line().await {
            InputEvent::Message(line) => line,
            InputEvent::Eof | InputEvent::Interrupted => break,
        };
        if line.is_empty() {
            continue;
        }

        if let Some(command) = commands::parse(&line) {
            match command {
                ChatCommand::Help => write!(out, "{}", commands::help_text())?,
                ChatCommand::Clear => input.clear(),
                ChatCommand::Exit => break,
                ChatCommand::New => {
                    conversation_id = ConversationId::new();
                    site_id = None;
                    writeln!(out, "  {}", style(format!("new conversation {conversation_id}")).dim())?;
                }
                ChatCommand::Stream => {
                    stream = !stream;
                    let label = if stream { "on" } else { "off" };
                    writeln!(out, "  {}", style(format!("live drafting {label}")).dim())?;
                }
                ChatCommand::Info => {
                    writeln!(out, "  conversation: {conversation_id}")?;
                    match site_id {
                        Some(id) => writeln!(out, "  site:         {id}")?,
                        None => writeln!(out, "  site:         {}", style("none yet").dim())?,
                    }
                }
                ChatCommand::Unknown(cmd) => {
                    writeln!(out, "  {} Unknown command {cmd}; try /help", style("!").yellow().bold())?;
                }
            }
            continue;
        }

        let turn = TurnInput {
            conversation_id,
            message: line,
            user_id: options.user_id.clone(),
            site_id,
            scope: None,
        };

        let result = if stream {
            streamed_turn(state, turn, &mut out).await
        } else {
            blocking_turn(state, turn).await
        };

        match result {
            Ok(response) => {
                if let Some(id) = reported_site(&response) {
                    site_id = Some(id);
                }
                render_response(&mut out, &response)?;
            }
            Err(e) => {
                tracing::debug!(error = %e, "turn failed");
                writeln!(out, "\n  {} {e}\n", style("✗").red().bold())?;
            }
        }
    }

    input.flush();
    Ok(())
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

async fn blocking_turn(state: &AppState, turn: TurnInput) -> anyhow::Result<TurnResponse> {
    let spinner = spinner();
    let result = state.orchestrator.handle_turn(turn).await;
    spinner.finish_and_clear();
    Ok(result?)
}

/// Print field patches as they arrive. Ctrl+C abandons the draft.
async fn streamed_turn(
    state: &AppState,
    turn: TurnInput,
    out: &mut SharedWriter,
) -> anyhow::Result<TurnResponse> {
    let cancel = CancellationToken::new();
    let mut records = Box::pin(Arc::clone(&state.orchestrator).stream_turn(turn, cancel.clone()));

    loop {
        let record = tokio::select! {
            record = records.next() => record,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                anyhow::bail!("drafting cancelled; nothing was saved");
            }
        };
        match record {
            Some(StreamRecord::Patch { path, value }) => {
                let shown = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                writeln!(out, "  {} {}", style(format!("{path}:")).dim(), style(shown).dim())?;
            }
            Some(StreamRecord::Final { final_object }) => {
                return Ok(serde_json::from_value(final_object)?);
            }
            Some(StreamRecord::Error { message }) => anyhow::bail!(message),
            None => anyhow::bail!("the turn ended without a response"),
        }
    }
}

fn reported_site(response: &TurnResponse) -> Option<SiteId> {
    response
        .payload
        .get("siteId")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
}

fn render_response(out: &mut SharedWriter, response: &TurnResponse) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "  {} {}", style("pilot ›").cyan().bold(), style(format!("[{}]", response.mode)).dim())?;
    for line in response.assistant_message.lines() {
        writeln!(out, "  {line}")?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitepilot_types::turn::TurnMode;

    #[test]
    fn test_reported_site() {
        let site = SiteId::new();
        let mut payload = serde_json::Map::new();
        payload.insert("siteId".to_string(), json!(site.to_string()));
        let response = TurnResponse {
            conversation_id: ConversationId::new().to_string(),
            mode: TurnMode::Ready,
            user_message: "3".to_string(),
            assistant_message: "Ready.".to_string(),
            payload,
        };
        assert_eq!(reported_site(&response), Some(site));

        let mut response = response;
        response.payload.clear();
        assert_eq!(reported_site(&response), None);
    }
}
