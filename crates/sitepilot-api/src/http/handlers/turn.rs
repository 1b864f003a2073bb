//! The message-turn endpoint.
//!
//! - `POST /api/v1/turn` answers with the turn envelope
//!   `{conversationId, mode, userMessage, assistantMessage, ...}`.
//! - `POST /api/v1/turn/stream` answers with newline-delimited JSON:
//!   `{path, value}` field patches while copy is drafted, then one
//!   `{"__final__": <envelope>}` record (or `{"__error__": message}`).
//!
//! Turns of one conversation are serialised; a second request for the same
//! conversation waits until the first has been persisted.

use std::convert::Infallible;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use sitepilot_core::orchestrator::TurnInput;
use sitepilot_types::conversation::ConversationId;
use sitepilot_types::site::SiteId;
use sitepilot_types::turn::{StreamRecord, TurnRequest, TurnResponse};

use crate::http::error::AppError;
use crate::http::extractors::identity::Identity;
use crate::state::AppState;

/// Validate the request body and attach the caller's identity.
///
/// A missing conversation id starts a new conversation.
pub fn turn_input(body: TurnRequest, identity: Identity) -> Result<TurnInput, AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }
    let conversation_id = match body.conversation_id.as_deref() {
        Some(raw) => raw
            .parse::<ConversationId>()
            .map_err(|_| AppError::Validation(format!("invalid conversationId '{raw}'")))?,
        None => ConversationId::new(),
    };
    let site_id = body
        .site_id
        .as_deref()
        .map(|raw| {
            raw.parse::<SiteId>()
                .map_err(|_| AppError::Validation(format!("invalid siteId '{raw}'")))
        })
        .transpose()?;

    Ok(TurnInput {
        conversation_id,
        message: body.message,
        user_id: identity.0,
        site_id,
        scope: body.scope.filter(|s| !s.trim().is_empty()),
    })
}

/// POST /api/v1/turn
pub async fn post_turn(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let input = turn_input(body, identity)?;
    let conversation_id = input.conversation_id;

    let result = {
        let _turn = state.acquire_turn(conversation_id).await;
        state.orchestrator.handle_turn(input).await
    };

    Ok(Json(result?))
}

/// POST /api/v1/turn/stream
///
/// Closing the connection drops the body stream, which cancels the
/// generative call; the turn then persists nothing.
pub async fn stream_turn(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<TurnRequest>,
) -> Result<Response, AppError> {
    let input = turn_input(body, identity)?;
    let turn = state.acquire_turn(input.conversation_id).await;

    let cancel = CancellationToken::new();
    let on_disconnect = cancel.clone().drop_guard();
    let records = state.orchestrator.clone().stream_turn(input, cancel);

    let lines = records.map(move |record| {
        // Both guards live exactly as long as the response body; dropping
        // the turn guard frees the conversation's lock entry.
        let _held = (&turn, &on_disconnect);
        Ok::<_, Infallible>(ndjson_line(&record))
    });

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}

fn ndjson_line(record: &StreamRecord) -> String {
    let mut line = serde_json::to_string(record)
        .unwrap_or_else(|_| r#"{"__error__":"failed to encode record"}"#.to_string());
    line.push('\n');
    line
}
