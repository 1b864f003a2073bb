//! SSE stream handling for the Anthropic Messages API.
//!
//! Event order on the wire:
//! 1. `message_start` with initial usage
//! 2. per block: `content_block_start`, N x `content_block_delta`, `content_block_stop`
//! 3. `message_delta` with the stop reason and cumulative usage
//! 4. `message_stop`
//!
//! `ping` may appear anywhere and `error` may arrive mid-stream.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use sitepilot_core::llm::provider::LlmEventStream;
use sitepilot_types::llm::{LlmError, StreamEvent, Usage};

use super::client::send_messages;
use super::types::{
    AnthropicDelta, AnthropicRequest, ContentBlockDeltaPayload, ErrorPayload, MessageDeltaPayload,
    MessageStartPayload, stop_reason,
};

/// Translate one SSE event into zero or more provider-agnostic events.
pub fn process_event(event_type: &str, data: &str) -> Result<Vec<StreamEvent>, LlmError> {
    let mut events = Vec::new();

    match event_type {
        "message_start" => {
            let payload: MessageStartPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("message_start: {e}")))?;
            tracing::debug!(message_id = %payload.message.id, model = %payload.message.model, "stream started");
            if let Some(usage) = payload.message.usage {
                events.push(StreamEvent::Usage(Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                }));
            }
        }

        "content_block_delta" => {
            let payload: ContentBlockDeltaPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("content_block_delta: {e}")))?;
            if let AnthropicDelta::TextDelta { text } = payload.delta {
                events.push(StreamEvent::TextDelta { text });
            } else {
                tracing::trace!(index = payload.index, "non-text delta skipped");
            }
        }

        "message_delta" => {
            let payload: MessageDeltaPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("message_delta: {e}")))?;
            events.push(StreamEvent::Usage(Usage {
                input_tokens: payload.usage.input_tokens,
                output_tokens: payload.usage.output_tokens,
            }));
            events.push(StreamEvent::MessageDelta {
                stop_reason: stop_reason(payload.delta.stop_reason.as_deref()),
            });
        }

        "message_stop" => events.push(StreamEvent::Done),

        "ping" | "content_block_start" | "content_block_stop" => {}

        "error" => {
            let payload: ErrorPayload = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(format!("error event: {e}")))?;
            return Err(match payload.error.error_type.as_str() {
                "overloaded_error" => LlmError::Overloaded(payload.error.message),
                "rate_limit_error" => LlmError::RateLimited { retry_after_ms: None },
                "authentication_error" => LlmError::AuthenticationFailed,
                "invalid_request_error" => LlmError::InvalidRequest(payload.error.message),
                _ => LlmError::Provider {
                    message: payload.error.message,
                },
            });
        }

        unknown => {
            tracing::warn!(event_type = unknown, "unknown Anthropic event type, skipping");
        }
    }

    Ok(events)
}

/// Open a streaming request and adapt the SSE body into [`StreamEvent`]s.
///
/// Nothing is sent until the stream is first polled; dropping the stream
/// closes the connection.
pub fn create_anthropic_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicRequest,
    api_key: &SecretString,
) -> LlmEventStream {
    let client = client.clone();
    let url = url.to_string();
    let api_key = SecretString::from(api_key.expose_secret().to_string());

    Box::pin(async_stream::try_stream! {
        let response = send_messages(&client, &url, &body, &api_key).await?;

        yield StreamEvent::Connected;

        let mut events = response.bytes_stream().eventsource();
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            let mut finished = false;
            for ev in process_event(&event.event, &event.data)? {
                finished |= matches!(ev, StreamEvent::Done);
                yield ev;
            }
            if finished {
                break;
            }
        }
    })
}
