//! Anthropic Messages API wire types.
//!
//! Provider-specific request and response shapes. The provider-agnostic
//! types live in `sitepilot_types::llm`.

use serde::{Deserialize, Serialize};

use sitepilot_types::llm::StopReason;

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

// SSE payloads. The `event:` line names the type and `data:` carries the JSON,
// so each payload is decoded into its own struct keyed on the event name.

/// Payload for `event: message_start`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartPayload {
    pub message: AnthropicMessageObj,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicMessageObj {
    pub id: String,
    pub model: String,
    pub usage: Option<AnthropicUsage>,
}

/// A content block in a response. Only text is requested; anything else is
/// kept as `Other` and ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Payload for `event: content_block_delta`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlockDeltaPayload {
    pub index: u32,
    pub delta: AnthropicDelta,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// Payload for `event: message_delta`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaPayload {
    pub delta: MessageDeltaObj,
    pub usage: AnthropicUsage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaObj {
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Payload for `event: error`, also the body of non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub error: AnthropicError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Non-streaming response body.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicNonStreamResponse {
    pub id: String,
    pub content: Vec<AnthropicContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: AnthropicUsage,
}

impl AnthropicNonStreamResponse {
    /// Concatenated text of every text block.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                AnthropicContentBlock::Other => None,
            })
            .collect()
    }
}

/// Map the API's stop reason onto ours. Unknown reasons end the turn.
pub fn stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_skips_empty_fields() {
        let req = AnthropicRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: "Hello".to_string(),
            }],
            system: None,
            stream: false,
            temperature: None,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "claude-sonnet-4-20250514");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("system").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_non_stream_response_text_skips_other_blocks() {
        let json = r#"{
            "id": "msg_456",
            "content": [
                {"type": "text", "text": "{\"answer\":"},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": " \"ok\"}"}
            ],
            "model": "claude-sonnet-4-20250514",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 50, "output_tokens": 20}
        }"#;
        let resp: AnthropicNonStreamResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text(), "{\"answer\": \"ok\"}");
        assert_eq!(resp.usage.output_tokens, 20);
    }

    #[test]
    fn test_delta_deserialization() {
        let delta: AnthropicDelta =
            serde_json::from_str(r#"{"type": "text_delta", "text": "Hi"}"#).unwrap();
        assert!(matches!(delta, AnthropicDelta::TextDelta { ref text } if text == "Hi"));

        let delta: AnthropicDelta =
            serde_json::from_str(r#"{"type": "input_json_delta", "partial_json": "{"}"#).unwrap();
        assert!(matches!(delta, AnthropicDelta::Other));
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(stop_reason(Some("max_tokens")), StopReason::MaxTokens);
        assert_eq!(stop_reason(Some("stop_sequence")), StopReason::StopSequence);
        assert_eq!(stop_reason(Some("tool_use")), StopReason::EndTurn);
        assert_eq!(stop_reason(None), StopReason::EndTurn);
    }
}
