//! Generative calls that must produce one JSON object.
//!
//! The provider returns free text; the first balanced `{...}` span is
//! extracted and parsed, then checked by a caller-supplied validator. Transport
//! failures are retried up to `max_attempts`; validation failures trigger up
//! to `max_regenerations` silent regenerations with a corrective instruction.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};

use sitepilot_types::config::SitePilotConfig;
use sitepilot_types::llm::{CompletionRequest, LlmError, Message, MessageRole, StreamEvent};

use super::box_provider::BoxLlmProvider;
use super::provider::LlmEventStream;
use crate::validate::Violations;

/// Errors from a validated generative call.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Every regeneration still failed validation.
    #[error("output failed validation: {}", .0.join("; "))]
    Unsatisfied(Violations),
}

/// System prompt plus conversation for one generative call.
#[derive(Debug, Clone)]
pub struct GenerationPrompt {
    pub system: String,
    pub messages: Vec<Message>,
}

impl GenerationPrompt {
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
        }
    }

    fn push(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
    }
}

pub struct GenerativeService {
    provider: Arc<BoxLlmProvider>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    max_attempts: u32,
    max_regenerations: u32,
}

impl GenerativeService {
    pub fn new(provider: Arc<BoxLlmProvider>, config: &SitePilotConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.generation.max_tokens,
            max_attempts: config.generation.max_attempts.max(1),
            max_regenerations: config.generation.max_regenerations,
        }
    }

    fn request(&self, prompt: &GenerationPrompt, stream: bool) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: prompt.messages.clone(),
            system: Some(prompt.system.clone()),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            stream,
        }
    }

    /// One completion, retried on transient transport failures.
    pub async fn complete_text(&self, prompt: &GenerationPrompt) -> Result<String, LlmError> {
        let request = self.request(prompt, false);
        let mut attempt = 1;
        loop {
            let span = info_span!(
                "gen_ai.complete",
                gen_ai.operation.name = "chat",
                gen_ai.provider.name = self.provider.name(),
                gen_ai.request.model = %request.model,
                gen_ai.request.max_tokens = request.max_tokens,
                gen_ai.request.temperature = ?request.temperature,
                attempt,
            );
            match self.provider.complete(&request).instrument(span).await {
                Ok(response) => {
                    info!(
                        gen_ai.usage.input_tokens = response.usage.input_tokens,
                        gen_ai.usage.output_tokens = response.usage.output_tokens,
                        stop_reason = %response.stop_reason,
                        "Generative call completed"
                    );
                    return Ok(response.content);
                }
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(attempt, error = %err, "Generative call failed, retrying");
                    tokio::time::sleep(Duration::from_millis(50 * 2u64.pow(attempt - 1))).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Generate and validate, regenerating with corrective feedback on failure.
    pub async fn generate<T, F>(&self, prompt: GenerationPrompt, validate: F) -> Result<T, GenerationError>
    where
        F: Fn(&Value) -> Result<T, Violations>,
    {
        self.generate_from(prompt, None, validate).await
    }

    /// Like [`generate`](Self::generate), but the first round's output has
    /// already been obtained (e.g. from a stream).
    pub async fn generate_from<T, F>(
        &self,
        mut prompt: GenerationPrompt,
        first_output: Option<String>,
        validate: F,
    ) -> Result<T, GenerationError>
    where
        F: Fn(&Value) -> Result<T, Violations>,
    {
        let mut pending = first_output;
        let mut last = Vec::new();
        for round in 0..=self.max_regenerations {
            let text = match pending.take() {
                Some(text) => text,
                None => self.complete_text(&prompt).await?,
            };
            match parse_json_output(&text).and_then(|value| validate(&value)) {
                Ok(valid) => return Ok(valid),
                Err(violations) => {
                    warn!(round, violations = violations.len(), "Generated output rejected");
                    prompt.push(MessageRole::Assistant, text);
                    prompt.push(MessageRole::User, corrective_instruction(&violations));
                    last = violations;
                }
            }
        }
        Err(GenerationError::Unsatisfied(last))
    }

    /// Stream raw events for one completion. Not retried: partial output has
    /// already been observed by the caller.
    pub fn stream_text(&self, prompt: &GenerationPrompt) -> LlmEventStream {
        let request = self.request(prompt, true);
        let span = info_span!(
            "gen_ai.stream",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            gen_ai.request.stream = true,
        );
        let inner = self.provider.stream(request);
        Box::pin(StreamInSpan { inner, span })
    }
}

/// Keeps the generative span entered while the stream is polled.
struct StreamInSpan {
    inner: LlmEventStream,
    span: tracing::Span,
}

impl Stream for StreamInSpan {
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}

fn corrective_instruction(violations: &[String]) -> String {
    let mut text = String::from("Your previous reply was rejected for these reasons:\n");
    for v in violations {
        text.push_str("- ");
        text.push_str(v);
        text.push('\n');
    }
    text.push_str("Reply with exactly one corrected JSON object that fixes every problem, and nothing else.");
    text
}

/// Parse the first balanced JSON object in a model reply.
pub fn parse_json_output(text: &str) -> Result<Value, Violations> {
    let span = extract_json_object(text)
        .ok_or_else(|| vec!["reply did not contain a JSON object".to_string()])?;
    serde_json::from_str(span).map_err(|e| vec![format!("reply JSON is malformed: {e}")])
}

/// Return the first balanced `{...}` span, respecting string literals.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn service(provider: ScriptedProvider) -> GenerativeService {
        GenerativeService::new(
            Arc::new(BoxLlmProvider::new(provider)),
            &SitePilotConfig::default(),
        )
    }

    fn prompt() -> GenerationPrompt {
        GenerationPrompt::new("system", vec![])
    }

    fn needs_answer(value: &Value) -> Result<String, Violations> {
        value
            .get("answer")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| vec!["answer: missing".to_string()])
    }

    #[test]
    fn test_extract_json_object_skips_prose_and_nested_braces() {
        let text = r#"Sure! Here it is: {"a": {"b": "}"}, "c": 1} and more {"x": 2}"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": "}"}, "c": 1}"#));
    }

    #[test]
    fn test_extract_json_object_handles_escaped_quotes() {
        let text = r#"{"q": "say \"hi\" {now}"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_json_object_unbalanced() {
        assert_eq!(extract_json_object("no json"), None);
        assert_eq!(extract_json_object(r#"{"a": 1"#), None);
    }

    #[test]
    fn test_parse_json_output_reports_violation() {
        let err = parse_json_output("nothing here").unwrap_err();
        assert_eq!(err, vec!["reply did not contain a JSON object".to_string()]);
    }

    #[tokio::test]
    async fn test_generate_regenerates_until_valid() {
        let provider = ScriptedProvider::new(vec![
            r#"{"wrong": true}"#.to_string(),
            r#"Here you go {"answer": "fine"}"#.to_string(),
        ]);
        let calls = provider.calls();
        let svc = service(provider);
        let answer = svc.generate(prompt(), needs_answer).await.unwrap();
        assert_eq!(answer, "fine");

        let requests = calls.lock().unwrap();
        assert_eq!(requests.len(), 2);
        // Second request carries the rejected reply plus a corrective instruction.
        let second = &requests[1];
        assert_eq!(second.messages.len(), 2);
        assert!(second.messages[1].content.contains("answer: missing"));
    }

    #[tokio::test]
    async fn test_generate_gives_up_after_max_regenerations() {
        let provider = ScriptedProvider::new(vec![
            "{}".to_string(),
            "{}".to_string(),
            "{}".to_string(),
            r#"{"answer": "too late"}"#.to_string(),
        ]);
        let calls = provider.calls();
        let svc = service(provider);
        let err = svc.generate(prompt(), needs_answer).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unsatisfied(ref v) if v[0] == "answer: missing"));
        // One initial call plus two regenerations.
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_complete_text_retries_transient_errors() {
        let provider = ScriptedProvider::with_results(vec![
            Err(LlmError::Overloaded("busy".to_string())),
            Ok(r#"{"answer": "ok"}"#.to_string()),
        ]);
        let svc = service(provider);
        let text = svc.complete_text(&prompt()).await.unwrap();
        assert!(text.contains("ok"));
    }

    #[tokio::test]
    async fn test_complete_text_does_not_retry_auth_failure() {
        let provider = ScriptedProvider::with_results(vec![
            Err(LlmError::AuthenticationFailed),
            Ok("{}".to_string()),
        ]);
        let calls = provider.calls();
        let svc = service(provider);
        assert!(matches!(
            svc.complete_text(&prompt()).await,
            Err(LlmError::AuthenticationFailed)
        ));
        assert_eq!(calls.lock().unwrap().len(), 1);
    }
}
