//! AnthropicProvider: [`LlmProvider`] over the Anthropic Messages API.
//!
//! The API key is held as a [`SecretString`] and only exposed while building
//! request headers.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use sitepilot_core::llm::provider::{LlmEventStream, LlmProvider};
use sitepilot_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, Usage,
};

use super::streaming::create_anthropic_stream;
use super::types::{
    AnthropicMessage, AnthropicNonStreamResponse, AnthropicRequest, ErrorPayload, stop_reason,
};

pub(crate) const API_VERSION: &str = "2023-06-01";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Claude provider.
///
/// Does not derive `Debug`; the key never reaches logs or debug output.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    capabilities: ProviderCapabilities,
}

impl AnthropicProvider {
    pub fn new(api_key: SecretString, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            });

        let capabilities = Self::capabilities_for_model(&model);

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            capabilities,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Override the base URL (proxies, local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn capabilities_for_model(model: &str) -> ProviderCapabilities {
        let max_output_tokens = if model.contains("opus") {
            32_000
        } else if model.contains("sonnet") || model.contains("haiku") {
            8_192
        } else {
            4_096
        };
        ProviderCapabilities {
            streaming: true,
            max_context_tokens: 200_000,
            max_output_tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// An empty request model falls back to the provider's model.
    fn to_anthropic_request(&self, request: &CompletionRequest, stream: bool) -> AnthropicRequest {
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };
        AnthropicRequest {
            model,
            max_tokens: request.max_tokens.min(self.capabilities.max_output_tokens),
            messages: request
                .messages
                .iter()
                .map(|m| AnthropicMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            system: request.system.clone(),
            stream,
            temperature: request.temperature,
        }
    }
}

/// Map a non-2xx status and body onto an [`LlmError`].
pub(crate) fn error_from_status(status: u16, body: String) -> LlmError {
    let message = serde_json::from_str::<ErrorPayload>(&body)
        .map(|p| p.error.message)
        .unwrap_or(body);
    match status {
        400 | 413 | 422 => LlmError::InvalidRequest(message),
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited { retry_after_ms: None },
        529 => LlmError::Overloaded(message),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

/// POST a messages request and return the response once its status is OK.
pub(crate) async fn send_messages(
    client: &reqwest::Client,
    url: &str,
    body: &AnthropicRequest,
    api_key: &SecretString,
) -> Result<reqwest::Response, LlmError> {
    let response = client
        .post(url)
        .header("x-api-key", api_key.expose_secret())
        .header("anthropic-version", API_VERSION)
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, "Anthropic API error response");
    Err(error_from_status(status.as_u16(), error_body))
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_anthropic_request(request, false);
        let response = send_messages(&self.client, &self.url("/v1/messages"), &body, &self.api_key).await?;

        let parsed: AnthropicNonStreamResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        Ok(CompletionResponse {
            content: parsed.text(),
            stop_reason: stop_reason(parsed.stop_reason.as_deref()),
            usage: Usage {
                input_tokens: parsed.usage.input_tokens,
                output_tokens: parsed.usage.output_tokens,
            },
            id: parsed.id,
            model: parsed.model,
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let body = self.to_anthropic_request(&request, true);
        create_anthropic_stream(&self.client, &self.url("/v1/messages"), body, &self.api_key)
    }
}
