//! Generative text providers.

pub mod anthropic;

use secrecy::SecretString;

use sitepilot_core::llm::box_provider::BoxLlmProvider;
use sitepilot_types::llm::LlmError;

use self::anthropic::AnthropicProvider;

/// Environment variable holding the Anthropic API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Build the configured provider.
///
/// Fails with [`LlmError::AuthenticationFailed`] when no key is available.
pub fn create_provider(model: &str, api_key: Option<SecretString>) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
    Ok(BoxLlmProvider::new(AnthropicProvider::new(key, model.to_string())))
}
