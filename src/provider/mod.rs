use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::wire::LlmRequest;

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

/// A remote model that turns one instruction into raw text.
/// The text is not trusted to be JSON; callers run it through `coerce`.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, req: &LlmRequest) -> Result<String>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

/// Non-success responses become errors carrying the status and raw body.
fn ensure_success(service: &str, status: reqwest::StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(anyhow!("{service} API error ({status}): {body}"))
    }
}

fn api_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(anyhow!("{var} env var is not set")),
    }
}

pub fn make_provider(cfg: &Config) -> Result<DynProvider> {
    let model = cfg.model_name().to_string();
    let timeout = Duration::from_secs(cfg.timeout_secs);
    tracing::debug!(provider = ?cfg.provider, %model, "building provider");

    match cfg.provider {
        ProviderKind::Gemini => Ok(Box::new(gemini::Gemini::new(model, api_key("GOOGLE_API_KEY")?, timeout))),
        ProviderKind::OpenAI => Ok(Box::new(openai::OpenAIProvider::new(model, api_key("OPENAI_API_KEY")?, timeout))),
        ProviderKind::Anthropic => Ok(Box::new(anthropic::Anthropic::new(model, api_key("ANTHROPIC_API_KEY")?, timeout))),
        ProviderKind::Ollama => Ok(Box::new(ollama::Ollama::new(model, cfg.ollama_url.clone(), timeout))),
    }
}

#[cfg(test)]
fn sample_request(json_mode: bool) -> LlmRequest {
    use crate::wire::Instruction;

    LlmRequest {
        instruction: Instruction {
            system: "sys".into(),
            user: "build a bakery site".into(),
            developer: Some("keep it small".into()),
        },
        max_output_tokens: 1024,
        json_mode,
        temperature: 0.2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn error_status_carries_code_and_body() {
        assert!(ensure_success("OpenAI", StatusCode::OK, "").is_ok());
        let err = ensure_success("Gemini", StatusCode::TOO_MANY_REQUESTS, "{\"error\":\"quota\"}").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Gemini"));
        assert!(msg.contains("429"));
        assert!(msg.contains("quota"));
    }

    #[test]
    fn blank_api_key_is_missing() {
        std::env::set_var("VIBE_SITEGEN_TEST_BLANK_KEY", "  ");
        assert!(api_key("VIBE_SITEGEN_TEST_BLANK_KEY").is_err());
        assert!(api_key("VIBE_SITEGEN_TEST_UNSET_KEY").is_err());
    }
}
