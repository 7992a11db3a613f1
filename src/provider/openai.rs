use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::wire::LlmRequest;

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAIProvider {
    model: String,
    api_key: String,
    client: Client,
    timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(model: String, api_key: String, timeout: Duration) -> Self {
        Self {
            model,
            api_key,
            client: Client::new(),
            timeout,
        }
    }

    fn request_body(&self, req: &LlmRequest) -> Value {
        let mut messages = vec![json!({ "role": "system", "content": req.instruction.system })];
        if let Some(dev) = &req.instruction.developer {
            messages.push(json!({ "role": "developer", "content": dev }));
        }
        messages.push(json!({ "role": "user", "content": req.instruction.user }));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": req.temperature,
            "max_tokens": req.max_output_tokens,
        });
        if req.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[async_trait]
impl super::Provider for OpenAIProvider {
    async fn complete(&self, req: &LlmRequest) -> Result<String> {
        let body = self.request_body(req);
        tracing::debug!(model = %self.model, "POST {}", CHAT_URL);

        let resp = self
            .client
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("openai request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("openai read body failed")?;
        tracing::debug!(%status, bytes = text.len(), "openai responded");

        super::ensure_success("OpenAI", status, &text)?;

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse OpenAI response: {e}\nRaw: {text}"))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("openai: empty content"))
    }
}
