use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Provider;
use crate::wire::{Instruction, LlmRequest};

pub struct Ollama {
    model: String,
    url: String,
    client: Client,
    timeout: Duration,
}

impl Ollama {
    pub fn new(model: String, url: String, timeout: Duration) -> Self {
        Self { model, url, client: Client::new(), timeout }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct Msg {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: String,
}

fn to_messages(ins: &Instruction) -> Vec<Msg> {
    vec![
        Msg { role: "system".into(), content: ins.system_with_notes() },
        Msg { role: "user".into(), content: ins.user.clone() },
    ]
}

impl Ollama {
    fn build_request<'a>(&'a self, req: &LlmRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: to_messages(&req.instruction),
            stream: false,
            format: req.json_mode.then_some("json"),
            options: OllamaOptions {
                temperature: req.temperature,
                num_predict: req.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, req: &LlmRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let body = self.build_request(req);

        tracing::debug!(model = %self.model, "POST {}", url);

        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("ollama request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("ollama read body failed")?;
        tracing::debug!(%status, bytes = text.len(), "ollama responded");

        super::ensure_success("Ollama", status, &text)?;

        // Some proxies return the bare content instead of the chat envelope.
        let content = match serde_json::from_str::<ChatResponse>(&text) {
            Ok(c) => c.message.content,
            Err(_) => text,
        };
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::sample_request;

    fn body(json_mode: bool) -> serde_json::Value {
        let ollama = Ollama::new("llama3.1".into(), "http://localhost:11434/".into(), Duration::from_secs(5));
        serde_json::to_value(ollama.build_request(&sample_request(json_mode))).unwrap()
    }

    #[test]
    fn json_mode_sets_format() {
        let body = body(true);
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 1024);
    }

    #[test]
    fn plain_mode_omits_format() {
        let body = body(false);
        assert!(body.get("format").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "build a bakery site");
    }
}
