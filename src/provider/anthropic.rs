use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Provider;
use crate::wire::LlmRequest;

const API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    model: String,
    api_key: String,
    client: Client,
    timeout: Duration,
}

impl Anthropic {
    pub fn new(model: String, api_key: String, timeout: Duration) -> Self {
        Self { model, api_key, client: Client::new(), timeout }
    }
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Msg<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
    #[serde(default)]
    r#type: String,
}

impl Anthropic {
    /// The messages API has no JSON switch; `json_mode` relies on the prompt alone.
    fn build_request<'a>(&'a self, req: &'a LlmRequest, system: &'a str) -> MsgRequest<'a> {
        MsgRequest {
            model: &self.model,
            max_tokens: req.max_output_tokens,
            temperature: req.temperature,
            messages: vec![Msg { role: "user", content: &req.instruction.user }],
            system: Some(system),
        }
    }
}

#[async_trait]
impl Provider for Anthropic {
    async fn complete(&self, req: &LlmRequest) -> Result<String> {
        let url = format!("{API_BASE}/v1/messages");
        let system = req.instruction.system_with_notes();
        let body = self.build_request(req, &system);

        tracing::debug!(model = %self.model, "POST {}", url);

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("anthropic request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("anthropic read body failed")?;
        tracing::debug!(%status, bytes = text.len(), "anthropic responded");

        super::ensure_success("Anthropic", status, &text)?;

        let parsed: MsgResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("anthropic response parse error: {}", e))?;

        parsed
            .content
            .into_iter()
            .find(|b| b.r#type == "text" || !b.text.is_empty())
            .map(|b| b.text)
            .ok_or_else(|| anyhow!("anthropic: empty content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::sample_request;

    fn body(json_mode: bool) -> serde_json::Value {
        let anthropic = Anthropic::new("claude-sonnet-4-5".into(), "key".into(), Duration::from_secs(5));
        let req = sample_request(json_mode);
        let system = req.instruction.system_with_notes();
        serde_json::to_value(anthropic.build_request(&req, &system)).unwrap()
    }

    #[test]
    fn system_carries_developer_notes() {
        let body = body(true);
        assert!(body["system"].as_str().unwrap().contains("keep it small"));
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn json_mode_does_not_change_the_body() {
        assert_eq!(body(true), body(false));
    }
}
