use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Provider;
use crate::wire::LlmRequest;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct Gemini {
    model: String,
    api_key: String,
    client: Client,
    timeout: Duration,
}

impl Gemini {
    pub fn new(model: String, api_key: String, timeout: Duration) -> Self {
        Self { model, api_key, client: Client::new(), timeout }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn build_request<'a>(req: &'a LlmRequest, system: &'a str) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            role: Some("user"),
            parts: vec![Part { text: &req.instruction.user }],
        }],
        system_instruction: Content { role: None, parts: vec![Part { text: system }] },
        generation_config: GenerationConfig {
            max_output_tokens: req.max_output_tokens,
            temperature: req.temperature,
            response_mime_type: req.json_mode.then_some("application/json"),
        },
    }
}

#[async_trait]
impl Provider for Gemini {
    async fn complete(&self, req: &LlmRequest) -> Result<String> {
        let url = format!("{API_BASE}/models/{}:generateContent", self.model);
        let system = req.instruction.system_with_notes();
        let body = build_request(req, &system);

        tracing::debug!(model = %self.model, "POST {}", url);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("gemini request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("gemini read body failed")?;
        tracing::debug!(%status, bytes = text.len(), "gemini responded");

        super::ensure_success("Gemini", status, &text)?;

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("gemini response parse error: {e}\nRaw: {text}"))?;

        let content: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(anyhow!("gemini: empty content"));
        }
        Ok(content)
    }
}
