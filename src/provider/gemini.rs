// SPDX-License-Identifier: MIT
//! HTTP backend for Gemini-style generation endpoints.
//!
//! POST `{base}/models/{model}:generateContent?key={key}` with a single
//! prompt string; the first candidate's first text part is the response.
//! A non-2xx status is a hard failure for that model: the gateway falls
//! through to the next one in priority order.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::GenerateBackend;
use crate::config::ProviderConfig;

// ─── Response shape ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// First candidate's first text part, or empty.
    fn text(mut self) -> String {
        self.candidates
            .drain(..)
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default()
    }
}

// ─── Backend ──────────────────────────────────────────────────────────────────

/// Reqwest-based backend for the generative-language API.
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiBackend {
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl GenerateBackend for GeminiBackend {
    async fn generate(&self, model: &str, prompt: &str) -> anyhow::Result<String> {
        let Some(key) = &self.api_key else {
            anyhow::bail!("no API key configured");
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, key
        );

        let resp = self
            .client
            .post(&url)
            .json(&json!({
                "contents": [{
                    "parts": [{ "text": prompt }]
                }]
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = resp.json().await?;
        Ok(body.text())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
