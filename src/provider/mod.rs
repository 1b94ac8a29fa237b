// SPDX-License-Identifier: MIT
//! Provider gateway: best-effort text generation with model fallback.
//!
//! The gateway turns document text into generated text. It builds a
//! mode-specific prompt, tries an ordered list of backend model identifiers
//! until one responds without an error, and post-processes the winning
//! response. If every model fails it returns empty text; a diagnostic is
//! only recorded in continuation mode: autocomplete failures must stay
//! invisible.

pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

// ─── Backend seam ─────────────────────────────────────────────────────────────

/// A raw text-generation backend: one model, one prompt, one response.
///
/// The HTTP implementation lives in [`gemini`]; tests inject scripted
/// backends through this trait.
#[async_trait]
pub trait GenerateBackend: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> anyhow::Result<String>;
}

// ─── Modes & prompts ──────────────────────────────────────────────────────────

/// What kind of generation is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Short inline completion for the ghost overlay.
    Complete,
    /// Long continuation for a continue-writing session.
    Continue,
}

/// Build the provider prompt for `mode` around the user's text.
pub fn build_prompt(mode: Mode, text: &str) -> String {
    match mode {
        Mode::Complete => format!(
            "Complete the sentence naturally. Output ONLY the new words. \
             Do NOT repeat the input.\n\nInput: \"{text}\""
        ),
        Mode::Continue => format!(
            "Continue the following text naturally. Determine the appropriate \
             length based on the context (it could be a few sentences or a \
             paragraph). \n\nCRITICAL RULE: Output ONLY the new text. Do NOT \
             repeat the input text provided below.\n\nInput Text:\n\"{text}\""
        ),
    }
}

// ─── Response post-processing ─────────────────────────────────────────────────

/// Clean a raw provider response.
///
/// Applied unconditionally, in this exact order:
/// 1. if the trimmed response starts with the trimmed input, drop that
///    echoed prefix (models sometimes repeat the input despite the prompt);
/// 2. strip one leading `"`;
/// 3. strip one leading `: `;
/// 4. trim the result.
pub fn postprocess(raw: &str, input: &str) -> String {
    let normalized_result = raw.trim();
    let normalized_input = input.trim();

    let result = if normalized_result.starts_with(normalized_input) {
        &normalized_result[normalized_input.len()..]
    } else {
        raw
    };

    let result = result.strip_prefix('"').unwrap_or(result);
    let result = result.strip_prefix(": ").unwrap_or(result);
    result.trim().to_string()
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

/// Tries backend models in priority order and cleans the winning response.
#[derive(Clone)]
pub struct ProviderGateway {
    backend: Arc<dyn GenerateBackend>,
    models: Vec<String>,
}

impl ProviderGateway {
    pub fn new(backend: Arc<dyn GenerateBackend>, models: Vec<String>) -> Self {
        Self { backend, models }
    }

    /// Build a gateway backed by the HTTP Gemini-style endpoint.
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let backend = gemini::GeminiBackend::from_config(config)?;
        Ok(Self::new(Arc::new(backend), config.models.clone()))
    }

    /// Generate text for `text` in the given mode.
    ///
    /// Never fails outward: the first successful model wins, and total
    /// failure yields an empty string.
    pub async fn generate(&self, text: &str, mode: Mode) -> String {
        let prompt = build_prompt(mode, text);

        for model in &self.models {
            match self.backend.generate(model, &prompt).await {
                Ok(raw) => {
                    debug!(model = %model, bytes = raw.len(), "model responded");
                    return postprocess(&raw, text);
                }
                Err(e) => {
                    if mode == Mode::Continue {
                        warn!(model = %model, error = %format!("{e:#}"), "model attempt failed");
                    } else {
                        debug!(model = %model, error = %format!("{e:#}"), "model attempt failed");
                    }
                }
            }
        }

        if mode == Mode::Continue {
            warn!(models = self.models.len(), "all models failed: returning empty text");
        }
        String::new()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
