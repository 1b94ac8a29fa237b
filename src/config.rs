// SPDX-License-Identifier: MIT
//! Engine configuration.
//!
//! Loaded from an optional TOML file with every field defaulted, then
//! overridden by environment variables (`CHRONICLE_API_KEY`). All timing
//! values are plain integers in the file and exposed as [`Duration`]s to
//! the rest of the crate.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_CONTEXT_WINDOW: usize = 60;
const DEFAULT_MIN_CONTEXT: usize = 5;
const DEFAULT_REVEAL_TICK_MS: u64 = 8;
const DEFAULT_REVEAL_CHUNK: usize = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Backend model identifiers tried in priority order.
pub const DEFAULT_MODELS: [&str; 4] = [
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-2.0-pro-exp",
    "gemini-1.5-flash",
];

// ─── SuggestConfig ────────────────────────────────────────────────────────────

/// Ghost autocomplete tuning (`[suggest]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Quiet period after the last edit before a completion is fetched.
    ///
    /// Default: 500 ms
    pub debounce_ms: u64,
    /// How many trailing characters (ending at the selection end) are sent
    /// as context.
    ///
    /// Default: 60
    pub context_window: usize,
    /// Contexts of this many characters or fewer are skipped entirely.
    ///
    /// Default: 5
    pub min_context: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            context_window: DEFAULT_CONTEXT_WINDOW,
            min_context: DEFAULT_MIN_CONTEXT,
        }
    }
}

impl SuggestConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ─── StreamConfig ─────────────────────────────────────────────────────────────

/// Continue-writing reveal tuning (`[stream]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Period of the reveal timer.
    ///
    /// Default: 8 ms
    pub tick_ms: u64,
    /// Characters inserted per tick.
    ///
    /// Default: 3
    pub chunk_chars: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_REVEAL_TICK_MS,
            chunk_chars: DEFAULT_REVEAL_CHUNK,
        }
    }
}

impl StreamConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

// ─── ProviderConfig ───────────────────────────────────────────────────────────

/// Generation backend settings (`[provider]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the generation API.
    ///
    /// Default: the Google generative-language endpoint.
    pub api_base_url: String,
    /// API key. Overridden by `CHRONICLE_API_KEY` when set. None disables
    /// outbound calls (every attempt fails, the gateway returns empty text).
    pub api_key: Option<String>,
    /// Model identifiers tried in priority order; the first one that
    /// responds without an error wins.
    pub models: Vec<String>,
    /// Per-request HTTP timeout.
    ///
    /// Default: 10 s
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ─── EngineConfig ─────────────────────────────────────────────────────────────

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub suggest: SuggestConfig,
    pub stream: StreamConfig,
    pub provider: ProviderConfig,
}

impl EngineConfig {
    /// Load from a TOML file if one exists at `path`, otherwise defaults.
    /// Environment overrides are applied either way.
    pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p.display()))?;
                let parsed: EngineConfig = toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", p.display()))?;
                info!(path = %p.display(), "loaded config file");
                parsed
            }
            _ => EngineConfig::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("CHRONICLE_API_KEY") {
            if !key.is_empty() {
                self.provider.api_key = Some(key);
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
