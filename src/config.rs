//! Client configuration
//!
//! Defaults, then an optional JSON file, then environment variables.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PrintLayersError, Result};

/// Environment variable overriding the service base URL
pub const ENV_API_URL: &str = "PRINTLAYERS_API_URL";
/// Environment variable overriding the request timeout (milliseconds)
pub const ENV_TIMEOUT_MS: &str = "PRINTLAYERS_TIMEOUT_MS";
/// Environment variable overriding the per-layer decode timeout (milliseconds)
pub const ENV_DECODE_TIMEOUT_MS: &str = "PRINTLAYERS_DECODE_TIMEOUT_MS";

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Settings shared by the HTTP client, orchestrator, decoder and exporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the processing service
    pub api_url: String,
    /// Timeout for the processing request
    pub request_timeout_ms: u64,
    /// Timeout for the health probe
    pub health_timeout_ms: u64,
    /// Cadence of the simulated progress ticker
    pub progress_tick_ms: u64,
    /// Delay before the indicator hides after a failure
    pub progress_hide_delay_ms: u64,
    /// Upper bound for decoding a single layer
    pub decode_timeout_ms: u64,
    /// Gap between consecutive per-layer exports
    pub export_stagger_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_ms: 300_000, // 5 minutes
            health_timeout_ms: 5_000,
            progress_tick_ms: 400,
            progress_hide_delay_ms: 3_000,
            decode_timeout_ms: 10_000,
            export_stagger_ms: 200,
        }
    }
}

impl ClientConfig {
    /// Load configuration: defaults, optional JSON file, then environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()?.validated()
    }

    /// Read a JSON config file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `PRINTLAYERS_*` environment overrides
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = env::var(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(ms) = read_env_ms(ENV_TIMEOUT_MS)? {
            self.request_timeout_ms = ms;
        }
        if let Some(ms) = read_env_ms(ENV_DECODE_TIMEOUT_MS)? {
            self.decode_timeout_ms = ms;
        }
        Ok(self)
    }

    /// Reject values that would make the client unusable
    pub fn validated(mut self) -> Result<Self> {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(PrintLayersError::Config {
                reason: format!("api_url must be an http(s) URL, got '{}'", self.api_url),
            });
        }
        self.api_url = trimmed.to_string();

        if self.progress_tick_ms == 0 {
            return Err(PrintLayersError::Config {
                reason: "progress_tick_ms must be greater than zero".to_string(),
            });
        }
        if self.decode_timeout_ms == 0 {
            return Err(PrintLayersError::Config {
                reason: "decode_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(self)
    }

    /// Join a service path onto the base URL
    ///
    /// Absolute URLs are returned unchanged.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.api_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }

    pub fn progress_hide_delay(&self) -> Duration {
        Duration::from_millis(self.progress_hide_delay_ms)
    }

    pub fn decode_timeout(&self) -> Duration {
        Duration::from_millis(self.decode_timeout_ms)
    }

    pub fn export_stagger(&self) -> Duration {
        Duration::from_millis(self.export_stagger_ms)
    }
}

fn read_env_ms(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| PrintLayersError::Config {
                reason: format!("{} must be a number of milliseconds, got '{}'", key, raw),
            }),
        Err(_) => Ok(None),
    }
}
