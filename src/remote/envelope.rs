//! Response and error envelopes of the processing service
//!
//! Success body:
//! ```text
//! { status, file_id, download_url, results: [ { layers: [ { layer_number, color_hex, image_base64 } ] } ] }
//! ```
//! Error body (any non-2xx): `{ detail: <string | { error | message }>, status_code, type }`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{PrintLayersError, Result};
use crate::session::{ColorHex, ProcessedLayer};

/// Declared outcome of a processing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStatus {
    Success,
    PartialSuccess,
}

impl EnvelopeStatus {
    /// Parse the `status` field; anything else is not an accepted outcome
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "success" => Some(Self::Success),
            "partial_success" => Some(Self::PartialSuccess),
            _ => None,
        }
    }
}

/// One layer as it appears on the wire
#[derive(Debug, Clone, Deserialize)]
pub struct WireLayer {
    pub layer_number: u32,
    pub color_hex: String,
    pub image_base64: String,
}

/// Per-image result; only the first is used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireResult {
    #[serde(default)]
    pub layers: Vec<WireLayer>,
}

/// Body of a 2xx response
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    pub status: String,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub results: Vec<WireResult>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// An envelope that passed status and payload checks
#[derive(Debug, Clone)]
pub struct AcceptedEnvelope {
    pub layers: Vec<ProcessedLayer>,
    pub session_id: Option<String>,
    pub bundle_url: Option<String>,
    pub partial: bool,
}

impl ResponseEnvelope {
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| PrintLayersError::Envelope {
            message: format!("Invalid response from processing service: {}", e),
        })
    }

    /// Check the declared status and convert the first result's layers
    ///
    /// Layers keep the order the service sent them in.
    pub fn accept(self) -> Result<AcceptedEnvelope> {
        let status = EnvelopeStatus::parse(&self.status).ok_or_else(|| {
            PrintLayersError::Envelope {
                message: self
                    .error
                    .clone()
                    .or_else(|| self.message.clone())
                    .unwrap_or_else(|| format!("Processing failed (status: {})", self.status)),
            }
        })?;

        let first = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| PrintLayersError::Envelope {
                message: "Processing service returned no results".to_string(),
            })?;

        let layers = first
            .layers
            .into_iter()
            .map(WireLayer::into_processed)
            .collect::<Result<Vec<_>>>()?;

        Ok(AcceptedEnvelope {
            layers,
            session_id: non_empty(self.file_id),
            bundle_url: non_empty(self.download_url),
            partial: status == EnvelopeStatus::PartialSuccess,
        })
    }
}

impl WireLayer {
    fn into_processed(self) -> Result<ProcessedLayer> {
        let color_hex =
            ColorHex::parse(&self.color_hex).map_err(|_| PrintLayersError::Envelope {
                message: format!(
                    "Layer {} has an invalid color '{}'",
                    self.layer_number, self.color_hex
                ),
            })?;
        let payload = strip_data_url(&self.image_base64);
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| PrintLayersError::Envelope {
                message: format!("Layer {} has an invalid image payload: {}", self.layer_number, e),
            })?;
        Ok(ProcessedLayer::new(self.layer_number, color_hex, bytes))
    }
}

/// Extract a user-facing message from an error body, best-effort
pub fn error_message(body: &str, status: u16) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| message_from_value(&value))
        .unwrap_or_else(|| format!("Processing failed (HTTP {})", status))
}

fn message_from_value(value: &Value) -> Option<String> {
    if let Some(detail) = value.get("detail") {
        match detail {
            Value::String(s) if !s.is_empty() => return Some(s.clone()),
            Value::Object(_) => {
                for key in ["error", "message"] {
                    if let Some(Value::String(s)) = detail.get(key) {
                        return Some(s.clone());
                    }
                }
            }
            _ => {}
        }
    }
    for key in ["error", "message"] {
        if let Some(Value::String(s)) = value.get(key) {
            return Some(s.clone());
        }
    }
    None
}

fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
