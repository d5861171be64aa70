//! Remote processing service
//!
//! This module provides:
//! - `ProcessingService` trait, the seam between the orchestrator and HTTP
//! - `HttpProcessingService`, the reqwest implementation
//! - Envelope parsing for success and error bodies

mod envelope;
mod http;

pub use envelope::{
    error_message, AcceptedEnvelope, EnvelopeStatus, ResponseEnvelope, WireLayer, WireResult,
};
pub use http::{HttpProcessingService, HEALTH_PATH, PROCESS_PATH};

use async_trait::async_trait;

use crate::error::Result;
use crate::session::{LayerCountHint, UploadedFile};

/// What gets sent to the service for one attempt
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub file: UploadedFile,
    pub layer_count: LayerCountHint,
}

/// Raw HTTP outcome; interpretation is left to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: String,
}

impl ServiceResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can run a processing request and answer a health probe
#[async_trait]
pub trait ProcessingService: Send + Sync {
    /// Submit the file; `Err` only for failures below HTTP (connect, timeout)
    async fn process(&self, request: &ProcessRequest) -> Result<ServiceResponse>;

    /// Whether the service answered the health probe successfully
    async fn health(&self) -> bool;
}
