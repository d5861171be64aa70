//! HTTP client for the processing service

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use super::{ProcessRequest, ProcessingService, ServiceResponse};
use crate::config::ClientConfig;
use crate::error::{PrintLayersError, Result};

/// Path of the processing endpoint
pub const PROCESS_PATH: &str = "/api/image/process";
/// Path of the liveness probe
pub const HEALTH_PATH: &str = "/api/health/live";

/// reqwest-backed `ProcessingService`
#[derive(Debug, Clone)]
pub struct HttpProcessingService {
    client: Client,
    config: ClientConfig,
}

impl HttpProcessingService {
    /// Build a client from configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    /// Underlying reqwest client, shared with download sinks
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn build_form(request: &ProcessRequest) -> Result<Form> {
        let file = &request.file;
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.media_type())?;
        Ok(Form::new()
            .part("file", part)
            .text("num_layers", request.layer_count.wire_value().to_string()))
    }
}

#[async_trait]
impl ProcessingService for HttpProcessingService {
    async fn process(&self, request: &ProcessRequest) -> Result<ServiceResponse> {
        let url = self.config.endpoint(PROCESS_PATH);
        tracing::debug!(%url, layers = %request.layer_count, "sending processing request");

        let response = self
            .client
            .post(&url)
            .multipart(Self::build_form(request)?)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PrintLayersError::Transport {
                        message: format!(
                            "Processing timed out after {}ms",
                            self.config.request_timeout_ms
                        ),
                        status: None,
                    }
                } else if e.is_connect() {
                    PrintLayersError::Transport {
                        message: format!("Cannot connect to {}: {}", self.config.api_url, e),
                        status: None,
                    }
                } else {
                    PrintLayersError::Http(e)
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ServiceResponse { status, body })
    }

    async fn health(&self) -> bool {
        let url = self.config.endpoint(HEALTH_PATH);
        match self
            .client
            .get(&url)
            .timeout(self.config.health_timeout())
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(%url, error = %e, "health probe failed");
                false
            }
        }
    }
}
