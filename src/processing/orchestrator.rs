//! Processing Orchestrator
//!
//! Drives one processing attempt end to end:
//! request → simulated progress → envelope checks → ordered decode → result.
//!
//! No retries: every failure ends the attempt and is reported as-is. The
//! session keeps its file so the user can try again.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::decoder::LayerImageDecoder;
use super::progress::{ProgressIndicator, ProgressSimulator, COMPLETE, NEAR_COMPLETE};
use crate::config::ClientConfig;
use crate::error::{PrintLayersError, Result};
use crate::remote::{error_message, ProcessRequest, ProcessingService, ResponseEnvelope};
use crate::session::{CompletedProcessing, LayerCountHint, ProcessingSession};

/// Summary of a successful attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOutcome {
    pub layer_count: usize,
    pub session_id: Option<String>,
    pub bundle_url: Option<String>,
    pub partial: bool,
}

/// Runs processing attempts against a `ProcessingService`
#[derive(Clone)]
pub struct ProcessingOrchestrator {
    service: Arc<dyn ProcessingService>,
    decoder: LayerImageDecoder,
    simulator: ProgressSimulator,
    config: ClientConfig,
}

impl ProcessingOrchestrator {
    pub fn new(service: Arc<dyn ProcessingService>, config: ClientConfig) -> Self {
        Self {
            service,
            decoder: LayerImageDecoder::new(config.decode_timeout()),
            simulator: ProgressSimulator::new(config.progress_tick()),
            config,
        }
    }

    pub fn service(&self) -> &Arc<dyn ProcessingService> {
        &self.service
    }

    /// Run one attempt for the session's current file
    ///
    /// On transport or envelope failure the session returns to `Ready`; on
    /// decode failure it moves to `Error`. In both cases the indicator hides
    /// after the configured delay. If the returned future is dropped before it
    /// settles, the session is put back to `Ready`.
    pub async fn run(
        &self,
        session: &mut ProcessingSession,
        layer_count: LayerCountHint,
        progress: &ProgressIndicator,
    ) -> Result<ProcessingOutcome> {
        let file = session
            .source_file()
            .cloned()
            .ok_or(PrintLayersError::NoSourceFile)?;
        let attempt = session.begin_attempt()?;
        progress.begin();

        let request = ProcessRequest { file, layer_count };
        let accepted = match self.submit(&request, progress).await {
            Ok(accepted) => accepted,
            Err(err) => {
                attempt.fail_attempt(err.user_message());
                progress.hide_after(self.config.progress_hide_delay());
                return Err(err);
            }
        };

        progress.set(NEAR_COMPLETE);
        let decoded_images = match self.decoder.decode_all(&accepted.layers).await {
            Ok(images) => images,
            Err(err) => {
                attempt.fail_terminal(err.user_message());
                progress.hide_after(self.config.progress_hide_delay());
                return Err(err);
            }
        };

        let outcome = ProcessingOutcome {
            layer_count: accepted.layers.len(),
            session_id: accepted.session_id.clone(),
            bundle_url: accepted.bundle_url.clone(),
            partial: accepted.partial,
        };
        let committed = attempt.complete(CompletedProcessing {
            layers: accepted.layers,
            decoded_images,
            session_id: accepted.session_id,
            bundle_url: accepted.bundle_url,
            partial: accepted.partial,
        });
        if let Err(err) = committed {
            progress.hide_after(self.config.progress_hide_delay());
            return Err(err);
        }
        progress.set(COMPLETE);
        Ok(outcome)
    }

    /// Send the request while the simulated progress runs
    ///
    /// The simulator is cancelled as soon as the request settles, on every
    /// path out of this function.
    async fn submit(
        &self,
        request: &ProcessRequest,
        progress: &ProgressIndicator,
    ) -> Result<crate::remote::AcceptedEnvelope> {
        let cancel = CancellationToken::new();
        let ticker = self.simulator.spawn(progress.clone(), cancel.clone());

        let settled = {
            let _guard = cancel.drop_guard();
            self.service.process(request).await
        };
        if let Err(e) = ticker.await {
            tracing::warn!(error = %e, "progress simulator ended abnormally");
        }

        let response = settled?;
        if !response.is_success() {
            let message = error_message(&response.body, response.status);
            tracing::warn!(status = response.status, %message, "processing request rejected");
            return Err(PrintLayersError::Transport {
                message,
                status: Some(response.status),
            });
        }

        ResponseEnvelope::from_json(&response.body)?.accept()
    }
}
