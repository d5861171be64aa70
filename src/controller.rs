//! Session Controller
//!
//! Framework-agnostic command layer. A host translates its UI events into
//! `Command`s (or calls the methods directly); the controller updates the
//! session, re-renders the preview surface and reports every failure
//! through the `Notifier`.

use std::path::Path;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::{PrintLayersError, Result};
use crate::export::{ExportAllOutcome, ExportManager, ExportSink};
use crate::notify::{LogNotifier, Notification, Notifier};
use crate::processing::{
    ProcessingOrchestrator, ProcessingOutcome, ProgressIndicator, ProgressObserver,
};
use crate::remote::ProcessingService;
use crate::render::{BaseOpacity, LayerVisibility, RenderPlan, Surface};
use crate::session::{
    LayerCountHint, Preview, ProcessingSession, SessionControls, UploadValidator, UploadedFile,
};

/// User actions a host can forward to the controller
#[derive(Debug, Clone)]
pub enum Command {
    SelectFile(UploadedFile),
    SetLayerCount(LayerCountHint),
    SetTolerance(u32),
    SetOpacity(u8),
    Process,
    ToggleLayer(usize),
    ExportLayer(usize),
    ExportAll,
    Reset,
}

/// Owns the live session and everything derived from it
pub struct SessionController {
    session: ProcessingSession,
    controls: SessionControls,
    visibility: LayerVisibility,
    opacity: BaseOpacity,
    surface: Surface,
    preview: Option<Preview>,
    validator: UploadValidator,
    orchestrator: ProcessingOrchestrator,
    exporter: ExportManager,
    sink: Arc<dyn ExportSink>,
    notifier: Arc<dyn Notifier>,
    progress: ProgressIndicator,
}

impl SessionController {
    pub fn new(
        service: Arc<dyn ProcessingService>,
        sink: Arc<dyn ExportSink>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            session: ProcessingSession::new(),
            controls: SessionControls::default(),
            visibility: LayerVisibility::new(),
            opacity: BaseOpacity::default(),
            surface: Surface::new(),
            preview: None,
            validator: UploadValidator::new(),
            orchestrator: ProcessingOrchestrator::new(service, config.clone()),
            exporter: ExportManager::new(config.export_stagger()),
            sink,
            notifier: Arc::new(LogNotifier),
            progress: ProgressIndicator::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_progress_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = ProgressIndicator::new(observer);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn session(&self) -> &ProcessingSession {
        &self.session
    }

    pub fn controls(&self) -> SessionControls {
        self.controls
    }

    pub fn visibility(&self) -> &LayerVisibility {
        &self.visibility
    }

    pub fn opacity(&self) -> BaseOpacity {
        self.opacity
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn progress(&self) -> &ProgressIndicator {
        &self.progress
    }

    /// Whether the "process" trigger should be enabled
    pub fn trigger_enabled(&self) -> bool {
        self.session.can_process()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Dispatch one command
    pub async fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SelectFile(file) => self.select_file(file).await,
            Command::SetLayerCount(hint) => {
                self.set_layer_count(hint);
                Ok(())
            }
            Command::SetTolerance(tolerance) => {
                self.set_tolerance(tolerance);
                Ok(())
            }
            Command::SetOpacity(percent) => {
                self.set_opacity(percent);
                Ok(())
            }
            Command::Process => self.process().await.map(|_| ()),
            Command::ToggleLayer(index) => self.toggle_layer(index).map(|_| ()),
            Command::ExportLayer(index) => self.export_layer(index).await.map(|_| ()),
            Command::ExportAll => self.export_all().await.map(|_| ()),
            Command::Reset => self.reset(),
        }
    }

    /// Validate a candidate and, if it is an image, start a fresh session
    ///
    /// A rejected candidate leaves the current session untouched.
    pub async fn select_file(&mut self, candidate: UploadedFile) -> Result<()> {
        let file = match self.validator.accept(candidate) {
            Ok(file) => file,
            Err(err) => return Err(self.report(err)),
        };
        let preview = match Preview::load(&file).await {
            Ok(preview) => Some(preview),
            Err(e) => {
                tracing::warn!(file = file.name(), error = %e, "could not build local preview");
                None
            }
        };
        let name = file.name().to_string();
        if let Err(err) = self.session.admit(file) {
            return Err(self.report(err));
        }

        self.preview = preview;
        self.visibility.clear();
        self.surface.clear();
        self.progress.hide();
        self.notifier
            .notify(Notification::info(format!("Selected {}", name)));
        Ok(())
    }

    /// Read a file from disk and select it
    pub async fn select_path(&mut self, path: &Path) -> Result<()> {
        match UploadedFile::from_path(path).await {
            Ok(file) => self.select_file(file).await,
            Err(err) => Err(self.report(err)),
        }
    }

    pub fn set_layer_count(&mut self, hint: LayerCountHint) {
        self.controls.layer_count = hint;
    }

    pub fn set_tolerance(&mut self, tolerance: u32) {
        self.controls.tolerance = tolerance;
    }

    /// Move the opacity slider and redraw
    pub fn set_opacity(&mut self, percent: u8) {
        self.opacity = BaseOpacity::from_percent(percent);
        self.render();
    }

    /// Send the current file for processing and display the result
    pub async fn process(&mut self) -> Result<ProcessingOutcome> {
        if self.session.is_processing() {
            return Err(self.report(PrintLayersError::ProcessingInProgress));
        }
        self.visibility.clear();
        self.surface.clear();

        let result = self
            .orchestrator
            .run(&mut self.session, self.controls.layer_count, &self.progress)
            .await;

        match result {
            Ok(outcome) => {
                self.visibility.reset_for(self.session.layers().len());
                self.render();
                let message = if outcome.partial {
                    format!(
                        "Processed {} layers (some colors could not be separated)",
                        outcome.layer_count
                    )
                } else {
                    format!("Processed {} layers", outcome.layer_count)
                };
                self.notifier.notify(Notification::success(message));
                Ok(outcome)
            }
            Err(err) => Err(self.report(err)),
        }
    }

    /// Flip one layer's visibility and redraw; returns the new visibility
    pub fn toggle_layer(&mut self, index: usize) -> Result<bool> {
        if !self.session.has_results() {
            return Err(self.report(PrintLayersError::InvalidTransition {
                action: "toggle a layer",
                status: self.session.status().to_string(),
            }));
        }
        match self.visibility.toggle(index) {
            Ok(visible) => {
                self.render();
                Ok(visible)
            }
            Err(err) => Err(self.report(err)),
        }
    }

    /// Explicitly show or hide one layer and redraw
    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        match self.visibility.set_visible(index, visible) {
            Ok(()) => {
                self.render();
                Ok(())
            }
            Err(err) => Err(self.report(err)),
        }
    }

    /// Recompute the composite from the current session and visibility
    pub fn render(&mut self) -> RenderPlan {
        let images = self.session.decoded_images();
        let plan = RenderPlan::build(images, &self.visibility, self.opacity);
        if images.is_empty() {
            self.surface.clear();
        } else {
            self.surface.render(&plan, images);
        }
        plan
    }

    pub async fn export_layer(&mut self, index: usize) -> Result<String> {
        let result = self
            .exporter
            .export_layer(&self.session, index, self.sink.as_ref())
            .await;
        match result {
            Ok(name) => {
                self.notifier
                    .notify(Notification::success(format!("Exported {}", name)));
                Ok(name)
            }
            Err(err) => Err(self.report(err)),
        }
    }

    pub async fn export_all(&mut self) -> Result<ExportAllOutcome> {
        let result = self
            .exporter
            .export_all(&self.session, self.sink.as_ref())
            .await;
        match result {
            Ok(outcome) => {
                let message = match &outcome {
                    ExportAllOutcome::Bundle { file_name } => format!("Downloading {}", file_name),
                    ExportAllOutcome::Staggered { requested, .. } => {
                        format!("Exporting {} layers", requested)
                    }
                };
                self.notifier.notify(Notification::success(message));
                Ok(outcome)
            }
            Err(err) => Err(self.report(err)),
        }
    }

    /// Discard the session and restore every control to its default
    pub fn reset(&mut self) -> Result<()> {
        if let Err(err) = self.session.reset() {
            return Err(self.report(err));
        }
        self.controls.reset();
        self.opacity = BaseOpacity::default();
        self.visibility.clear();
        self.surface.clear();
        self.preview = None;
        self.progress.hide();
        Ok(())
    }

    /// Probe the service; only the boolean outcome matters
    pub async fn check_health(&self) -> bool {
        let healthy = self.orchestrator.service().health().await;
        tracing::info!(healthy, "health check");
        healthy
    }

    fn report(&self, err: PrintLayersError) -> PrintLayersError {
        tracing::debug!(code = err.error_code(), error = %err, "reporting error to user");
        self.notifier.notify(Notification::error(err.user_message()));
        err
    }
}
