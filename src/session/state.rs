//! Processing Session State Machine
//!
//! One `ProcessingSession` describes the whole upload → processing → result
//! lifecycle. Fields are private; components move the session forward
//! through the mutators below, each of which checks the current status.
//!
//! ```text
//! Idle --admit--> Ready --begin_processing--> Processing --complete--> Result
//!                   ^                             |
//!                   +------ fail_attempt ---------+--- fail_terminal --> Error
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::layer::{DecodedImage, ProcessedLayer};
use super::upload::UploadedFile;
use crate::error::{PrintLayersError, Result};

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No file selected (initial state)
    #[default]
    Idle,
    /// File validated, not yet processed
    Ready,
    /// Request in flight
    Processing,
    /// Layers available and browsable
    Result,
    /// Attempt failed after the service answered
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => write!(f, "idle"),
            SessionStatus::Ready => write!(f, "ready"),
            SessionStatus::Processing => write!(f, "processing"),
            SessionStatus::Result => write!(f, "result"),
            SessionStatus::Error => write!(f, "error"),
        }
    }
}

/// What the service returned for a successful attempt
#[derive(Debug, Clone)]
pub struct CompletedProcessing {
    pub layers: Vec<ProcessedLayer>,
    pub decoded_images: Vec<DecodedImage>,
    pub session_id: Option<String>,
    pub bundle_url: Option<String>,
    pub partial: bool,
}

/// The single live processing session
#[derive(Debug, Clone)]
pub struct ProcessingSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    status: SessionStatus,
    source_file: Option<UploadedFile>,
    layers: Vec<ProcessedLayer>,
    decoded_images: Vec<DecodedImage>,
    session_id: Option<String>,
    bundle_url: Option<String>,
    last_error: Option<String>,
    partial: bool,
}

impl Default for ProcessingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status: SessionStatus::Idle,
            source_file: None,
            layers: Vec::new(),
            decoded_images: Vec::new(),
            session_id: None,
            bundle_url: None,
            last_error: None,
            partial: false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Local identifier, used for log correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn source_file(&self) -> Option<&UploadedFile> {
        self.source_file.as_ref()
    }

    pub fn layers(&self) -> &[ProcessedLayer] {
        &self.layers
    }

    pub fn decoded_images(&self) -> &[DecodedImage] {
        &self.decoded_images
    }

    /// Identifier assigned by the service (`file_id`)
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn bundle_url(&self) -> Option<&str> {
        self.bundle_url.as_deref()
    }

    /// Message of the most recent failed attempt
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether the service reported `partial_success`
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn is_processing(&self) -> bool {
        self.status == SessionStatus::Processing
    }

    pub fn has_results(&self) -> bool {
        self.status == SessionStatus::Result
    }

    /// Whether a processing request may be started now
    pub fn can_process(&self) -> bool {
        self.source_file.is_some()
            && matches!(
                self.status,
                SessionStatus::Ready | SessionStatus::Result | SessionStatus::Error
            )
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    /// Replace this session with a fresh one holding `file`
    ///
    /// State transition: any (except Processing) -> Ready
    pub fn admit(&mut self, file: UploadedFile) -> Result<()> {
        self.ensure_not_processing("select a new file")?;
        let mut fresh = Self::new();
        tracing::info!(
            session = %fresh.id,
            file = file.name(),
            bytes = file.len(),
            sha256 = file.sha256(),
            "file admitted"
        );
        fresh.source_file = Some(file);
        fresh.status = SessionStatus::Ready;
        *self = fresh;
        Ok(())
    }

    /// Start an attempt, hiding any prior results
    ///
    /// State transition: Ready | Result | Error -> Processing
    pub fn begin_processing(&mut self) -> Result<()> {
        if self.source_file.is_none() {
            return Err(PrintLayersError::NoSourceFile);
        }
        match self.status {
            SessionStatus::Processing => Err(PrintLayersError::ProcessingInProgress),
            SessionStatus::Ready | SessionStatus::Result | SessionStatus::Error => {
                self.clear_results();
                self.last_error = None;
                self.status = SessionStatus::Processing;
                tracing::info!(session = %self.id, "processing started");
                Ok(())
            }
            SessionStatus::Idle => Err(PrintLayersError::NoSourceFile),
        }
    }

    /// Start an attempt whose outcome is settled through the returned guard
    ///
    /// Dropping the guard while the session is still processing (a cancelled
    /// future, an early return) records the attempt as failed.
    pub fn begin_attempt(&mut self) -> Result<Attempt<'_>> {
        self.begin_processing()?;
        Ok(Attempt { session: self })
    }

    /// Store the results of a successful attempt
    ///
    /// State transition: Processing -> Result
    pub fn complete(&mut self, completed: CompletedProcessing) -> Result<()> {
        self.ensure_status(SessionStatus::Processing, "complete processing")?;
        if completed.layers.len() != completed.decoded_images.len() {
            return Err(PrintLayersError::Envelope {
                message: format!(
                    "Decoded {} images for {} layers",
                    completed.decoded_images.len(),
                    completed.layers.len()
                ),
            });
        }
        self.layers = completed.layers;
        self.decoded_images = completed.decoded_images;
        self.session_id = completed.session_id;
        self.bundle_url = completed.bundle_url;
        self.partial = completed.partial;
        self.status = SessionStatus::Result;
        tracing::info!(
            session = %self.id,
            layers = self.layers.len(),
            partial = self.partial,
            "processing complete"
        );
        Ok(())
    }

    /// Record a failed request; the file stays selected for a retry
    ///
    /// State transition: Processing -> Ready
    pub fn fail_attempt(&mut self, message: impl Into<String>) {
        self.fail_into(SessionStatus::Ready, message.into());
    }

    /// Record a failure that happened after the service answered
    ///
    /// State transition: Processing -> Error
    pub fn fail_terminal(&mut self, message: impl Into<String>) {
        self.fail_into(SessionStatus::Error, message.into());
    }

    /// Discard everything and return to Idle
    ///
    /// State transition: any (except Processing) -> Idle
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_not_processing("reset")?;
        let age_ms = (Utc::now() - self.created_at).num_milliseconds();
        tracing::info!(session = %self.id, from = %self.status, age_ms, "session reset");
        *self = Self::new();
        Ok(())
    }

    fn fail_into(&mut self, status: SessionStatus, message: String) {
        if self.status != SessionStatus::Processing {
            tracing::warn!(
                session = %self.id,
                status = %self.status,
                "failure reported outside of processing"
            );
        }
        tracing::warn!(session = %self.id, to = %status, error = %message, "processing failed");
        self.clear_results();
        self.last_error = Some(message);
        self.status = status;
    }

    fn clear_results(&mut self) {
        self.layers.clear();
        self.decoded_images.clear();
        self.session_id = None;
        self.bundle_url = None;
        self.partial = false;
    }

    fn ensure_status(&self, expected: SessionStatus, action: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(PrintLayersError::InvalidTransition {
                action,
                status: self.status.to_string(),
            })
        }
    }

    fn ensure_not_processing(&self, action: &'static str) -> Result<()> {
        if self.status == SessionStatus::Processing {
            Err(PrintLayersError::InvalidTransition {
                action,
                status: self.status.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Message recorded when an attempt ends without an outcome
pub const INTERRUPTED_MESSAGE: &str = "Processing was interrupted";

/// One in-flight processing attempt
///
/// Holds the session in `Processing`. Every way out of the attempt leaves
/// the session in `Result`, `Ready` or `Error`.
#[derive(Debug)]
pub struct Attempt<'a> {
    session: &'a mut ProcessingSession,
}

impl Attempt<'_> {
    pub fn session(&self) -> &ProcessingSession {
        self.session
    }

    /// Commit the results; a rejected commit fails the attempt terminally
    pub fn complete(mut self, completed: CompletedProcessing) -> Result<()> {
        match self.session.complete(completed) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.session.fail_terminal(err.user_message());
                Err(err)
            }
        }
    }

    /// Processing -> Ready
    pub fn fail_attempt(mut self, message: impl Into<String>) {
        self.session.fail_attempt(message);
    }

    /// Processing -> Error
    pub fn fail_terminal(mut self, message: impl Into<String>) {
        self.session.fail_terminal(message);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if self.session.is_processing() {
            self.session.fail_attempt(INTERRUPTED_MESSAGE);
        }
    }
}
