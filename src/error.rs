//! Error handling for printlayers
//!
//! Every failure is surfaced to the user through a notification, so each
//! variant carries a user-facing message alongside its error code.

use thiserror::Error;

/// Result type alias for printlayers operations
pub type Result<T> = std::result::Result<T, PrintLayersError>;

/// Main error type for printlayers operations
#[derive(Error, Debug)]
pub enum PrintLayersError {
    // Upload Errors
    #[error("Please select an image file (got '{media_type}')")]
    Validation { name: String, media_type: String },

    // Remote Processing Errors
    #[error("{message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    #[error("{message}")]
    Envelope { message: String },

    // Decode Errors
    #[error("Layer {layer_index} did not finish decoding within {timeout_ms}ms")]
    DecodeStall { layer_index: usize, timeout_ms: u64 },

    #[error("Layer {layer_index} could not be decoded: {reason}")]
    Decode { layer_index: usize, reason: String },

    // Session Errors
    #[error("No file selected")]
    NoSourceFile,

    #[error("Processing already in progress")]
    ProcessingInProgress,

    #[error("Cannot {action} while session is {status}")]
    InvalidTransition {
        action: &'static str,
        status: String,
    },

    #[error("Layer index {index} out of range (session has {count} layers)")]
    LayerIndexOutOfRange { index: usize, count: usize },

    // Export Errors
    #[error("Nothing to export: no bundle and no layers available")]
    NothingToExport,

    #[error("Invalid layer color '{value}': expected 6 hex digits")]
    InvalidColor { value: String },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PrintLayersError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            PrintLayersError::Validation { .. } => "VALIDATION_ERROR",
            PrintLayersError::Transport { .. } => "TRANSPORT_ERROR",
            PrintLayersError::Envelope { .. } => "ENVELOPE_ERROR",
            PrintLayersError::DecodeStall { .. } => "DECODE_STALL",
            PrintLayersError::Decode { .. } => "DECODE_ERROR",
            PrintLayersError::NoSourceFile => "NO_SOURCE_FILE",
            PrintLayersError::ProcessingInProgress => "PROCESSING_IN_PROGRESS",
            PrintLayersError::InvalidTransition { .. } => "INVALID_TRANSITION",
            PrintLayersError::LayerIndexOutOfRange { .. } => "LAYER_INDEX_OUT_OF_RANGE",
            PrintLayersError::NothingToExport => "NOTHING_TO_EXPORT",
            PrintLayersError::InvalidColor { .. } => "INVALID_COLOR",
            PrintLayersError::Config { .. } => "CONFIG_ERROR",
            PrintLayersError::Io(_) => "IO_ERROR",
            PrintLayersError::Serialization(_) => "SERIALIZATION_ERROR",
            PrintLayersError::Http(_) => "HTTP_ERROR",
            PrintLayersError::Image(_) => "IMAGE_ERROR",
        }
    }

    /// Check if the user can recover by retrying or picking another file
    pub fn is_recoverable(&self) -> bool {
        match self {
            PrintLayersError::Validation { .. } => true,
            PrintLayersError::Transport { .. } => true,
            PrintLayersError::Envelope { .. } => true,
            PrintLayersError::DecodeStall { .. } => true,
            PrintLayersError::Decode { .. } => true,
            PrintLayersError::NoSourceFile => true,
            PrintLayersError::ProcessingInProgress => true,
            PrintLayersError::Http(_) => true,
            _ => false,
        }
    }

    /// Get the message shown to the user in a notification
    ///
    /// Server-supplied messages are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            PrintLayersError::Transport { message, .. } => message.clone(),
            PrintLayersError::Envelope { message } => message.clone(),
            PrintLayersError::DecodeStall { layer_index, .. } => format!(
                "Layer {} took too long to load. Please try processing again.",
                layer_index + 1
            ),
            PrintLayersError::Http(e) if e.is_timeout() => {
                "The processing service did not answer in time.".to_string()
            }
            PrintLayersError::Http(e) if e.is_connect() => {
                "Cannot reach the processing service. Is it running?".to_string()
            }
            _ => self.to_string(),
        }
    }
}
