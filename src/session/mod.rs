//! Session Module
//!
//! The in-memory record of one upload → processing → export lifecycle:
//! - Upload validation and local preview
//! - Processed / decoded layers
//! - The session state machine
//! - Processing controls restored on reset

pub mod controls;
pub mod layer;
pub mod state;
pub mod upload;

pub use controls::{LayerCountHint, SessionControls, AUTO_LAYER_COUNT, DEFAULT_TOLERANCE};
pub use layer::{ColorHex, DecodedImage, ProcessedLayer};
pub use state::{
    Attempt, CompletedProcessing, ProcessingSession, SessionStatus, INTERRUPTED_MESSAGE,
};
pub use upload::{media_type_for_path, Preview, UploadValidator, UploadedFile};
