//! Processing pipeline
//!
//! Orchestrates one remote processing attempt, the simulated progress that
//! accompanies it, and the ordered decode of the returned layers.

pub mod decoder;
pub mod orchestrator;
pub mod progress;

pub use decoder::LayerImageDecoder;
pub use orchestrator::{ProcessingOrchestrator, ProcessingOutcome};
pub use progress::{
    NoopProgress, ProgressIndicator, ProgressObserver, ProgressSimulator, ProgressSnapshot,
    COMPLETE, NEAR_COMPLETE, SIMULATED_CEILING, SIMULATED_START,
};
