//! printlayers - Print Layer Session Controller
//!
//! Turns a user-supplied raster image into color-separated print layers by
//! delegating the analysis to a remote service, then lets the user preview,
//! toggle and export those layers.
//!
//! # Architecture
//!
//! Data flows one way:
//! - Upload validation admits image files into a `ProcessingSession`
//! - The orchestrator sends the file to the service with simulated progress
//! - Returned layers are decoded in server order
//! - The compositor draws visible layers onto one shared surface
//! - The export manager reads the finished session independently

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod notify;
pub mod processing;
pub mod remote;
pub mod render;
pub mod session;

pub use config::ClientConfig;
pub use controller::{Command, SessionController};
pub use error::{PrintLayersError, Result};
