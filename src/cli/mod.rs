//! CLI Module
//!
//! Headless driver for the session controller.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// printlayers - split an image into print layers via the processing service
#[derive(Parser, Debug)]
#[command(name = "printlayers")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process an image into layers and export the results
    #[command(name = "process")]
    Process {
        /// Input image
        input: PathBuf,

        /// Number of layers (0 = let the service decide)
        #[arg(short, long, default_value_t = 0)]
        layers: u32,

        /// Base preview opacity in percent (20-100)
        #[arg(long, default_value_t = crate::render::DEFAULT_OPACITY_PERCENT)]
        opacity: u8,

        /// 1-based layer positions to hide in the composite
        #[arg(long, value_delimiter = ',')]
        hide: Vec<usize>,

        /// Output directory for exported layers
        #[arg(short, long, default_value = "layers")]
        out: PathBuf,

        /// Write the composite preview to this PNG file
        #[arg(long)]
        composite: Option<PathBuf>,

        /// Export all layers (bundle if available)
        #[arg(long)]
        export_all: bool,
    },

    /// Check whether the processing service is up
    #[command(name = "health")]
    Health,
}
