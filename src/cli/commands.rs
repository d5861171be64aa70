//! CLI Command Implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::controller::SessionController;
use crate::error::Result;
use crate::export::{DirectorySink, ExportAllOutcome};
use crate::remote::{HttpProcessingService, ProcessingService};
use crate::session::LayerCountHint;

/// Options for the `process` command
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub input: PathBuf,
    pub layers: u32,
    pub opacity: u8,
    pub hide: Vec<usize>,
    pub out: PathBuf,
    pub composite: Option<PathBuf>,
    pub export_all: bool,
}

/// Process one image and write layers / composite to disk
pub async fn process(config: &ClientConfig, options: &ProcessOptions) -> Result<()> {
    info!("Processing image: {}", options.input.display());

    let service = HttpProcessingService::new(config.clone())?;
    let sink = DirectorySink::new(&options.out, service.client().clone(), config.clone());
    let mut controller = SessionController::new(Arc::new(service), Arc::new(sink), config);

    controller.select_path(&options.input).await?;
    controller.set_layer_count(LayerCountHint::from(options.layers));
    controller.set_opacity(options.opacity);

    let outcome = controller.process().await?;
    println!("Layers: {}", outcome.layer_count);
    if let Some(id) = &outcome.session_id {
        println!("Session: {}", id);
    }
    for (i, layer) in controller.session().layers().iter().enumerate() {
        println!("  [{}] layer {} {}", i + 1, layer.layer_number, layer.color_hex);
    }

    for position in &options.hide {
        match position.checked_sub(1) {
            Some(index) => {
                controller.set_layer_visible(index, false)?;
            }
            None => warn!("Layer positions start at 1, ignoring 0"),
        }
    }

    if let Some(path) = &options.composite {
        write_composite(&controller, path).await?;
    }

    if options.export_all {
        match controller.export_all().await? {
            ExportAllOutcome::Bundle { file_name } => {
                println!("Bundle saved: {}", options.out.join(file_name).display())
            }
            ExportAllOutcome::Staggered {
                requested,
                delivered,
            } => println!(
                "Exported {}/{} layers to {}",
                delivered,
                requested,
                options.out.display()
            ),
        }
    } else {
        for index in 0..controller.session().layers().len() {
            if controller.visibility().is_visible(index) {
                let name = controller.export_layer(index).await?;
                println!("Saved: {}", options.out.join(name).display());
            }
        }
    }

    Ok(())
}

async fn write_composite(controller: &SessionController, path: &Path) -> Result<()> {
    let surface = controller.surface();
    let png = surface.to_png()?;
    tokio::fs::write(path, png).await?;
    let total = controller.session().layers().len();
    println!(
        "Composite ({}x{}, {}/{} layers, opacity {}%): {}",
        surface.width(),
        surface.height(),
        controller.visibility().visible_count(total),
        total,
        controller.opacity().percent(),
        path.display()
    );
    Ok(())
}

/// Probe the service and print the outcome
pub async fn health(config: &ClientConfig) -> Result<bool> {
    info!("Checking service health at {}", config.api_url);
    let service = HttpProcessingService::new(config.clone())?;
    let healthy = service.health().await;
    if healthy {
        println!("Service is up: {}", config.api_url);
    } else {
        println!("Service is unreachable: {}", config.api_url);
    }
    Ok(healthy)
}
