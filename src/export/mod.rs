//! Export Manager
//!
//! Exports a single layer as a standalone PNG, or all layers at once. Bulk
//! export prefers the service's bundle archive; without one it falls back to
//! one export per layer, spaced out so the host's download manager is not
//! flooded.
//!
//! Delivery itself is the host's business and sits behind `ExportSink`.

mod sink;

pub use sink::DirectorySink;

use std::time::Duration;

use async_trait::async_trait;
use image::ImageFormat;

use crate::error::{PrintLayersError, Result};
use crate::session::{ProcessingSession, SessionStatus};

/// Prefix of bundle archive names
pub const BUNDLE_PREFIX: &str = "print_layers_";

/// Something the host should download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    /// In-memory file contents
    Bytes {
        file_name: String,
        media_type: String,
        bytes: Vec<u8>,
    },
    /// A file the service serves (possibly a path relative to its base URL)
    Url { file_name: String, url: String },
}

impl ExportArtifact {
    pub fn file_name(&self) -> &str {
        match self {
            ExportArtifact::Bytes { file_name, .. } => file_name,
            ExportArtifact::Url { file_name, .. } => file_name,
        }
    }
}

/// Host-side download mechanism
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn deliver(&self, artifact: ExportArtifact) -> Result<()>;
}

/// How `export_all` was satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportAllOutcome {
    /// One bundle download
    Bundle { file_name: String },
    /// Per-layer downloads; `delivered` may be lower than `requested`
    Staggered { requested: usize, delivered: usize },
}

/// Builds artifacts from a session and hands them to the sink
#[derive(Debug, Clone, Copy)]
pub struct ExportManager {
    stagger: Duration,
}

impl ExportManager {
    pub fn new(stagger: Duration) -> Self {
        Self { stagger }
    }

    pub fn stagger(&self) -> Duration {
        self.stagger
    }

    /// Artifact for one layer, from its original encoded payload
    ///
    /// The name and media type follow the payload's actual format; payloads
    /// that cannot be identified are labelled PNG.
    pub fn layer_artifact(session: &ProcessingSession, index: usize) -> Result<ExportArtifact> {
        ensure_results(session)?;
        let count = session.layers().len();
        let (layer, image) = session
            .layers()
            .get(index)
            .zip(session.decoded_images().get(index))
            .ok_or(PrintLayersError::LayerIndexOutOfRange { index, count })?;
        let format = image::guess_format(image.encoded()).unwrap_or(ImageFormat::Png);
        let extension = format.extensions_str().first().copied().unwrap_or("png");
        Ok(ExportArtifact::Bytes {
            file_name: layer.export_file_name(extension),
            media_type: format.to_mime_type().to_string(),
            bytes: image.encoded().to_vec(),
        })
    }

    /// Artifact for the service bundle, if the service provided one
    pub fn bundle_artifact(session: &ProcessingSession) -> Option<ExportArtifact> {
        let url = session.bundle_url()?;
        let id = session
            .session_id()
            .map(str::to_string)
            .unwrap_or_else(|| session.id().to_string());
        Some(ExportArtifact::Url {
            file_name: format!("{}{}.zip", BUNDLE_PREFIX, id),
            url: url.to_string(),
        })
    }

    pub async fn export_layer(
        &self,
        session: &ProcessingSession,
        index: usize,
        sink: &dyn ExportSink,
    ) -> Result<String> {
        let artifact = Self::layer_artifact(session, index)?;
        let file_name = artifact.file_name().to_string();
        sink.deliver(artifact).await?;
        tracing::info!(session = %session.id(), layer = index, %file_name, "layer exported");
        Ok(file_name)
    }

    /// Export everything: bundle if available, else each layer staggered
    ///
    /// Failures of individual staggered exports are logged, not returned.
    pub async fn export_all(
        &self,
        session: &ProcessingSession,
        sink: &dyn ExportSink,
    ) -> Result<ExportAllOutcome> {
        if let Some(bundle) = Self::bundle_artifact(session) {
            let file_name = bundle.file_name().to_string();
            sink.deliver(bundle).await?;
            tracing::info!(session = %session.id(), %file_name, "bundle exported");
            return Ok(ExportAllOutcome::Bundle { file_name });
        }

        let requested = session.layers().len();
        if requested == 0 {
            return Err(PrintLayersError::NothingToExport);
        }
        ensure_results(session)?;

        let mut delivered = 0;
        for index in 0..requested {
            if index > 0 {
                tokio::time::sleep(self.stagger).await;
            }
            match self.export_layer(session, index, sink).await {
                Ok(_) => delivered += 1,
                Err(e) => tracing::warn!(layer = index, error = %e, "staggered export failed"),
            }
        }
        Ok(ExportAllOutcome::Staggered {
            requested,
            delivered,
        })
    }
}

fn ensure_results(session: &ProcessingSession) -> Result<()> {
    if session.status() == SessionStatus::Result {
        Ok(())
    } else {
        Err(PrintLayersError::InvalidTransition {
            action: "export",
            status: session.status().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        ColorHex, CompletedProcessing, DecodedImage, ProcessedLayer, UploadedFile,
    };
    use image::RgbaImage;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<(Instant, String)>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl ExportSink for Collect {
        async fn deliver(&self, artifact: ExportArtifact) -> Result<()> {
            let name = artifact.file_name().to_string();
            if self.fail_on.as_deref() == Some(name.as_str()) {
                return Err(PrintLayersError::Io(std::io::Error::other("disk full")));
            }
            self.seen.lock().unwrap().push((Instant::now(), name));
            Ok(())
        }
    }

    fn finished(numbers: &[u32], bundle_url: Option<&str>) -> ProcessingSession {
        finished_with(numbers, bundle_url, vec![9u8, 9, 9])
    }

    fn finished_with(
        numbers: &[u32],
        bundle_url: Option<&str>,
        payload: Vec<u8>,
    ) -> ProcessingSession {
        let mut session = ProcessingSession::new();
        session
            .admit(UploadedFile::new("a.png", "image/png", vec![1, 2, 3]))
            .unwrap();
        session.begin_processing().unwrap();
        let encoded: Arc<[u8]> = Arc::from(payload);
        let layers = numbers
            .iter()
            .map(|n| ProcessedLayer::new(*n, ColorHex::parse("#AbCdEf").unwrap(), encoded.clone()))
            .collect();
        let decoded_images = numbers
            .iter()
            .map(|_| DecodedImage::new(RgbaImage::new(2, 2), encoded.clone()))
            .collect();
        session
            .complete(CompletedProcessing {
                layers,
                decoded_images,
                session_id: bundle_url.map(|_| "abc".to_string()),
                bundle_url: bundle_url.map(str::to_string),
                partial: false,
            })
            .unwrap();
        session
    }

    #[test]
    fn test_layer_artifact_names_and_bytes() {
        let session = finished(&[3], None);
        let artifact = ExportManager::layer_artifact(&session, 0).unwrap();
        assert_eq!(artifact.file_name(), "layer_3_abcdef.png");
        match artifact {
            ExportArtifact::Bytes { bytes, .. } => assert_eq!(bytes, vec![9, 9, 9]),
            other => panic!("unexpected artifact {:?}", other),
        }
    }

    #[test]
    fn test_layer_artifact_follows_payload_format() {
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 4))
            .write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();
        let session = finished_with(&[2], None, jpeg);

        match ExportManager::layer_artifact(&session, 0).unwrap() {
            ExportArtifact::Bytes {
                file_name,
                media_type,
                ..
            } => {
                assert_eq!(file_name, "layer_2_abcdef.jpg");
                assert_eq!(media_type, "image/jpeg");
            }
            other => panic!("unexpected artifact {:?}", other),
        }
    }

    #[test]
    fn test_unidentified_payload_is_labelled_png() {
        let session = finished(&[1], None);
        match ExportManager::layer_artifact(&session, 0).unwrap() {
            ExportArtifact::Bytes { media_type, .. } => assert_eq!(media_type, "image/png"),
            other => panic!("unexpected artifact {:?}", other),
        }
    }

    #[test]
    fn test_layer_artifact_out_of_range() {
        let session = finished(&[1, 2], None);
        assert!(matches!(
            ExportManager::layer_artifact(&session, 2),
            Err(PrintLayersError::LayerIndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_layer_artifact_requires_results() {
        let session = ProcessingSession::new();
        assert!(matches!(
            ExportManager::layer_artifact(&session, 0),
            Err(PrintLayersError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_bundle_named_after_session_id() {
        let session = finished(&[1], Some("/files/abc.zip"));
        let bundle = ExportManager::bundle_artifact(&session).unwrap();
        assert_eq!(bundle.file_name(), "print_layers_abc.zip");
        assert!(ExportManager::bundle_artifact(&finished(&[1], None)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_staggered_export_spacing() {
        let manager = ExportManager::new(Duration::from_millis(200));
        let session = finished(&[1, 2, 3], None);
        let sink = Collect::default();

        let outcome = manager.export_all(&session, &sink).await.unwrap();

        assert_eq!(
            outcome,
            ExportAllOutcome::Staggered {
                requested: 3,
                delivered: 3
            }
        );
        let seen = sink.seen.lock().unwrap();
        let gaps: Vec<Duration> = seen.windows(2).map(|w| w[1].0 - w[0].0).collect();
        assert_eq!(gaps, vec![Duration::from_millis(200); 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staggered_export_survives_one_failure() {
        let manager = ExportManager::new(Duration::from_millis(200));
        let session = finished(&[1, 2], None);
        let sink = Collect {
            fail_on: Some("layer_1_abcdef.png".to_string()),
            ..Collect::default()
        };

        let outcome = manager.export_all(&session, &sink).await.unwrap();

        assert_eq!(
            outcome,
            ExportAllOutcome::Staggered {
                requested: 2,
                delivered: 1
            }
        );
    }

    #[tokio::test]
    async fn test_export_all_empty_session() {
        let manager = ExportManager::new(Duration::ZERO);
        let sink = Collect::default();
        assert!(matches!(
            manager.export_all(&ProcessingSession::new(), &sink).await,
            Err(PrintLayersError::NothingToExport)
        ));
    }
}
