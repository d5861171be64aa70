//! Filesystem export sink for headless hosts

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;

use super::{ExportArtifact, ExportSink};
use crate::config::ClientConfig;
use crate::error::{PrintLayersError, Result};

/// Writes artifacts into a directory; URL artifacts are downloaded first
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    client: Client,
    config: ClientConfig,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, client: Client, config: ClientConfig) -> Self {
        Self {
            dir: dir.into(),
            client,
            config,
        }
    }

    async fn write(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(sanitize_file_name(file_name));
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.config.endpoint(url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PrintLayersError::Transport {
                message: format!("Bundle download failed (HTTP {})", status.as_u16()),
                status: Some(status.as_u16()),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ExportSink for DirectorySink {
    async fn deliver(&self, artifact: ExportArtifact) -> Result<()> {
        let path = match artifact {
            ExportArtifact::Bytes {
                file_name, bytes, ..
            } => self.write(&file_name, &bytes).await?,
            ExportArtifact::Url { file_name, url } => {
                let bytes = self.fetch(&url).await?;
                self.write(&file_name, &bytes).await?
            }
        };
        tracing::info!(path = %path.display(), "export written");
        Ok(())
    }
}

/// Keep only the final path component of a server-influenced name
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    match base {
        "" | "." | ".." => "export.bin".to_string(),
        other => other.to_string(),
    }
}
