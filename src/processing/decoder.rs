//! Layer Image Decoder
//!
//! Decodes each layer payload into an RGBA bitmap, one at a time and in the
//! order the service returned them, so the output is index-aligned with the
//! input. Every decode is bounded by a timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{PrintLayersError, Result};
use crate::session::{DecodedImage, ProcessedLayer};

/// Sequential, timeout-bounded layer decoder
#[derive(Debug, Clone, Copy)]
pub struct LayerImageDecoder {
    timeout: Duration,
}

impl LayerImageDecoder {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Decode all layers in order; the first failure aborts the rest
    pub async fn decode_all(&self, layers: &[ProcessedLayer]) -> Result<Vec<DecodedImage>> {
        let mut decoded: Vec<DecodedImage> = Vec::with_capacity(layers.len());
        for (index, layer) in layers.iter().enumerate() {
            let image = self.decode_one(index, layer).await?;
            if let Some(first) = decoded.first() {
                if first.dimensions() != image.dimensions() {
                    tracing::warn!(
                        layer = index,
                        expected = ?first.dimensions(),
                        actual = ?image.dimensions(),
                        "layer dimensions differ from first layer"
                    );
                }
            }
            decoded.push(image);
        }
        tracing::debug!(count = decoded.len(), "decoded all layers");
        Ok(decoded)
    }

    async fn decode_one(&self, index: usize, layer: &ProcessedLayer) -> Result<DecodedImage> {
        let payload = Arc::clone(&layer.image_data);
        let job = async move {
            let decoded = tokio::task::spawn_blocking(move || {
                image::load_from_memory(&payload)
                    .map(|img| DecodedImage::new(img.to_rgba8(), payload.clone()))
            })
            .await
            .map_err(|join_err| PrintLayersError::Decode {
                layer_index: index,
                reason: join_err.to_string(),
            })?;
            decoded.map_err(|image_err| PrintLayersError::Decode {
                layer_index: index,
                reason: image_err.to_string(),
            })
        };
        bounded(index, self.timeout, job).await
    }
}

/// Await one decode, converting an overrun into `DecodeStall`
async fn bounded<F>(index: usize, timeout: Duration, decode: F) -> Result<DecodedImage>
where
    F: Future<Output = Result<DecodedImage>>,
{
    match tokio::time::timeout(timeout, decode).await {
        Ok(result) => result,
        Err(_) => Err(PrintLayersError::DecodeStall {
            layer_index: index,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ColorHex;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_layer(number: u32, width: u32, height: u32, shade: u8) -> ProcessedLayer {
        let img = RgbaImage::from_pixel(width, height, Rgba([shade, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        ProcessedLayer::new(number, ColorHex::parse("ff0000").unwrap(), bytes)
    }

    #[tokio::test]
    async fn test_decodes_in_server_order() {
        let layers = vec![
            png_layer(2, 4, 3, 20),
            png_layer(1, 4, 3, 10),
            png_layer(7, 4, 3, 70),
        ];
        let decoded = LayerImageDecoder::new(Duration::from_secs(5))
            .decode_all(&layers)
            .await
            .unwrap();

        assert_eq!(decoded.len(), layers.len());
        let shades: Vec<u8> = decoded.iter().map(|d| d.pixels().get_pixel(0, 0)[0]).collect();
        assert_eq!(shades, vec![20, 10, 70]);
        assert_eq!(decoded[0].dimensions(), (4, 3));
        assert!(Arc::ptr_eq(decoded[1].encoded(), &layers[1].image_data));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let decoded = LayerImageDecoder::new(Duration::from_secs(1))
            .decode_all(&[])
            .await
            .unwrap();
        assert!(decoded.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_payload_reports_index() {
        let layers = vec![
            png_layer(1, 2, 2, 1),
            ProcessedLayer::new(2, ColorHex::parse("00ff00").unwrap(), vec![0u8; 16]),
        ];
        let err = LayerImageDecoder::new(Duration::from_secs(5))
            .decode_all(&layers)
            .await
            .unwrap_err();
        match err {
            PrintLayersError::Decode { layer_index, .. } => assert_eq!(layer_index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_decode_times_out() {
        let err = bounded(4, Duration::from_secs(10), std::future::pending())
            .await
            .unwrap_err();
        match err {
            PrintLayersError::DecodeStall {
                layer_index,
                timeout_ms,
            } => {
                assert_eq!(layer_index, 4);
                assert_eq!(timeout_ms, 10_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
