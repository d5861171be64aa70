//! Processed and decoded layers
//!
//! A `ProcessedLayer` is what the service returned; a `DecodedImage` is the
//! bitmap produced from it. Both are immutable once built.

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{PrintLayersError, Result};

/// Representative ink color of a layer, six lowercase hex digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorHex(String);

impl ColorHex {
    /// Parse a color, tolerating a leading `#` and any letter case
    pub fn parse(value: &str) -> Result<Self> {
        let digits = value.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PrintLayersError::InvalidColor {
                value: value.to_string(),
            });
        }
        Ok(Self(digits.to_ascii_lowercase()))
    }

    /// Hex digits without the leading `#`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl TryFrom<String> for ColorHex {
    type Error = PrintLayersError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ColorHex> for String {
    fn from(color: ColorHex) -> Self {
        color.0
    }
}

/// One color-separated layer as returned by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedLayer {
    /// 1-based ordinal assigned by the service; never used for indexing
    pub layer_number: u32,
    pub color_hex: ColorHex,
    /// Encoded image payload as delivered
    pub image_data: Arc<[u8]>,
}

impl ProcessedLayer {
    pub fn new(layer_number: u32, color_hex: ColorHex, image_data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            layer_number,
            color_hex,
            image_data: image_data.into(),
        }
    }

    /// File name used when this layer is exported on its own
    pub fn export_file_name(&self, extension: &str) -> String {
        format!(
            "layer_{}_{}.{}",
            self.layer_number,
            self.color_hex.as_str(),
            extension
        )
    }
}

/// Fully loaded bitmap for one layer
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbaImage,
    encoded: Arc<[u8]>,
}

impl DecodedImage {
    pub fn new(pixels: RgbaImage, encoded: Arc<[u8]>) -> Self {
        Self { pixels, encoded }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// The payload this bitmap was decoded from
    pub fn encoded(&self) -> &Arc<[u8]> {
        &self.encoded
    }
}
