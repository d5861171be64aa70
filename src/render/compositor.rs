//! Canvas Compositor
//!
//! Rendering is split in two:
//! - `RenderPlan::build` is a pure function of (images, visibility, opacity)
//! - `Surface::render` rasterizes a plan onto the shared preview surface
//!
//! Visible layers are painted at the origin in server order with
//! straight-alpha source-over. With more than one visible layer the base
//! opacity is divided by sqrt(N) so stacked masks stay legible.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::visibility::LayerVisibility;
use crate::error::Result;
use crate::session::DecodedImage;

// ============================================================================
// Constants
// ============================================================================

/// Lowest value of the opacity slider (percent)
pub const MIN_OPACITY_PERCENT: u8 = 20;
/// Highest value of the opacity slider (percent)
pub const MAX_OPACITY_PERCENT: u8 = 100;
/// Initial value of the opacity slider (percent)
pub const DEFAULT_OPACITY_PERCENT: u8 = 85;

// ============================================================================
// Opacity
// ============================================================================

/// User-chosen base opacity, clamped to the slider range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseOpacity(u8);

impl Default for BaseOpacity {
    fn default() -> Self {
        Self(DEFAULT_OPACITY_PERCENT)
    }
}

impl BaseOpacity {
    pub fn from_percent(percent: u8) -> Self {
        Self(percent.clamp(MIN_OPACITY_PERCENT, MAX_OPACITY_PERCENT))
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// Opacity as a fraction in [0.2, 1.0]
    pub fn fraction(self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

/// Per-draw alpha for `visible_count` stacked layers
///
/// `base` for a single layer, `base / sqrt(n)` for n > 1, and 0 when nothing
/// is visible.
pub fn effective_opacity(base: BaseOpacity, visible_count: usize) -> f32 {
    match visible_count {
        0 => 0.0,
        1 => base.fraction(),
        n => base.fraction() / (n as f32).sqrt(),
    }
}

// ============================================================================
// Render Plan
// ============================================================================

/// Draw instructions for one render pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    /// Surface size, taken from the first decoded image
    pub width: u32,
    pub height: u32,
    /// Alpha applied to every draw in this pass
    pub opacity: f32,
    /// Layer indices to paint, in server order
    pub draws: Vec<usize>,
}

impl RenderPlan {
    /// Plan a render; no images yields an empty 0x0 plan
    pub fn build(
        images: &[DecodedImage],
        visibility: &LayerVisibility,
        base: BaseOpacity,
    ) -> Self {
        let Some(first) = images.first() else {
            return Self::empty();
        };
        let draws = visibility.visible_indices(images.len());
        Self {
            width: first.width(),
            height: first.height(),
            opacity: effective_opacity(base, draws.len()),
            draws,
        }
    }

    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            opacity: 0.0,
            draws: Vec::new(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.draws.is_empty()
    }
}

// ============================================================================
// Surface
// ============================================================================

/// The shared preview surface
///
/// `global_alpha` mirrors a 2D context's shared opacity attribute; it is 1.0
/// whenever no render is in progress.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
    global_alpha: f32,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(0, 0),
            global_alpha: 1.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn global_alpha(&self) -> f32 {
        self.global_alpha
    }

    /// Drop all content and shrink to 0x0
    pub fn clear(&mut self) {
        self.pixels = RgbaImage::new(0, 0);
        self.global_alpha = 1.0;
    }

    /// True when every pixel is fully transparent
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    /// Rasterize a plan, always starting from a cleared surface
    pub fn render(&mut self, plan: &RenderPlan, images: &[DecodedImage]) {
        self.pixels = RgbaImage::new(plan.width, plan.height);
        if plan.is_blank() {
            return;
        }

        self.global_alpha = plan.opacity;
        for &index in &plan.draws {
            if let Some(image) = images.get(index) {
                self.draw_over(image.pixels());
            }
        }
        self.global_alpha = 1.0;
        tracing::debug!(
            draws = plan.draws.len(),
            opacity = plan.opacity,
            "surface rendered"
        );
    }

    /// Encode the current surface as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn draw_over(&mut self, source: &RgbaImage) {
        let width = self.pixels.width().min(source.width());
        let height = self.pixels.height().min(source.height());
        let alpha = self.global_alpha;
        for y in 0..height {
            for x in 0..width {
                let src = *source.get_pixel(x, y);
                let dst = self.pixels.get_pixel_mut(x, y);
                *dst = source_over(*dst, src, alpha);
            }
        }
    }
}

/// Straight-alpha "over" with an extra global alpha on the source
fn source_over(dst: Rgba<u8>, src: Rgba<u8>, global_alpha: f32) -> Rgba<u8> {
    let sa = f32::from(src[3]) / 255.0 * global_alpha;
    if sa <= 0.0 {
        return dst;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| {
        let s = f32::from(src[i]);
        let d = f32::from(dst[i]);
        ((s * sa + d * da * (1.0 - sa)) / out_a).round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
