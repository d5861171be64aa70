//! Preview rendering
//!
//! Compositing of decoded layers onto the shared preview surface, and the
//! per-layer visibility toggles that feed it.

pub mod compositor;
pub mod visibility;

pub use compositor::{
    effective_opacity, BaseOpacity, RenderPlan, Surface, DEFAULT_OPACITY_PERCENT,
    MAX_OPACITY_PERCENT, MIN_OPACITY_PERCENT,
};
pub use visibility::LayerVisibility;
