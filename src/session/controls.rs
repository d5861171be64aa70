//! User-adjustable controls that survive across processing attempts
//! and are restored to defaults on reset.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default color tolerance shown by the tolerance control
pub const DEFAULT_TOLERANCE: u32 = 30;

/// Wire value meaning "let the service pick the layer count"
pub const AUTO_LAYER_COUNT: u32 = 0;

/// Layer-count hint sent with each processing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum LayerCountHint {
    /// Service auto-selects the count
    #[default]
    Auto,
    /// Exactly this many layers
    Exact(u32),
}

impl LayerCountHint {
    /// Value sent in the `num_layers` form field
    pub fn wire_value(self) -> u32 {
        match self {
            LayerCountHint::Auto => AUTO_LAYER_COUNT,
            LayerCountHint::Exact(n) => n,
        }
    }
}

impl From<u32> for LayerCountHint {
    fn from(value: u32) -> Self {
        if value == AUTO_LAYER_COUNT {
            LayerCountHint::Auto
        } else {
            LayerCountHint::Exact(value)
        }
    }
}

impl From<LayerCountHint> for u32 {
    fn from(hint: LayerCountHint) -> Self {
        hint.wire_value()
    }
}

impl fmt::Display for LayerCountHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerCountHint::Auto => write!(f, "auto"),
            LayerCountHint::Exact(n) => write!(f, "{}", n),
        }
    }
}

/// The processing controls a user can set before pressing "process"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionControls {
    pub layer_count: LayerCountHint,
    pub tolerance: u32,
}

impl Default for SessionControls {
    fn default() -> Self {
        Self {
            layer_count: LayerCountHint::Auto,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SessionControls {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
