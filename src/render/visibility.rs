//! Layer Visibility
//!
//! One toggle per layer, keyed by array position. A layer without an entry
//! counts as visible.

use std::collections::HashMap;

use crate::error::{PrintLayersError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerVisibility {
    entries: HashMap<usize, bool>,
    layer_count: usize,
}

impl LayerVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh toggles for a newly displayed result, all visible
    pub fn reset_for(&mut self, layer_count: usize) {
        self.entries = (0..layer_count).map(|i| (i, true)).collect();
        self.layer_count = layer_count;
    }

    /// Drop all toggles (no result displayed)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.layer_count = 0;
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.entries.get(&index).copied().unwrap_or(true)
    }

    /// Flip one layer; returns its new visibility
    pub fn toggle(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        let visible = !self.is_visible(index);
        self.entries.insert(index, visible);
        Ok(visible)
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.check_index(index)?;
        self.entries.insert(index, visible);
        Ok(())
    }

    /// Indices of visible layers among the first `len`, in order
    pub fn visible_indices(&self, len: usize) -> Vec<usize> {
        (0..len).filter(|&i| self.is_visible(i)).collect()
    }

    pub fn visible_count(&self, len: usize) -> usize {
        (0..len).filter(|&i| self.is_visible(i)).count()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.layer_count {
            Ok(())
        } else {
            Err(PrintLayersError::LayerIndexOutOfRange {
                index,
                count: self.layer_count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_visible() {
        let visibility = LayerVisibility::new();
        assert!(visibility.is_visible(0));
        assert!(visibility.is_visible(42));
        assert_eq!(visibility.visible_indices(3), vec![0, 1, 2]);
    }

    #[test]
    fn test_toggle_flips_one_entry() {
        let mut visibility = LayerVisibility::new();
        visibility.reset_for(4);

        assert!(!visibility.toggle(1).unwrap());
        assert_eq!(visibility.visible_indices(4), vec![0, 2, 3]);
        assert!(visibility.toggle(1).unwrap());
        assert_eq!(visibility.visible_count(4), 4);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut visibility = LayerVisibility::new();
        visibility.reset_for(2);
        assert!(visibility.toggle(2).is_err());
        assert!(visibility.set_visible(5, false).is_err());
    }

    #[test]
    fn test_reset_restores_all_visible() {
        let mut visibility = LayerVisibility::new();
        visibility.reset_for(3);
        visibility.set_visible(0, false).unwrap();
        visibility.reset_for(3);
        assert_eq!(visibility.visible_count(3), 3);
    }
}
