//! Visibility layers
//!
//! A surface is drawn by a camera when their layer masks intersect. Layer 0
//! is the default every object and camera starts with; layers 1 and 2 tag
//! the left and right eye planes.

use crate::uv::Eye;

pub const DEFAULT_LAYER: u32 = 0;
pub const LEFT_EYE_LAYER: u32 = 1;
pub const RIGHT_EYE_LAYER: u32 = 2;

/// 32-slot visibility bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layers {
    mask: u32,
}

impl Default for Layers {
    fn default() -> Self {
        Self { mask: 1 << DEFAULT_LAYER }
    }
}

impl Layers {
    pub const NONE: Layers = Layers { mask: 0 };
    pub const ALL: Layers = Layers { mask: u32::MAX };

    /// Mask containing only `layer`
    pub fn only(layer: u32) -> Self {
        let mut layers = Self::NONE;
        layers.set(layer);
        layers
    }

    /// The layer carrying one eye's plane
    pub fn eye_layer(eye: Eye) -> u32 {
        match eye {
            Eye::Left => LEFT_EYE_LAYER,
            Eye::Right => RIGHT_EYE_LAYER,
        }
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Replace the mask with a single layer
    pub fn set(&mut self, layer: u32) {
        self.mask = bit(layer);
    }

    pub fn enable(&mut self, layer: u32) {
        self.mask |= bit(layer);
    }

    pub fn disable(&mut self, layer: u32) {
        self.mask &= !bit(layer);
    }

    pub fn enable_all(&mut self) {
        self.mask = u32::MAX;
    }

    pub fn is_enabled(&self, layer: u32) -> bool {
        self.mask & bit(layer) != 0
    }

    /// True when the two masks share at least one layer
    pub fn test(&self, other: &Layers) -> bool {
        self.mask & other.mask != 0
    }

    /// `Some(eye)` when the mask holds exactly that eye's layer and nothing else
    pub fn eye_restriction(&self) -> Option<Eye> {
        Eye::BOTH
            .into_iter()
            .find(|&eye| self.mask == bit(Self::eye_layer(eye)))
    }
}

fn bit(layer: u32) -> u32 {
    1u32.checked_shl(layer).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_layer_zero() {
        let layers = Layers::default();
        assert!(layers.is_enabled(DEFAULT_LAYER));
        assert!(!layers.is_enabled(LEFT_EYE_LAYER));
        assert_eq!(layers.mask(), 1);
    }

    #[test]
    fn set_replaces_enable_adds() {
        let mut layers = Layers::default();
        layers.set(LEFT_EYE_LAYER);
        assert!(!layers.is_enabled(DEFAULT_LAYER));
        layers.enable(RIGHT_EYE_LAYER);
        assert_eq!(layers.mask(), 0b110);
        layers.disable(LEFT_EYE_LAYER);
        assert_eq!(layers, Layers::only(RIGHT_EYE_LAYER));
    }

    #[test]
    fn test_needs_intersection() {
        let mut camera = Layers::default();
        camera.enable(LEFT_EYE_LAYER);
        assert!(camera.test(&Layers::only(LEFT_EYE_LAYER)));
        assert!(!camera.test(&Layers::only(RIGHT_EYE_LAYER)));
        assert!(camera.test(&Layers::ALL));
        assert!(!camera.test(&Layers::NONE));
    }

    #[test]
    fn eye_restriction_only_for_single_eye_masks() {
        assert_eq!(Layers::only(LEFT_EYE_LAYER).eye_restriction(), Some(Eye::Left));
        assert_eq!(Layers::only(RIGHT_EYE_LAYER).eye_restriction(), Some(Eye::Right));
        assert_eq!(Layers::default().eye_restriction(), None);
        assert_eq!(Layers::ALL.eye_restriction(), None);
    }

    #[test]
    fn out_of_range_layer_is_ignored() {
        let mut layers = Layers::default();
        layers.enable(40);
        assert_eq!(layers, Layers::default());
        assert!(!layers.is_enabled(40));
    }
}
