//! Output surface bookkeeping

/// Size and pixel density of the single output target.
///
/// `width`/`height` are logical (density independent) units; the drawing
/// buffer is that size times the pixel ratio, truncated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySurface {
    pixel_ratio: f64,
    width: f64,
    height: f64,
}

impl Default for DisplaySurface {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

impl DisplaySurface {
    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        if ratio > 0.0 && ratio.is_finite() {
            self.pixel_ratio = ratio;
        }
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Physical pixel dimensions of the drawing buffer
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        (
            (self.width * self.pixel_ratio).floor() as u32,
            (self.height * self.pixel_ratio).floor() as u32,
        )
    }

    /// Width over height; `None` while either side is zero
    pub fn aspect(&self) -> Option<f32> {
        if self.width > 0.0 && self.height > 0.0 {
            Some(self.width as f32 / self.height as f32)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_buffer_scales_with_ratio() {
        let mut display = DisplaySurface::default();
        display.set_pixel_ratio(2.5);
        display.set_size(401.0, 300.0);
        assert_eq!(display.drawing_buffer_size(), (1002, 750));
        assert_eq!(display.aspect(), Some(401.0 / 300.0));
    }

    #[test]
    fn invalid_ratio_is_ignored() {
        let mut display = DisplaySurface::default();
        display.set_pixel_ratio(0.0);
        display.set_pixel_ratio(f64::NAN);
        assert_eq!(display.pixel_ratio(), 1.0);
    }

    #[test]
    fn zero_sized_surface_has_no_aspect() {
        let mut display = DisplaySurface::default();
        display.set_size(0.0, 600.0);
        assert_eq!(display.aspect(), None);
        display.set_size(800.0, 600.0);
        assert_eq!(display.aspect(), Some(800.0 / 600.0));
    }
}
