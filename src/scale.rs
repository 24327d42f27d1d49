//! Scale mode and bounded zoom.

use egui::Vec2;

use crate::geometry::ScaleMode;

/// Zoom bounds and wheel sensitivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    /// Exponent per wheel delta unit: `factor = exp(-delta * sensitivity)`.
    pub sensitivity: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.2,
            max: 8.0,
            sensitivity: 0.0015,
        }
    }
}

impl ZoomLimits {
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone)]
pub struct ScaleController {
    mode: ScaleMode,
    zoom: f32,
    limits: ZoomLimits,
}

impl ScaleController {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            mode: ScaleMode::Fit,
            zoom: 1.0,
            limits,
        }
    }

    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Fit mode, zoom 1.
    pub fn force_fit(&mut self) {
        self.mode = ScaleMode::Fit;
        self.zoom = 1.0;
    }

    pub fn toggle_mode(&mut self) -> ScaleMode {
        self.mode = self.mode.toggled();
        self.zoom = 1.0;
        self.mode
    }

    /// Apply one wheel event. Returns the zoom ratio `next / previous`, or
    /// `None` when the zoom did not change.
    pub fn zoom_by_wheel(&mut self, delta_y: f32) -> Option<f32> {
        if !delta_y.is_finite() {
            return None;
        }
        let factor = (-delta_y * self.limits.sensitivity).exp();
        let next = self.limits.clamp(self.zoom * factor);
        if !next.is_finite() || next == self.zoom {
            return None;
        }
        let ratio = next / self.zoom;
        self.zoom = next;
        Some(ratio)
    }

    /// Wheel zoom about `anchor`. Both `anchor` and `image_offset` (where the
    /// image's top-left is painted) are relative to the viewport origin.
    /// Returns the image offset that keeps the anchored pixel under the cursor.
    pub fn zoom_at(&mut self, delta_y: f32, anchor: Vec2, image_offset: Vec2) -> Option<Vec2> {
        let ratio = self.zoom_by_wheel(delta_y)?;
        Some(anchored_offset(anchor, image_offset, ratio))
    }
}

/// Image offset after scaling the image by `ratio` about `anchor`.
pub fn anchored_offset(anchor: Vec2, image_offset: Vec2, ratio: f32) -> Vec2 {
    anchor - (anchor - image_offset) * ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_restores_fit() {
        let mut scale = ScaleController::new(ZoomLimits::default());
        scale.zoom_by_wheel(-300.0);
        assert_eq!(scale.toggle_mode(), ScaleMode::Pixel);
        assert_eq!(scale.zoom(), 1.0);
        assert_eq!(scale.toggle_mode(), ScaleMode::Fit);
        assert_eq!(scale.zoom(), 1.0);
    }

    #[test]
    fn zoom_stays_within_bounds() {
        let mut scale = ScaleController::new(ZoomLimits::default());
        for _ in 0..500 {
            scale.zoom_by_wheel(-240.0);
        }
        assert_eq!(scale.zoom(), 8.0);
        assert!(scale.zoom_by_wheel(-240.0).is_none());

        for _ in 0..500 {
            scale.zoom_by_wheel(480.0);
        }
        assert_eq!(scale.zoom(), 0.2);

        for delta in [17.0, -3000.0, 42.5, 9000.0, -1.0, 0.0, -250.0] {
            scale.zoom_by_wheel(delta);
            assert!((0.2..=8.0).contains(&scale.zoom()));
        }
    }

    #[test]
    fn wheel_up_zooms_in() {
        let mut scale = ScaleController::new(ZoomLimits::default());
        let ratio = scale.zoom_by_wheel(-100.0).unwrap();
        assert!(ratio > 1.0);
        assert!((scale.zoom() - (0.15f32).exp()).abs() < 1e-5);
    }

    #[test]
    fn non_finite_delta_is_ignored() {
        let mut scale = ScaleController::new(ZoomLimits::default());
        assert!(scale.zoom_by_wheel(f32::NAN).is_none());
        assert!(scale.zoom_by_wheel(f32::INFINITY).is_none());
        assert_eq!(scale.zoom(), 1.0);
    }

    #[test]
    fn anchor_point_stays_under_cursor() {
        let mut scale = ScaleController::new(ZoomLimits::default());
        let anchor = Vec2::new(300.0, 200.0);
        // Centered horizontally, scrolled vertically.
        let offset = Vec2::new(42.0, -80.0);
        let pixel_before = (anchor - offset) / scale.zoom();

        let next_offset = scale.zoom_at(-120.0, anchor, offset).unwrap();
        let pixel_after = (anchor - next_offset) / scale.zoom();

        assert!((pixel_before - pixel_after).length() <= 1e-3);
    }
}
