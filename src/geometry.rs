//! Display-size resolution for the viewer.
//!
//! Everything here is a pure function of its inputs. Sizes are in egui
//! points; `pixels_per_point` converts between points and physical pixels.

use egui::{Rect, Vec2};

/// Displayed size must exceed the viewport by more than this to count as overflow.
const OVERFLOW_EPSILON: f32 = 0.5;

/// How the image is scaled inside the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Whole image visible inside the viewport.
    #[default]
    Fit,
    /// One image pixel per physical screen pixel (before zoom).
    Pixel,
}

impl ScaleMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Fit => Self::Pixel,
            Self::Pixel => Self::Fit,
        }
    }
}

/// Everything the resolver looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryInput {
    /// Decoded image size in pixels, `None` until decode completes.
    pub natural: Option<Vec2>,
    /// Size of the image viewport in points. May be zero before first layout.
    pub viewport: Vec2,
    pub mode: ScaleMode,
    pub zoom: f32,
    pub fullscreen: bool,
    pub pixels_per_point: f32,
}

/// Resolved display size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub size: Vec2,
    /// Displayed size exceeds the viewport in at least one axis.
    pub overflow: bool,
    /// `false` when the host is free to lay the image out on its own
    /// (fit mode, zoom 1, windowed). `size` is then the natural layout size.
    pub explicit: bool,
}

fn finite(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

fn sane_ppp(ppp: f32) -> f32 {
    if ppp.is_finite() && ppp > 0.0 {
        ppp
    } else {
        1.0
    }
}

/// Resolve the displayed size, or `None` while the geometry is not known yet.
pub fn resolve(input: &GeometryInput) -> Option<Layout> {
    let natural = input.natural?;
    if !finite(natural) || natural.x <= 0.0 || natural.y <= 0.0 {
        return None;
    }
    if !finite(input.viewport) || !input.zoom.is_finite() || input.zoom <= 0.0 {
        return None;
    }
    let viewport = input.viewport.max(Vec2::ZERO);
    let has_viewport = viewport.x > 0.0 && viewport.y > 0.0;

    let (size, explicit) = match input.mode {
        ScaleMode::Fit => {
            if !has_viewport {
                return None;
            }
            let fit = (viewport.x / natural.x).min(viewport.y / natural.y);
            if !input.fullscreen && input.zoom == 1.0 {
                // Shrink-to-fit, never upscale.
                (natural * fit.min(1.0), false)
            } else {
                (natural * (fit * input.zoom), true)
            }
        }
        ScaleMode::Pixel => {
            let ppp = sane_ppp(input.pixels_per_point);
            (natural / ppp * input.zoom, true)
        }
    };

    if !finite(size) {
        return None;
    }

    let overflow = has_viewport
        && (size.x > viewport.x + OVERFLOW_EPSILON || size.y > viewport.y + OVERFLOW_EPSILON);

    Some(Layout {
        size,
        overflow,
        explicit,
    })
}

/// On-screen scale relative to the image's physical pixels.
pub fn effective_scale(layout: &Layout, natural: Vec2, pixels_per_point: f32) -> Option<f32> {
    if natural.x <= 0.0 || natural.y <= 0.0 {
        return None;
    }
    let ppp = sane_ppp(pixels_per_point);
    let scale = (layout.size.x * ppp / natural.x).min(layout.size.y * ppp / natural.y);
    scale.is_finite().then_some(scale)
}

/// Measured host geometry for the open viewer, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostLayout {
    /// Inner size of the application window.
    pub window: Vec2,
    /// Outer size of the viewer dialog as last laid out.
    pub dialog: Vec2,
    /// Image viewport inside the dialog.
    pub image_rect: Rect,
    /// Details panel width including the gap before it.
    pub side_panel: f32,
    pub pixels_per_point: f32,
}

impl HostLayout {
    /// Dialog space not taken by the image or the details panel (padding, header).
    pub fn chrome(&self) -> Vec2 {
        let image = self.image_rect.size();
        Vec2::new(
            self.dialog.x - image.x - self.side_panel,
            self.dialog.y - image.y,
        )
        .max(Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(natural: Option<(f32, f32)>, viewport: (f32, f32), mode: ScaleMode) -> GeometryInput {
        GeometryInput {
            natural: natural.map(|(w, h)| Vec2::new(w, h)),
            viewport: Vec2::new(viewport.0, viewport.1),
            mode,
            zoom: 1.0,
            fullscreen: false,
            pixels_per_point: 1.0,
        }
    }

    #[test]
    fn fit_shrinks_large_image_without_overflow() {
        let fit = input(Some((1024.0, 768.0)), (800.0, 600.0), ScaleMode::Fit);
        let layout = resolve(&fit).unwrap();
        assert_eq!(layout.size, Vec2::new(800.0, 600.0));
        assert!(!layout.overflow);
        assert!(!layout.explicit);
    }

    #[test]
    fn fit_never_upscales_when_unconstrained() {
        let layout = resolve(&input(Some((400.0, 300.0)), (800.0, 600.0), ScaleMode::Fit)).unwrap();
        assert_eq!(layout.size, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn fullscreen_fit_fills_viewport_and_zooms() {
        let mut geometry = input(Some((400.0, 300.0)), (800.0, 600.0), ScaleMode::Fit);
        geometry.fullscreen = true;
        let layout = resolve(&geometry).unwrap();
        assert_eq!(layout.size, Vec2::new(800.0, 600.0));
        assert!(layout.explicit);

        geometry.zoom = 2.0;
        let layout = resolve(&geometry).unwrap();
        assert_eq!(layout.size, Vec2::new(1600.0, 1200.0));
        assert!(layout.overflow);
    }

    #[test]
    fn pixel_mode_divides_by_device_ratio() {
        let mut geometry = input(Some((2000.0, 1000.0)), (800.0, 600.0), ScaleMode::Pixel);
        geometry.pixels_per_point = 2.0;
        let layout = resolve(&geometry).unwrap();
        assert_eq!(layout.size, Vec2::new(1000.0, 500.0));
        assert!(layout.overflow);
        assert_eq!(effective_scale(&layout, Vec2::new(2000.0, 1000.0), 2.0), Some(1.0));
    }

    #[test]
    fn pixel_mode_without_viewport_resolves_without_overflow() {
        let layout = resolve(&input(Some((2000.0, 1000.0)), (0.0, 0.0), ScaleMode::Pixel)).unwrap();
        assert_eq!(layout.size, Vec2::new(2000.0, 1000.0));
        assert!(!layout.overflow);
    }

    #[test]
    fn unresolved_inputs() {
        assert!(resolve(&input(None, (800.0, 600.0), ScaleMode::Fit)).is_none());
        assert!(resolve(&input(Some((100.0, 100.0)), (0.0, 600.0), ScaleMode::Fit)).is_none());
        let nan_natural = input(Some((f32::NAN, 100.0)), (800.0, 600.0), ScaleMode::Pixel);
        assert!(resolve(&nan_natural).is_none());
        let infinite_viewport = input(Some((100.0, 100.0)), (f32::INFINITY, 600.0), ScaleMode::Fit);
        assert!(resolve(&infinite_viewport).is_none());

        let mut geometry = input(Some((100.0, 100.0)), (800.0, 600.0), ScaleMode::Pixel);
        geometry.zoom = f32::NAN;
        assert!(resolve(&geometry).is_none());
    }

    #[test]
    fn invalid_device_ratio_falls_back_to_one() {
        let mut geometry = input(Some((200.0, 100.0)), (800.0, 600.0), ScaleMode::Pixel);
        geometry.pixels_per_point = 0.0;
        assert_eq!(resolve(&geometry).unwrap().size, Vec2::new(200.0, 100.0));
    }

    #[test]
    fn effective_scale_for_fit() {
        let fit = input(Some((1024.0, 768.0)), (800.0, 600.0), ScaleMode::Fit);
        let layout = resolve(&fit).unwrap();
        let scale = effective_scale(&layout, Vec2::new(1024.0, 768.0), 1.0).unwrap();
        assert!((scale - 0.78125).abs() < 1e-6);
    }

    #[test]
    fn chrome_excludes_image_and_side_panel() {
        let host = HostLayout {
            window: Vec2::new(1600.0, 1000.0),
            dialog: Vec2::new(1100.0, 700.0),
            image_rect: Rect::from_min_size(egui::pos2(20.0, 60.0), Vec2::new(760.0, 620.0)),
            side_panel: 316.0,
            pixels_per_point: 1.0,
        };
        assert_eq!(host.chrome(), Vec2::new(24.0, 80.0));
    }
}
