//! Grows the viewer dialog so pixel-mode images get room to breathe.

use egui::Vec2;

use crate::geometry::HostLayout;

/// Explicit dialog size. `None` on an axis means the default layout applies.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DialogSize {
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl DialogSize {
    pub fn is_default(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct DialogSizer {
    /// Fraction of the window the dialog may take, per axis.
    caps: Vec2,
    applied: DialogSize,
}

impl DialogSizer {
    pub fn new(width_ratio: f32, height_ratio: f32) -> Self {
        Self {
            caps: Vec2::new(width_ratio.clamp(0.1, 1.0), height_ratio.clamp(0.1, 1.0)),
            applied: DialogSize::default(),
        }
    }

    pub fn size(&self) -> DialogSize {
        self.applied
    }

    /// Drop any explicit sizing. Returns `true` if something was cleared.
    pub fn clear(&mut self) -> bool {
        let had = !self.applied.is_default();
        self.applied = DialogSize::default();
        had
    }

    /// Grow the dialog toward `display` (the resolved image size) within the
    /// window caps. Never shrinks, except to re-cap after the window shrank.
    /// Returns `true` when the applied size changed.
    pub fn update(&mut self, display: Vec2, host: &HostLayout) -> bool {
        if !(display.x.is_finite() && display.y.is_finite()) {
            return false;
        }
        let before = self.applied;
        let cap = host.window * self.caps;
        let chrome = host.chrome();
        let image = host.image_rect.size();

        if display.x > image.x + 1.0 {
            let desired = cap
                .x
                .min(host.dialog.x.max(display.x + host.side_panel + chrome.x));
            if desired > host.dialog.x + 1.0 {
                self.applied.width = Some(desired);
            }
        }
        if display.y > image.y + 1.0 {
            let desired = cap.y.min(host.dialog.y.max(display.y + chrome.y));
            if desired > host.dialog.y + 1.0 {
                self.applied.height = Some(desired);
            }
        }

        if let Some(width) = self.applied.width {
            self.applied.width = Some(width.min(cap.x));
        }
        if let Some(height) = self.applied.height {
            self.applied.height = Some(height.min(cap.y));
        }

        self.applied != before
    }
}
