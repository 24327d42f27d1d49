//! Drag panning inside the image viewport.

use egui::{PointerButton, Pos2, Vec2};

/// Which extremes the scroll offset currently touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeFlags {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl EdgeFlags {
    pub const ALL: Self = Self {
        left: true,
        right: true,
        top: true,
        bottom: true,
    };
}

impl Default for EdgeFlags {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragOrigin {
    pointer: Pos2,
    scroll: Vec2,
}

#[derive(Debug, Clone)]
pub struct PanController {
    /// Current scroll offset, always within `[0, max_scroll]`.
    scroll: Vec2,
    /// Size of the scrollable content.
    content: Vec2,
    /// Size of the visible viewport.
    viewport: Vec2,
    drag: Option<DragOrigin>,
    edges: EdgeFlags,
    /// Slack used for both the pannable test and the edge flags.
    threshold: f32,
}

impl PanController {
    pub fn new(threshold: f32) -> Self {
        Self {
            scroll: Vec2::ZERO,
            content: Vec2::ZERO,
            viewport: Vec2::ZERO,
            drag: None,
            edges: EdgeFlags::ALL,
            threshold: threshold.max(0.0),
        }
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    pub fn edges(&self) -> EdgeFlags {
        self.edges
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn max_scroll(&self) -> Vec2 {
        (self.content - self.viewport).max(Vec2::ZERO)
    }

    pub fn is_pannable(&self) -> bool {
        self.content.x > self.viewport.x + self.threshold
            || self.content.y > self.viewport.y + self.threshold
    }

    /// Update content and viewport sizes. The scroll offset is clamped to the
    /// new extent and the edge flags recomputed.
    pub fn set_extent(&mut self, content: Vec2, viewport: Vec2) {
        let sane = |v: Vec2| {
            if v.x.is_finite() && v.y.is_finite() {
                v.max(Vec2::ZERO)
            } else {
                Vec2::ZERO
            }
        };
        self.content = sane(content);
        self.viewport = sane(viewport);
        if !self.is_pannable() {
            self.drag = None;
        }
        self.scroll_to(self.scroll);
    }

    pub fn scroll_to(&mut self, target: Vec2) {
        if target.x.is_finite() && target.y.is_finite() {
            self.scroll = target.clamp(Vec2::ZERO, self.max_scroll());
        }
        self.refresh_edges();
    }

    /// Margin that centers the content on axes where it fits, zero where it
    /// overflows.
    pub fn centering(&self) -> Vec2 {
        ((self.viewport - self.content) / 2.0).max(Vec2::ZERO)
    }

    /// Top-left of the content relative to the viewport's top-left.
    pub fn content_offset(&self) -> Vec2 {
        self.centering() - self.scroll
    }

    /// Scroll so the content's top-left lands at `offset`, as far as the
    /// extent allows.
    pub fn place_content(&mut self, offset: Vec2) {
        self.scroll_to(self.centering() - offset);
    }

    /// Scroll so the content center sits in the viewport center.
    pub fn center(&mut self) {
        self.scroll_to(self.max_scroll() / 2.0);
    }

    pub fn reset(&mut self) {
        self.drag = None;
        self.scroll_to(Vec2::ZERO);
    }

    /// Begin a drag. Only the primary button starts one, and only while the
    /// content overflows.
    pub fn pointer_down(&mut self, button: PointerButton, pointer: Pos2) -> bool {
        if button != PointerButton::Primary || !self.is_pannable() {
            return false;
        }
        self.drag = Some(DragOrigin {
            pointer,
            scroll: self.scroll,
        });
        true
    }

    /// Returns `true` when the scroll offset moved.
    pub fn pointer_move(&mut self, pointer: Pos2) -> bool {
        let Some(origin) = self.drag else {
            return false;
        };
        let before = self.scroll;
        self.scroll_to(origin.scroll - (pointer - origin.pointer));
        self.scroll != before
    }

    /// End a drag (release, cancel, or pointer leaving the viewport).
    pub fn pointer_up(&mut self) -> bool {
        self.drag.take().is_some()
    }

    fn refresh_edges(&mut self) {
        if !self.is_pannable() {
            self.edges = EdgeFlags::ALL;
            return;
        }
        let max = self.max_scroll();
        let t = self.threshold;
        self.edges = EdgeFlags {
            left: self.scroll.x <= t,
            right: self.scroll.x >= max.x - t,
            top: self.scroll.y <= t,
            bottom: self.scroll.y >= max.y - t,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn overflowing() -> PanController {
        let mut pan = PanController::new(1.0);
        pan.set_extent(Vec2::new(1000.0, 500.0), Vec2::new(800.0, 600.0));
        pan
    }

    #[test]
    fn not_pannable_sets_every_edge() {
        let mut pan = PanController::new(1.0);
        pan.set_extent(Vec2::new(800.5, 600.0), Vec2::new(800.0, 600.0));
        assert!(!pan.is_pannable());
        assert_eq!(pan.edges(), EdgeFlags::ALL);
        assert!(!pan.pointer_down(PointerButton::Primary, pos2(10.0, 10.0)));
    }

    #[test]
    fn drag_moves_opposite_to_pointer_and_clamps() {
        let mut pan = overflowing();
        assert!(pan.pointer_down(PointerButton::Primary, pos2(400.0, 300.0)));
        assert!(pan.pointer_move(pos2(350.0, 300.0)));
        assert_eq!(pan.scroll(), Vec2::new(50.0, 0.0));

        pan.pointer_move(pos2(-1000.0, 0.0));
        assert_eq!(pan.scroll(), Vec2::new(200.0, 0.0));
        assert!(pan.edges().right);
        assert!(!pan.edges().left);
        // Vertical axis does not overflow, so both vertical edges hold.
        assert!(pan.edges().top && pan.edges().bottom);

        assert!(pan.pointer_up());
        assert!(!pan.pointer_move(pos2(0.0, 0.0)));
        assert!(!pan.pointer_up());
    }

    #[test]
    fn secondary_button_does_not_drag() {
        let mut pan = overflowing();
        assert!(!pan.pointer_down(PointerButton::Secondary, pos2(0.0, 0.0)));
        assert!(!pan.is_dragging());
    }

    #[test]
    fn edges_follow_scroll() {
        let mut pan = overflowing();
        assert!(pan.edges().left && !pan.edges().right);
        pan.scroll_to(Vec2::new(100.0, 0.0));
        assert!(!pan.edges().left && !pan.edges().right);
        pan.scroll_to(Vec2::new(199.5, 0.0));
        assert!(pan.edges().right);
    }

    #[test]
    fn shrinking_content_clamps_scroll() {
        let mut pan = overflowing();
        pan.scroll_to(Vec2::new(200.0, 0.0));
        pan.set_extent(Vec2::new(900.0, 500.0), Vec2::new(800.0, 600.0));
        assert_eq!(pan.scroll(), Vec2::new(100.0, 0.0));
        pan.set_extent(Vec2::new(400.0, 300.0), Vec2::new(800.0, 600.0));
        assert_eq!(pan.scroll(), Vec2::ZERO);
    }

    #[test]
    fn center_and_non_finite_targets() {
        let mut pan = overflowing();
        pan.center();
        assert_eq!(pan.scroll(), Vec2::new(100.0, 0.0));
        pan.scroll_to(Vec2::new(f32::NAN, 0.0));
        assert_eq!(pan.scroll(), Vec2::new(100.0, 0.0));
    }

    #[test]
    fn content_offset_centers_or_scrolls_per_axis() {
        let mut pan = PanController::new(1.0);
        pan.set_extent(Vec2::new(200.0, 900.0), Vec2::new(400.0, 300.0));
        pan.scroll_to(Vec2::new(0.0, 150.0));
        assert_eq!(pan.content_offset(), Vec2::new(100.0, -150.0));

        // Centered axes ignore the requested offset.
        pan.place_content(Vec2::new(-50.0, -400.0));
        assert_eq!(pan.scroll(), Vec2::new(0.0, 400.0));
        assert_eq!(pan.content_offset(), Vec2::new(100.0, -400.0));

        pan.place_content(Vec2::new(0.0, 10.0));
        assert_eq!(pan.scroll(), Vec2::ZERO);
    }
}
