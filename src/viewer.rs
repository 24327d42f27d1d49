//! Modal viewer state machine.
//!
//! The controller owns one [`ViewerSession`] per opening. Every geometry
//! affecting event (decode, resize, zoom, mode or fullscreen change) runs the
//! same re-sync pass: resolve the display size, update the pan extent, size
//! the dialog, refresh the edge flags.

use egui::{PointerButton, Pos2, Vec2};

use crate::dialog::{DialogSize, DialogSizer};
use crate::format::format_scale;
use crate::geometry::{self, GeometryInput, HostLayout, Layout, ScaleMode};
use crate::pan::{EdgeFlags, PanController};
use crate::record::GenerationRecord;
use crate::scale::{ScaleController, ZoomLimits};

/// Identifies one opening of the viewer. Async continuations carry it so
/// results for a closed or replaced session can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Closed,
    Open,
    OpenFullscreen,
}

/// Fullscreen presentation of the open viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fullscreen {
    #[default]
    Off,
    /// Asked the host, waiting for confirmation or rejection.
    Requested,
    /// The host window is fullscreen.
    Native,
    /// The dialog covers the window without host fullscreen.
    Simulated,
}

impl Fullscreen {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Native | Self::Simulated)
    }
}

/// Something only the host can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRequest {
    EnterFullscreen { token: SessionToken },
    ExitFullscreen,
}

/// What the host must do after the viewer closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseOutcome {
    /// Widget that had focus when the viewer opened.
    pub restore_focus: Option<egui::Id>,
    pub exit_native_fullscreen: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerSettings {
    pub zoom: ZoomLimits,
    pub edge_threshold: f32,
    pub dialog_width_ratio: f32,
    pub dialog_height_ratio: f32,
    /// Ask the host for real fullscreen; otherwise always simulate.
    pub native_fullscreen: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            zoom: ZoomLimits::default(),
            edge_threshold: 1.0,
            dialog_width_ratio: 0.98,
            dialog_height_ratio: 0.96,
            native_fullscreen: true,
        }
    }
}

#[derive(Debug, Clone)]
struct ViewerSession {
    record: GenerationRecord,
    token: SessionToken,
    scale: ScaleController,
    pan: PanController,
    dialog: DialogSizer,
    /// Decoded size in pixels, `None` until the image arrives.
    natural: Option<Vec2>,
    layout: Option<Layout>,
    host: Option<HostLayout>,
    focus: Option<egui::Id>,
    fullscreen: Fullscreen,
    /// Center the pan offset once the layout resolves and the dialog has
    /// stopped growing.
    center_pending: bool,
}

impl ViewerSession {
    fn new(
        record: GenerationRecord,
        token: SessionToken,
        focus: Option<egui::Id>,
        settings: &ViewerSettings,
    ) -> Self {
        Self {
            record,
            token,
            scale: ScaleController::new(settings.zoom),
            pan: PanController::new(settings.edge_threshold),
            dialog: DialogSizer::new(settings.dialog_width_ratio, settings.dialog_height_ratio),
            natural: None,
            layout: None,
            host: None,
            focus,
            fullscreen: Fullscreen::Off,
            center_pending: false,
        }
    }

    fn viewport(&self) -> Vec2 {
        self.host
            .map(|host| host.image_rect.size())
            .unwrap_or(Vec2::ZERO)
    }

    fn pixels_per_point(&self) -> f32 {
        self.host.map(|host| host.pixels_per_point).unwrap_or(1.0)
    }

    /// Back to fit mode at zoom 1 with the pan offset at the origin.
    fn reset_geometry(&mut self) {
        self.scale.force_fit();
        self.pan.reset();
        self.center_pending = false;
    }

    fn sync(&mut self) {
        let viewport = self.viewport();
        self.layout = geometry::resolve(&GeometryInput {
            natural: self.natural,
            viewport,
            mode: self.scale.mode(),
            zoom: self.scale.zoom(),
            fullscreen: self.fullscreen.is_active(),
            pixels_per_point: self.pixels_per_point(),
        });

        let content = self.layout.map(|layout| layout.size).unwrap_or(Vec2::ZERO);
        self.pan.set_extent(content, viewport);

        let windowed_pixel = !self.fullscreen.is_active() && self.scale.mode() == ScaleMode::Pixel;
        let dialog_changed = if !windowed_pixel {
            self.dialog.clear()
        } else if let (Some(layout), Some(host)) = (self.layout, self.host) {
            self.dialog.update(layout.size, &host)
        } else {
            false
        };

        // A grown dialog only reaches the viewport on the next resize, so keep
        // re-centering until the dialog holds still.
        if self.center_pending && self.layout.is_some() && viewport.x > 0.0 && viewport.y > 0.0 {
            self.pan.center();
            self.center_pending = dialog_changed;
        }
    }
}

#[derive(Debug, Default)]
pub struct ViewerController {
    session: Option<ViewerSession>,
    next_token: u64,
    settings: ViewerSettings,
}

impl ViewerController {
    pub fn new(settings: ViewerSettings) -> Self {
        Self {
            session: None,
            next_token: 0,
            settings,
        }
    }

    pub fn phase(&self) -> ViewerPhase {
        match &self.session {
            None => ViewerPhase::Closed,
            Some(session) if session.fullscreen.is_active() => ViewerPhase::OpenFullscreen,
            Some(_) => ViewerPhase::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open `record` with fresh geometry. `focus` is the widget to give focus
    /// back to on close; re-opening while open keeps the first one.
    pub fn open(&mut self, record: GenerationRecord, focus: Option<egui::Id>) -> SessionToken {
        self.next_token += 1;
        let token = SessionToken(self.next_token);
        let previous = self.session.take();

        let focus = previous.as_ref().map_or(focus, |prev| prev.focus);
        let mut session = ViewerSession::new(record, token, focus, &self.settings);
        if let Some(prev) = previous {
            session.host = prev.host;
            // The window stays fullscreen across a re-open. A pending request
            // is dropped; a late confirmation still lands as `Native`.
            if prev.fullscreen.is_active() {
                session.fullscreen = prev.fullscreen;
            }
        }
        tracing::debug!(
            token = token.0,
            record = %session.record.id,
            "viewer opened"
        );
        session.sync();
        self.session = Some(session);
        token
    }

    /// Close the viewer. `None` when it was already closed.
    pub fn close(&mut self) -> Option<CloseOutcome> {
        let session = self.session.take()?;
        tracing::debug!(token = session.token.0, record = %session.record.id, "viewer closed");
        Some(CloseOutcome {
            restore_focus: session.focus,
            exit_native_fullscreen: matches!(
                session.fullscreen,
                Fullscreen::Native | Fullscreen::Requested
            ),
        })
    }

    /// Enter or leave fullscreen. Native transitions return a request for
    /// the host; simulated ones take effect immediately.
    pub fn request_fullscreen_toggle(&mut self) -> Option<HostRequest> {
        let native = self.settings.native_fullscreen;
        let session = self.session.as_mut()?;
        match session.fullscreen {
            Fullscreen::Off if native => {
                session.fullscreen = Fullscreen::Requested;
                Some(HostRequest::EnterFullscreen {
                    token: session.token,
                })
            }
            Fullscreen::Off => {
                session.fullscreen = Fullscreen::Simulated;
                session.reset_geometry();
                session.sync();
                None
            }
            Fullscreen::Requested => None,
            Fullscreen::Native => Some(HostRequest::ExitFullscreen),
            Fullscreen::Simulated => {
                session.fullscreen = Fullscreen::Off;
                session.reset_geometry();
                session.sync();
                None
            }
        }
    }

    /// The host reports its fullscreen state.
    pub fn on_fullscreen_changed(&mut self, fullscreen: bool) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match (fullscreen, session.fullscreen) {
            (true, Fullscreen::Native) | (false, Fullscreen::Off | Fullscreen::Requested) => return,
            (true, _) => session.fullscreen = Fullscreen::Native,
            (false, Fullscreen::Native) => session.fullscreen = Fullscreen::Off,
            (false, Fullscreen::Simulated) => return,
        }
        tracing::debug!(token = session.token.0, state = ?session.fullscreen, "fullscreen changed");
        session.reset_geometry();
        session.sync();
    }

    /// The host refused (or did not answer) a fullscreen request.
    pub fn on_fullscreen_rejected(&mut self, token: SessionToken) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.token != token || session.fullscreen != Fullscreen::Requested {
            return;
        }
        tracing::debug!(token = token.0, "native fullscreen rejected, simulating");
        session.fullscreen = Fullscreen::Simulated;
        session.reset_geometry();
        session.sync();
    }

    /// Image decode finished. Returns `false` for a stale token.
    pub fn on_image_decoded(&mut self, token: SessionToken, natural: Vec2) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.token != token {
            tracing::debug!(token = token.0, "dropping decode for stale viewer session");
            return false;
        }
        session.natural = Some(natural);
        if session.scale.mode() == ScaleMode::Pixel {
            session.center_pending = true;
        }
        session.sync();
        true
    }

    /// Host layout changed (window resize, first layout, DPI change).
    pub fn on_resize(&mut self, host: HostLayout) {
        if let Some(session) = self.session.as_mut() {
            if session.host != Some(host) {
                session.host = Some(host);
                session.sync();
            }
        }
    }

    /// Flip between fit and pixel mode. Needs a decoded image.
    pub fn toggle_scale(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.natural.is_none() {
            return false;
        }
        let mode = session.scale.toggle_mode();
        session.pan.reset();
        session.dialog.clear();
        session.center_pending = mode == ScaleMode::Pixel;
        tracing::debug!(token = session.token.0, ?mode, "scale mode toggled");
        session.sync();
        true
    }

    /// Wheel zoom anchored at `pointer`. Only active in fullscreen.
    pub fn on_wheel(&mut self, delta_y: f32, pointer: Pos2) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.fullscreen.is_active() || session.layout.is_none() {
            return false;
        }
        let Some(host) = session.host else {
            return false;
        };
        let anchor = pointer - host.image_rect.min;
        let offset = session.pan.content_offset();
        let Some(target) = session.scale.zoom_at(delta_y, anchor, offset) else {
            return false;
        };
        session.sync();
        session.pan.place_content(target);
        true
    }

    /// Wheel outside fullscreen scrolls overflowing content by `delta`.
    pub fn on_scroll(&mut self, delta: Vec2) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.fullscreen.is_active() || !session.pan.is_pannable() {
            return false;
        }
        let before = session.pan.scroll();
        session.pan.scroll_to(before + delta);
        session.pan.scroll() != before
    }

    pub fn on_pointer_down(&mut self, button: PointerButton, pointer: Pos2) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match session.host {
            Some(host) if host.image_rect.contains(pointer) => {
                session.pan.pointer_down(button, pointer)
            }
            _ => false,
        }
    }

    pub fn on_pointer_move(&mut self, pointer: Pos2) -> bool {
        self.session
            .as_mut()
            .is_some_and(|session| session.pan.pointer_move(pointer))
    }

    pub fn on_pointer_up(&mut self) -> bool {
        self.session
            .as_mut()
            .is_some_and(|session| session.pan.pointer_up())
    }

    pub fn record(&self) -> Option<&GenerationRecord> {
        self.session.as_ref().map(|session| &session.record)
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.session.as_ref().map(|session| session.token)
    }

    pub fn fullscreen(&self) -> Fullscreen {
        self.session
            .as_ref()
            .map(|session| session.fullscreen)
            .unwrap_or_default()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen().is_active()
    }

    pub fn layout(&self) -> Option<Layout> {
        self.session.as_ref().and_then(|session| session.layout)
    }

    pub fn natural_size(&self) -> Option<Vec2> {
        self.session.as_ref().and_then(|session| session.natural)
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.session
            .as_ref()
            .map(|session| session.scale.mode())
            .unwrap_or_default()
    }

    pub fn zoom(&self) -> f32 {
        self.session
            .as_ref()
            .map(|session| session.scale.zoom())
            .unwrap_or(1.0)
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.session
            .as_ref()
            .map(|session| session.pan.scroll())
            .unwrap_or(Vec2::ZERO)
    }

    /// Where the image's top-left is painted, relative to the viewport.
    pub fn image_offset(&self) -> Vec2 {
        self.session
            .as_ref()
            .map(|session| session.pan.content_offset())
            .unwrap_or(Vec2::ZERO)
    }

    pub fn edges(&self) -> EdgeFlags {
        self.session
            .as_ref()
            .map(|session| session.pan.edges())
            .unwrap_or_default()
    }

    pub fn is_pannable(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.pan.is_pannable())
    }

    pub fn is_panning(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.pan.is_dragging())
    }

    pub fn dialog_size(&self) -> DialogSize {
        self.session
            .as_ref()
            .map(|session| session.dialog.size())
            .unwrap_or_default()
    }

    /// Effective scale label such as `0.78x`, `-` while unresolved.
    pub fn scale_label(&self) -> String {
        let scale = self.session.as_ref().and_then(|session| {
            let layout = session.layout?;
            geometry::effective_scale(&layout, session.natural?, session.pixels_per_point())
        });
        format_scale(scale)
    }

    /// Resize events only matter while a session is open.
    pub fn wants_resize_events(&self) -> bool {
        self.session.is_some()
    }
}
