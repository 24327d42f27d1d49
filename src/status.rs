//! One-line status display with a busy timer.

use std::time::{Duration, Instant};

use crate::format::format_elapsed;

pub const IDLE_MESSAGE: &str = "Idle. Ready to render.";
pub const BUSY_MESSAGE: &str = "Rendering image. This may take a moment.";
pub const DONE_MESSAGE: &str = "Render complete. Stored in history.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Idle,
    Busy,
    Error,
}

#[derive(Debug, Clone)]
pub struct StatusLine {
    kind: StatusKind,
    message: String,
    /// Start of the current busy period.
    started: Option<Instant>,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            kind: StatusKind::Idle,
            message: IDLE_MESSAGE.to_string(),
            started: None,
        }
    }
}

impl StatusLine {
    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_busy(&self) -> bool {
        self.kind == StatusKind::Busy
    }

    pub fn set(&mut self, kind: StatusKind, message: impl Into<String>) {
        self.set_at(kind, message, Instant::now());
    }

    pub fn set_at(&mut self, kind: StatusKind, message: impl Into<String>, now: Instant) {
        self.message = message.into();
        self.started = match (kind, self.started) {
            (StatusKind::Busy, Some(started)) if self.kind == StatusKind::Busy => Some(started),
            (StatusKind::Busy, _) => Some(now),
            _ => None,
        };
        self.kind = kind;
    }

    pub fn elapsed_at(&self, now: Instant) -> Option<Duration> {
        self.started.map(|started| now.saturating_duration_since(started))
    }

    /// `MM:SS` while busy.
    pub fn elapsed_label(&self) -> Option<String> {
        self.elapsed_at(Instant::now()).map(format_elapsed)
    }
}
