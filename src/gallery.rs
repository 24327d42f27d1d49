//! History plus viewer, kept consistent with each other.
//!
//! The store's active reference is set exactly while the viewer is open, and
//! always names the record the viewer shows.

use crate::api::ApiError;
use crate::history::{GalleryError, HistoryStore, Removal};
use crate::record::{GenerationRecord, RecordId};
use crate::viewer::{CloseOutcome, SessionToken, ViewerController, ViewerSettings};

/// What a deletion changed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeleteOutcome {
    pub removal: Removal,
    /// Set when the deleted record was open in the viewer.
    pub closed: Option<CloseOutcome>,
}

#[derive(Debug, Default)]
pub struct Gallery {
    history: HistoryStore,
    viewer: ViewerController,
}

impl Gallery {
    pub fn new(settings: ViewerSettings) -> Self {
        Self {
            history: HistoryStore::new(),
            viewer: ViewerController::new(settings),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn viewer(&self) -> &ViewerController {
        &self.viewer
    }

    /// Geometry events (resize, decode, wheel, drag, fullscreen) go straight to
    /// the viewer. Open and close must go through [`Gallery::open`] and
    /// [`Gallery::close`].
    pub fn viewer_mut(&mut self) -> &mut ViewerController {
        &mut self.viewer
    }

    /// Replace the history with a fresh listing from the backend.
    pub fn load(&mut self, records: Vec<GenerationRecord>) -> Option<CloseOutcome> {
        let repair = self.history.reload(records);
        if repair.preview_cleared {
            tracing::debug!("previewed record vanished on reload");
        }
        if repair.active_cleared {
            tracing::debug!("open record vanished on reload, closing viewer");
            return self.viewer.close();
        }
        None
    }

    /// A new generation arrived: prepend it and show it in the preview slot.
    pub fn insert_generated(&mut self, record: GenerationRecord) {
        let id = record.id.clone();
        self.history.insert(record);
        if let Err(err) = self.history.set_preview(&id) {
            tracing::warn!(error = %err, "inserted record missing from history");
        }
    }

    pub fn set_preview(&mut self, id: &RecordId) -> Result<(), GalleryError> {
        self.history.set_preview(id)
    }

    /// Open the viewer on `id`. Unknown ids leave everything untouched.
    pub fn open(
        &mut self,
        id: &RecordId,
        focus: Option<egui::Id>,
    ) -> Result<SessionToken, GalleryError> {
        let record = self
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| GalleryError::UnknownRecord(id.clone()))?;
        self.history.set_active(id)?;
        Ok(self.viewer.open(record, focus))
    }

    pub fn close(&mut self) -> Option<CloseOutcome> {
        self.history.clear_active();
        self.viewer.close()
    }

    /// Remove a record whose deletion the backend confirmed.
    pub fn remove(&mut self, id: &RecordId) -> DeleteOutcome {
        let removal = self.history.delete(id);
        let closed = if removal.active_cleared {
            self.viewer.close()
        } else {
            None
        };
        if removal.removed.is_some() {
            tracing::debug!(
                record = %id,
                preview_cleared = removal.preview_cleared,
                viewer_closed = closed.is_some(),
                "history record removed"
            );
        }
        DeleteOutcome { removal, closed }
    }

    /// Apply the backend's answer to a delete request. Failures change nothing.
    pub fn apply_delete_result(
        &mut self,
        id: &RecordId,
        result: Result<(), ApiError>,
    ) -> Result<DeleteOutcome, ApiError> {
        result?;
        Ok(self.remove(id))
    }

    /// `true` when the active reference and the viewer agree.
    pub fn is_consistent(&self) -> bool {
        match (self.history.active_id(), self.viewer.record()) {
            (None, None) => true,
            (Some(active), Some(open)) => active == &open.id && self.history.contains(active),
            _ => false,
        }
    }
}
