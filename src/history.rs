//! Ordered generation history plus the preview and active references.
//!
//! Both references always point at a record in the list. Every mutation
//! repairs them in the same call, so there is no intermediate state where a
//! reference dangles.

use crate::record::{GenerationRecord, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GalleryError {
    /// The id does not name a record in the history.
    #[error("unknown history record: {0}")]
    UnknownRecord(RecordId),
}

/// Placeholder shown in the preview pane when nothing is previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// History is empty.
    Empty,
    /// History has records but none is previewed.
    Next,
}

impl Placeholder {
    pub fn message(self) -> &'static str {
        match self {
            Self::Empty => "Waiting for your first render",
            Self::Next => "Waiting for your next render",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewSlot<'a> {
    Placeholder(Placeholder),
    Record(&'a GenerationRecord),
}

/// Result of [`HistoryStore::delete`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Removal {
    pub removed: Option<GenerationRecord>,
    pub preview_cleared: bool,
    pub active_cleared: bool,
}

/// References dropped by [`HistoryStore::reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Repair {
    pub preview_cleared: bool,
    pub active_cleared: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    /// Newest first.
    records: Vec<GenerationRecord>,
    preview_id: Option<RecordId>,
    active_id: Option<RecordId>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[GenerationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&GenerationRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.get(id).is_some()
    }

    pub fn preview_id(&self) -> Option<&RecordId> {
        self.preview_id.as_ref()
    }

    pub fn active_id(&self) -> Option<&RecordId> {
        self.active_id.as_ref()
    }

    pub fn preview(&self) -> PreviewSlot<'_> {
        match self.preview_id.as_ref().and_then(|id| self.get(id)) {
            Some(record) => PreviewSlot::Record(record),
            None if self.records.is_empty() => PreviewSlot::Placeholder(Placeholder::Empty),
            None => PreviewSlot::Placeholder(Placeholder::Next),
        }
    }

    /// Prepend a record. A record with the same id is replaced.
    pub fn insert(&mut self, record: GenerationRecord) {
        self.records.retain(|existing| existing.id != record.id);
        self.records.insert(0, record);
    }

    /// Remove `id` and drop every reference to it. Deleting an absent id is a no-op.
    pub fn delete(&mut self, id: &RecordId) -> Removal {
        let Some(index) = self.records.iter().position(|record| &record.id == id) else {
            return Removal::default();
        };
        let removed = self.records.remove(index);

        let preview_cleared = self.preview_id.as_ref() == Some(id);
        if preview_cleared {
            self.preview_id = None;
        }
        let active_cleared = self.active_id.as_ref() == Some(id);
        if active_cleared {
            self.active_id = None;
        }

        Removal {
            removed: Some(removed),
            preview_cleared,
            active_cleared,
        }
    }

    pub fn set_preview(&mut self, id: &RecordId) -> Result<(), GalleryError> {
        if !self.contains(id) {
            return Err(GalleryError::UnknownRecord(id.clone()));
        }
        self.preview_id = Some(id.clone());
        Ok(())
    }

    pub(crate) fn set_active(&mut self, id: &RecordId) -> Result<(), GalleryError> {
        if !self.contains(id) {
            return Err(GalleryError::UnknownRecord(id.clone()));
        }
        self.active_id = Some(id.clone());
        Ok(())
    }

    pub(crate) fn clear_active(&mut self) {
        self.active_id = None;
    }

    /// Replace the whole list, dropping references to records that are gone.
    pub fn reload(&mut self, records: Vec<GenerationRecord>) -> Repair {
        self.records = records;
        let mut seen = std::collections::HashSet::new();
        self.records.retain(|record| seen.insert(record.id.clone()));

        let mut repair = Repair::default();
        if let Some(id) = self.preview_id.clone() {
            if !self.contains(&id) {
                self.preview_id = None;
                repair.preview_cleared = true;
            }
        }
        if let Some(id) = self.active_id.clone() {
            if !self.contains(&id) {
                self.active_id = None;
                repair.active_cleared = true;
            }
        }
        repair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> GenerationRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "prompt": format!("prompt {id}"),
            "output": {"path": format!("/outputs/{id}.png")},
        }))
        .unwrap()
    }

    fn ids(store: &HistoryStore) -> Vec<&str> {
        store.records().iter().map(|r| r.id.as_str()).collect()
    }

    fn store_with(ids: &[&str]) -> HistoryStore {
        let mut store = HistoryStore::new();
        store.reload(ids.iter().map(|id| record(id)).collect());
        store
    }

    #[test]
    fn insert_prepends_and_replaces_duplicates() {
        let mut store = HistoryStore::new();
        store.insert(record("1"));
        store.insert(record("2"));
        assert_eq!(ids(&store), ["2", "1"]);
        store.insert(record("1"));
        assert_eq!(ids(&store), ["1", "2"]);
    }

    #[test]
    fn deleting_preview_clears_it_and_shows_placeholder() {
        let mut store = store_with(&["1", "2"]);
        store.set_preview(&"1".into()).unwrap();

        let removal = store.delete(&"1".into());
        assert!(removal.preview_cleared);
        assert!(!removal.active_cleared);
        assert_eq!(ids(&store), ["2"]);
        assert_eq!(store.preview_id(), None);
        assert_eq!(store.preview(), PreviewSlot::Placeholder(Placeholder::Next));
    }

    #[test]
    fn deleting_last_record_shows_first_render_placeholder() {
        let mut store = store_with(&["1"]);
        store.set_preview(&"1".into()).unwrap();
        store.delete(&"1".into());
        assert_eq!(store.preview(), PreviewSlot::Placeholder(Placeholder::Empty));
        assert_eq!(Placeholder::Empty.message(), "Waiting for your first render");
    }

    #[test]
    fn deleting_other_record_keeps_references() {
        let mut store = store_with(&["1", "2", "3"]);
        store.set_preview(&"1".into()).unwrap();
        store.set_active(&"2".into()).unwrap();

        let removal = store.delete(&"3".into());
        assert!(removal.removed.is_some());
        assert!(!removal.preview_cleared && !removal.active_cleared);
        assert_eq!(store.preview_id(), Some(&RecordId::new("1")));
        assert_eq!(store.active_id(), Some(&RecordId::new("2")));
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = store_with(&["1", "2"]);
        store.set_preview(&"2".into()).unwrap();
        store.set_active(&"2".into()).unwrap();

        let first = store.delete(&"2".into());
        assert!(first.preview_cleared && first.active_cleared);
        let snapshot = (
            ids(&store).join(","),
            store.preview_id().cloned(),
            store.active_id().cloned(),
        );

        let second = store.delete(&"2".into());
        assert_eq!(second, Removal::default());
        assert_eq!(
            (ids(&store).join(","), store.preview_id().cloned(), store.active_id().cloned()),
            snapshot
        );
    }

    #[test]
    fn set_preview_rejects_unknown_id() {
        let mut store = store_with(&["1"]);
        store.set_preview(&"1".into()).unwrap();
        let err = store.set_preview(&"9".into()).unwrap_err();
        assert_eq!(err, GalleryError::UnknownRecord("9".into()));
        assert_eq!(store.preview_id(), Some(&RecordId::new("1")));
    }

    #[test]
    fn reload_repairs_dangling_references() {
        let mut store = store_with(&["1", "2"]);
        store.set_preview(&"1".into()).unwrap();
        store.set_active(&"2".into()).unwrap();

        let repair = store.reload(vec![record("2"), record("3"), record("2")]);
        assert_eq!(repair, Repair { preview_cleared: true, active_cleared: false });
        assert_eq!(ids(&store), ["2", "3"]);
        assert_eq!(store.active_id(), Some(&RecordId::new("2")));
    }
}
