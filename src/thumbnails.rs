//! LRU cache of uploaded textures keyed by [`ImageKey`].

use std::collections::HashSet;
use std::num::NonZeroUsize;

use egui::{ColorImage, TextureHandle, TextureOptions, Vec2};
use lru::LruCache;

use crate::worker::{DecodedImage, ImageKey};

pub struct CachedTexture {
    pub handle: TextureHandle,
    /// Decoded size before downscaling, in pixels.
    pub natural: Vec2,
}

pub struct TextureCache {
    entries: LruCache<ImageKey, CachedTexture>,
    /// Fetches in flight, so each key is requested once.
    pending: HashSet<ImageKey>,
    /// Keys that failed; not retried until forgotten.
    failed: HashSet<ImageKey>,
}

impl TextureCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            pending: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    pub fn get(&mut self, key: &ImageKey) -> Option<&CachedTexture> {
        self.entries.get(key)
    }

    pub fn has_failed(&self, key: &ImageKey) -> bool {
        self.failed.contains(key)
    }

    /// `true` if the caller should submit a fetch for `key` now.
    pub fn begin_fetch(&mut self, key: &ImageKey) -> bool {
        if self.entries.contains(key) || self.pending.contains(key) || self.failed.contains(key) {
            return false;
        }
        self.pending.insert(key.clone());
        true
    }

    pub fn insert(&mut self, ctx: &egui::Context, key: ImageKey, image: DecodedImage) {
        self.pending.remove(&key);
        self.failed.remove(&key);
        let color = ColorImage::from_rgba_unmultiplied(
            [image.width as usize, image.height as usize],
            &image.pixels,
        );
        let handle = ctx.load_texture(texture_name(&key), color, TextureOptions::LINEAR);
        let natural = Vec2::new(image.original_width as f32, image.original_height as f32);
        let texture = CachedTexture { handle, natural };
        if let Some((evicted, _)) = self.entries.push(key.clone(), texture) {
            if evicted != key {
                tracing::debug!(path = evicted.path(), "texture evicted");
            }
        }
    }

    pub fn mark_failed(&mut self, key: ImageKey) {
        self.pending.remove(&key);
        self.failed.insert(key);
    }

    /// Drop every texture and fetch state for `path` (record deleted).
    pub fn forget_path(&mut self, path: &str) {
        let stale: Vec<ImageKey> = self
            .entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| key.path() == path)
            .cloned()
            .collect();
        for key in stale {
            self.entries.pop(&key);
        }
        self.pending.retain(|key| key.path() != path);
        self.failed.retain(|key| key.path() != path);
    }

    /// Drop viewer textures and fetch state other than the one for `keep`.
    pub fn retain_viewer(&mut self, keep: Option<&ImageKey>) {
        let stale: Vec<ImageKey> = self
            .entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| matches!(key, ImageKey::Viewer { .. }) && Some(*key) != keep)
            .cloned()
            .collect();
        for key in stale {
            self.entries.pop(&key);
        }
        let keep_key =
            |key: &ImageKey| !matches!(key, ImageKey::Viewer { .. }) || Some(key) == keep;
        self.pending.retain(keep_key);
        self.failed.retain(keep_key);
    }
}

fn texture_name(key: &ImageKey) -> String {
    match key {
        ImageKey::Thumbnail(path) => format!("thumb:{path}"),
        ImageKey::Preview(path) => format!("preview:{path}"),
        ImageKey::Viewer { token, path } => format!("viewer:{}:{path}", token.get()),
    }
}
