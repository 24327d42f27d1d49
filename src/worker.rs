//! Background backend worker.
//!
//! Requests run on a small tokio runtime; results come back to the UI thread
//! over a crossbeam channel that the app drains once per frame. Image bytes
//! are decoded (and downscaled to the GPU texture limit) on the blocking pool
//! so the UI thread only uploads ready RGBA buffers.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use image::imageops::FilterType;
use image::GenericImageView;

use crate::api::{ApiClient, ApiError, GenerationRequest};
use crate::record::{GenerationRecord, RecordId};
use crate::viewer::SessionToken;

/// Maximum events handed to the UI per poll, to keep frames short.
const POLL_BATCH_SIZE: usize = 32;

/// What a fetched image is for. Doubles as the texture cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageKey {
    Thumbnail(String),
    Preview(String),
    Viewer { token: SessionToken, path: String },
}

impl ImageKey {
    pub fn path(&self) -> &str {
        match self {
            Self::Thumbnail(path) | Self::Preview(path) => path,
            Self::Viewer { path, .. } => path,
        }
    }
}

/// RGBA8 pixels ready for upload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Size before any downscaling.
    pub original_width: u32,
    pub original_height: u32,
}

#[derive(Debug, Clone)]
pub enum Job {
    LoadHistory,
    Delete(RecordId),
    Generate(GenerationRequest),
    FetchImage { key: ImageKey, max_side: u32 },
}

#[derive(Debug)]
pub enum Event {
    HistoryLoaded(Result<Vec<GenerationRecord>, ApiError>),
    Deleted {
        id: RecordId,
        result: Result<(), ApiError>,
    },
    Generated(Result<GenerationRecord, ApiError>),
    ImageReady {
        key: ImageKey,
        result: Result<DecodedImage, ApiError>,
    },
}

struct HistoryLoad {
    generation: u64,
    result: Result<Vec<GenerationRecord>, ApiError>,
}

enum Message {
    History(HistoryLoad),
    Event(Event),
}

type Repaint = Arc<dyn Fn() + Send + Sync>;

pub struct BackendWorker {
    runtime: Option<tokio::runtime::Runtime>,
    client: Arc<ApiClient>,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    repaint: Repaint,
    /// Only the newest history listing is applied.
    history_generation: u64,
}

impl BackendWorker {
    pub fn new(
        client: ApiClient,
        repaint: impl Fn() + Send + Sync + 'static,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("gallery-backend")
            .enable_all()
            .build()?;
        let (tx, rx) = crossbeam_channel::unbounded();
        Ok(Self {
            runtime: Some(runtime),
            client: Arc::new(client),
            tx,
            rx,
            repaint: Arc::new(repaint),
            history_generation: 0,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn submit(&mut self, job: Job) {
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let repaint = Arc::clone(&self.repaint);

        if matches!(job, Job::LoadHistory) {
            self.history_generation += 1;
        }
        let generation = self.history_generation;
        tracing::debug!(?job, "backend job submitted");

        runtime.spawn(async move {
            let message = match job {
                Job::LoadHistory => Message::History(HistoryLoad {
                    generation,
                    result: client.list_history().await,
                }),
                Job::Delete(id) => {
                    let result = client.delete_history(&id).await;
                    Message::Event(Event::Deleted { id, result })
                }
                Job::Generate(request) => {
                    Message::Event(Event::Generated(client.generate(&request).await))
                }
                Job::FetchImage { key, max_side } => {
                    let result = fetch_and_decode(&client, key.path(), max_side).await;
                    Message::Event(Event::ImageReady { key, result })
                }
            };
            if tx.send(message).is_ok() {
                repaint();
            }
        });
    }

    /// Drain finished jobs. Stale history listings are dropped.
    pub fn poll(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while events.len() < POLL_BATCH_SIZE {
            match self.rx.try_recv() {
                Ok(Message::Event(event)) => events.push(event),
                Ok(Message::History(load)) => {
                    if load.generation == self.history_generation {
                        events.push(Event::HistoryLoaded(load.result));
                    } else {
                        tracing::debug!(
                            generation = load.generation,
                            "dropping stale history listing"
                        );
                    }
                }
                Err(_) => break,
            }
        }
        if !self.rx.is_empty() {
            (self.repaint)();
        }
        events
    }
}

impl Drop for BackendWorker {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn fetch_and_decode(
    client: &ApiClient,
    path: &str,
    max_side: u32,
) -> Result<DecodedImage, ApiError> {
    let bytes = client.fetch_bytes(path).await?;
    tokio::task::spawn_blocking(move || decode_image(&bytes, max_side))
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?
}

/// Decode encoded image bytes into RGBA8. Images larger than `max_side` on
/// either axis are downscaled preserving aspect ratio; `0` disables that.
pub fn decode_image(bytes: &[u8], max_side: u32) -> Result<DecodedImage, ApiError> {
    let img = image::load_from_memory(bytes).map_err(|e| ApiError::Decode(e.to_string()))?;
    let (original_width, original_height) = img.dimensions();
    let img = if max_side > 0 && (original_width > max_side || original_height > max_side) {
        // `resize` keeps the aspect ratio within (max, max).
        img.resize(max_side, max_side, FilterType::Lanczos3)
    } else {
        img
    };
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        pixels: rgba.into_raw(),
        width,
        height,
        original_width,
        original_height,
    })
}
