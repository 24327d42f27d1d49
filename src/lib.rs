//! Desktop viewer for generated-image history.
//!
//! The viewer engine (`geometry`, `scale`, `pan`, `dialog`, `viewer`) and the
//! history consistency rules (`history`, `gallery`) are plain state with no
//! egui frame dependency, so they can be driven and tested headless. `app`
//! wires them to eframe, the backend worker and the texture cache.

pub mod api;
pub mod app;
pub mod config;
pub mod dialog;
pub mod form;
pub mod format;
pub mod gallery;
pub mod geometry;
pub mod history;
pub mod pan;
pub mod record;
pub mod scale;
pub mod status;
pub mod thumbnails;
pub mod viewer;
pub mod worker;

pub use app::GalleryApp;
pub use config::Config;
pub use gallery::Gallery;
pub use record::{GenerationRecord, RecordId};
pub use viewer::{ViewerController, ViewerSettings};
