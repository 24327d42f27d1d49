use egui::{pos2, vec2, Rect, Vec2};
use gallery_viewer::api::ApiError;
use gallery_viewer::gallery::Gallery;
use gallery_viewer::geometry::{HostLayout, ScaleMode};
use gallery_viewer::history::{Placeholder, PreviewSlot};
use gallery_viewer::record::{GenerationRecord, RecordId};
use gallery_viewer::viewer::{Fullscreen, ViewerPhase, ViewerSettings};

fn record(id: &str, seed: u64) -> GenerationRecord {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "mode": "t2i",
        "prompt": format!("render {id}"),
        "params": {"width": 1024, "height": 768, "steps": 9, "guidanceScale": 0.0, "seed": seed},
        "output": {"path": format!("/outputs/{id}.png"), "format": "png"},
        "durationMs": 1200,
        "provider": "z-image-turbo"
    }))
    .unwrap()
}

fn host(image: Vec2, pixels_per_point: f32) -> HostLayout {
    let image_rect = Rect::from_min_size(pos2(40.0, 80.0), image);
    HostLayout {
        window: vec2(1920.0, 1080.0),
        dialog: image + vec2(24.0, 68.0),
        image_rect,
        side_panel: 0.0,
        pixels_per_point,
    }
}

fn simulated_fullscreen() -> Gallery {
    Gallery::new(ViewerSettings {
        native_fullscreen: false,
        ..ViewerSettings::default()
    })
}

fn id(s: &str) -> RecordId {
    RecordId::from(s)
}

#[test]
fn deleting_preview_record_shows_placeholder() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("1", 1), record("2", 2)]);
    gallery.set_preview(&id("1")).unwrap();

    let outcome = gallery.remove(&id("1"));
    assert!(outcome.removal.preview_cleared);
    assert!(outcome.closed.is_none());

    let ids: Vec<_> = gallery.history().records().iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![id("2")]);
    assert_eq!(gallery.history().preview_id(), None);
    assert_eq!(
        gallery.history().preview(),
        PreviewSlot::Placeholder(Placeholder::Next)
    );
}

#[test]
fn deleting_active_record_closes_viewer() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("a", 1), record("b", 2)]);
    let focus = egui::Id::new("thumb-a");
    gallery.open(&id("a"), Some(focus)).unwrap();
    assert!(gallery.is_consistent());

    let outcome = gallery
        .apply_delete_result(&id("a"), Ok(()))
        .unwrap();
    let closed = outcome.closed.expect("viewer should close");
    assert_eq!(closed.restore_focus, Some(focus));
    assert_eq!(gallery.viewer().phase(), ViewerPhase::Closed);
    assert_eq!(gallery.history().active_id(), None);
    assert!(gallery.is_consistent());
}

#[test]
fn unrelated_and_repeated_deletes() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("a", 1), record("b", 2), record("c", 3)]);
    gallery.set_preview(&id("a")).unwrap();
    gallery.open(&id("b"), None).unwrap();

    let outcome = gallery.remove(&id("c"));
    assert!(!outcome.removal.preview_cleared);
    assert!(!outcome.removal.active_cleared);
    assert_eq!(gallery.history().preview_id(), Some(&id("a")));
    assert_eq!(gallery.history().active_id(), Some(&id("b")));

    let again = gallery.remove(&id("c"));
    assert!(again.removal.removed.is_none());
    assert_eq!(gallery.history().len(), 2);
    assert!(gallery.is_consistent());
}

#[test]
fn failed_delete_changes_nothing() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("a", 1)]);
    gallery.open(&id("a"), None).unwrap();

    let err = ApiError::Status {
        status: 500,
        message: "Delete failed.".into(),
    };
    assert_eq!(gallery.apply_delete_result(&id("a"), Err(err.clone())), Err(err));
    assert_eq!(gallery.history().len(), 1);
    assert!(gallery.viewer().is_open());
    assert!(gallery.is_consistent());
}

#[test]
fn reload_without_open_record_closes_viewer() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("a", 1), record("b", 2)]);
    gallery.open(&id("a"), None).unwrap();

    assert!(gallery.load(vec![record("b", 2)]).is_some());
    assert!(!gallery.viewer().is_open());
    assert!(gallery.is_consistent());
}

#[test]
fn generated_record_is_prepended_and_previewed() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("old", 1)]);
    gallery.insert_generated(record("new", 2));

    assert_eq!(gallery.history().records()[0].id, id("new"));
    match gallery.history().preview() {
        PreviewSlot::Record(r) => assert_eq!(r.id, id("new")),
        other => panic!("unexpected preview slot: {other:?}"),
    }
}

#[test]
fn fit_resolves_to_viewport_then_pixel_mode_respects_dpr() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("a", 1)]);
    let token = gallery.open(&id("a"), None).unwrap();
    let viewer = gallery.viewer_mut();

    viewer.on_resize(host(vec2(800.0, 600.0), 2.0));
    assert!(viewer.layout().is_none());

    assert!(viewer.on_image_decoded(token, vec2(1024.0, 768.0)));
    let layout = viewer.layout().unwrap();
    assert_eq!(layout.size, vec2(800.0, 600.0));
    assert!(!layout.overflow);

    // Same session, larger image: pixel mode divides by the device pixel ratio.
    assert!(viewer.on_image_decoded(token, vec2(2000.0, 1000.0)));
    assert!(viewer.toggle_scale());
    assert_eq!(viewer.scale_mode(), ScaleMode::Pixel);
    assert_eq!(viewer.layout().unwrap().size, vec2(1000.0, 500.0));

    assert!(viewer.toggle_scale());
    assert_eq!(viewer.scale_mode(), ScaleMode::Fit);
    assert_eq!(viewer.zoom(), 1.0);
}

#[test]
fn stale_decode_is_dropped_after_reopen() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("a", 1), record("b", 2)]);
    let first = gallery.open(&id("a"), None).unwrap();
    let second = gallery.open(&id("b"), None).unwrap();
    assert_ne!(first, second);

    let viewer = gallery.viewer_mut();
    viewer.on_resize(host(vec2(800.0, 600.0), 1.0));
    assert!(!viewer.on_image_decoded(first, vec2(64.0, 64.0)));
    assert!(viewer.natural_size().is_none());
    assert!(gallery.is_consistent());
}

/// Image pixel painted under `anchor` (viewport coordinates).
fn pixel_under(gallery: &Gallery, anchor: Vec2) -> Vec2 {
    let viewer = gallery.viewer();
    let size = viewer.layout().unwrap().size;
    (anchor - viewer.image_offset()) * viewer.natural_size().unwrap() / size
}

#[test]
fn fullscreen_wheel_zoom_keeps_anchor_and_bounds() {
    let mut gallery = simulated_fullscreen();
    gallery.load(vec![record("a", 1)]);
    let token = gallery.open(&id("a"), None).unwrap();
    let layout = host(vec2(1024.0, 768.0), 1.0);
    let anchor = vec2(512.0, 384.0);
    let pointer = layout.image_rect.min + anchor;

    {
        let viewer = gallery.viewer_mut();
        viewer.on_resize(layout);
        viewer.on_image_decoded(token, vec2(2048.0, 1536.0));
        // Wheel zoom is a fullscreen feature.
        assert!(!viewer.on_wheel(-200.0, pointer));
        assert!(viewer.request_fullscreen_toggle().is_none());
        assert_eq!(viewer.fullscreen(), Fullscreen::Simulated);
        assert_eq!(viewer.phase(), ViewerPhase::OpenFullscreen);
    }

    let before = pixel_under(&gallery, anchor);
    assert!(gallery.viewer_mut().on_wheel(-200.0, pointer));
    let after = pixel_under(&gallery, anchor);
    assert!((before - after).length() <= 1.0, "{before:?} vs {after:?}");
    assert!(gallery.viewer().zoom() > 1.0);

    let viewer = gallery.viewer_mut();
    for _ in 0..200 {
        viewer.on_wheel(-500.0, pointer);
    }
    assert_eq!(viewer.zoom(), 8.0);
    for _ in 0..400 {
        viewer.on_wheel(500.0, pointer);
    }
    assert!((viewer.zoom() - 0.2).abs() < 1e-6);

    // Leaving fullscreen resets to fit at zoom 1.
    assert!(viewer.request_fullscreen_toggle().is_none());
    assert_eq!(viewer.fullscreen(), Fullscreen::Off);
    assert_eq!(viewer.zoom(), 1.0);
    assert_eq!(viewer.pan_offset(), Vec2::ZERO);
}

#[test]
fn wheel_zoom_anchors_on_centered_axis() {
    let mut gallery = simulated_fullscreen();
    gallery.load(vec![record("a", 1)]);
    let token = gallery.open(&id("a"), None).unwrap();
    let layout = host(vec2(1200.0, 700.0), 1.0);
    let anchor = vec2(900.0, 300.0);
    let pointer = layout.image_rect.min + anchor;

    let viewer = gallery.viewer_mut();
    assert!(viewer.request_fullscreen_toggle().is_none());
    viewer.on_resize(layout);
    viewer.on_image_decoded(token, vec2(1600.0, 1000.0));
    // Fit gives 1120x700: 40pt bands left and right.
    assert_eq!(viewer.layout().unwrap().size, vec2(1120.0, 700.0));
    assert_eq!(viewer.image_offset(), vec2(40.0, 0.0));

    for delta in [-120.0, -120.0, 60.0, -300.0] {
        let before = pixel_under(&gallery, anchor);
        assert!(gallery.viewer_mut().on_wheel(delta, pointer));
        let after = pixel_under(&gallery, anchor);
        assert!((before - after).length() <= 1.0, "{before:?} vs {after:?}");
    }
}

#[test]
fn close_reports_native_fullscreen_exit() {
    let mut gallery = Gallery::default();
    gallery.load(vec![record("a", 1)]);
    gallery.open(&id("a"), None).unwrap();
    assert!(gallery.viewer_mut().request_fullscreen_toggle().is_some());
    gallery.viewer_mut().on_fullscreen_changed(true);
    assert_eq!(gallery.viewer().fullscreen(), Fullscreen::Native);

    let closed = gallery.close().unwrap();
    assert!(closed.exit_native_fullscreen);
    assert!(gallery.close().is_none());
    assert!(gallery.is_consistent());
}
