//! Benchmarks for the viewer hot paths
//!
//! Run with: cargo bench --bench perf_baseline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use egui::{pos2, vec2, Rect};
use gallery_viewer::geometry::{resolve, GeometryInput, HostLayout, ScaleMode};
use gallery_viewer::record::GenerationRecord;
use gallery_viewer::viewer::{ViewerController, ViewerSettings};

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for (name, mode, fullscreen, zoom) in [
        ("fit_windowed", ScaleMode::Fit, false, 1.0),
        ("fit_fullscreen_zoomed", ScaleMode::Fit, true, 2.5),
        ("pixel", ScaleMode::Pixel, false, 1.0),
    ] {
        let input = GeometryInput {
            natural: Some(vec2(4096.0, 2304.0)),
            viewport: vec2(1280.0, 720.0),
            mode,
            zoom,
            fullscreen,
            pixels_per_point: 1.5,
        };
        group.bench_with_input(BenchmarkId::new("resolve", name), &input, |b, input| {
            b.iter(|| resolve(black_box(input)));
        });
    }

    group.finish();
}

/// Wheel zoom in fullscreen runs resolve, pan extent and edge flags per event.
fn bench_wheel_zoom(c: &mut Criterion) {
    let record: GenerationRecord = serde_json::from_value(serde_json::json!({
        "id": "bench",
        "output": {"path": "/outputs/bench.png"}
    }))
    .expect("valid record");

    let mut viewer = ViewerController::new(ViewerSettings {
        native_fullscreen: false,
        ..ViewerSettings::default()
    });
    let token = viewer.open(record, None);
    viewer.on_resize(HostLayout {
        window: vec2(1920.0, 1080.0),
        dialog: vec2(1920.0, 1080.0),
        image_rect: Rect::from_min_size(pos2(12.0, 56.0), vec2(1896.0, 1012.0)),
        side_panel: 0.0,
        pixels_per_point: 1.0,
    });
    viewer.on_image_decoded(token, vec2(4096.0, 2304.0));
    viewer.request_fullscreen_toggle();

    let pointer = pos2(700.0, 400.0);
    let mut direction = 1.0f32;
    c.bench_function("wheel_zoom_fullscreen", |b| {
        b.iter(|| {
            // Alternate so the zoom never pins at a bound.
            if !viewer.on_wheel(black_box(-120.0 * direction), pointer) {
                direction = -direction;
            }
            if viewer.zoom() >= 7.5 || viewer.zoom() <= 0.25 {
                direction = -direction;
            }
        });
    });
}

criterion_group!(benches, bench_resolve, bench_wheel_zoom);
criterion_main!(benches);
