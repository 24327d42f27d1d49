//! Gallery Viewer: browse, inspect and prune generated-image history.
//! Built with Rust + egui (eframe)

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::path::PathBuf;

use gallery_viewer::api::ApiClient;
use gallery_viewer::worker::BackendWorker;
use gallery_viewer::{Config, GalleryApp};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "mimalloc-allocator")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const USAGE: &str = "\
Usage: gallery-viewer [OPTIONS]

Options:
  --server <URL>    Backend root URL (overrides [Server] base_url)
  --config <PATH>   Read settings from PATH instead of the platform config dir
  -h, --help        Print this help";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    server: Option<String>,
    config: Option<PathBuf>,
    help: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "--server" => {
                    parsed.server = Some(args.next().ok_or("--server needs a URL")?);
                }
                "--config" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                other => {
                    if let Some(url) = other.strip_prefix("--server=") {
                        parsed.server = Some(url.to_string());
                    } else if let Some(path) = other.strip_prefix("--config=") {
                        parsed.config = Some(PathBuf::from(path));
                    } else {
                        return Err(format!("unknown argument: {other}"));
                    }
                }
            }
        }
        Ok(parsed)
    }
}

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(server) = args.server {
        config.base_url = server;
    }
    tracing::info!(server = %config.base_url, "starting gallery viewer");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Gallery Viewer")
            .with_icon(build_app_icon())
            .with_min_inner_size([720.0, 480.0])
            .with_inner_size([1280.0, 840.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gallery Viewer",
        options,
        Box::new(move |cc| {
            let client = ApiClient::new(
                &config.base_url,
                config.request_timeout(),
                config.history_limit,
            )?;
            let repaint_ctx = cc.egui_ctx.clone();
            let worker = BackendWorker::new(client, move || repaint_ctx.request_repaint())?;
            Ok(Box::new(GalleryApp::new(cc, config, worker)))
        }),
    )
}

/// Procedural 2x2 tile glyph, white on transparent.
fn build_app_icon() -> egui::IconData {
    const SIDE: usize = 64;
    const MARGIN: usize = 8;
    const GAP: usize = 6;
    let tile = (SIDE - 2 * MARGIN - GAP) / 2;
    let mut rgba = vec![0u8; SIDE * SIDE * 4];

    let in_tile = |v: usize| {
        let v = v.checked_sub(MARGIN)?;
        match v {
            v if v < tile => Some(0),
            v if v >= tile + GAP && v < 2 * tile + GAP => Some(1),
            _ => None,
        }
    };

    for y in 0..SIDE {
        for x in 0..SIDE {
            let (Some(col), Some(row)) = (in_tile(x), in_tile(y)) else {
                continue;
            };
            // The first tile is solid, the rest are dimmer.
            let alpha = if col == 0 && row == 0 { 240 } else { 150 };
            let idx = (y * SIDE + x) * 4;
            rgba[idx..idx + 4].copy_from_slice(&[255, 255, 255, alpha]);
        }
    }

    egui::IconData {
        rgba,
        width: SIDE as u32,
        height: SIDE as u32,
    }
}
