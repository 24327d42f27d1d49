//! INI configuration: backend address, viewer tuning, cache sizes and
//! keyboard shortcuts.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scale::ZoomLimits;
use crate::viewer::ViewerSettings;

const DEFAULT_CONFIG_INI: &str = include_str!("../config.ini");
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:7860";

/// Keyboard shortcut, optionally with one modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputBinding {
    Key(egui::Key),
    KeyWithCtrl(egui::Key),
    KeyWithShift(egui::Key),
    KeyWithAlt(egui::Key),
}

impl InputBinding {
    /// Binding for a key press with the given modifiers.
    pub fn from_press(key: egui::Key, modifiers: egui::Modifiers) -> Self {
        if modifiers.command || modifiers.ctrl {
            Self::KeyWithCtrl(key)
        } else if modifiers.shift {
            Self::KeyWithShift(key)
        } else if modifiers.alt {
            Self::KeyWithAlt(key)
        } else {
            Self::Key(key)
        }
    }
}

/// Viewer actions that can be bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CloseViewer,
    ToggleScale,
    ToggleFullscreen,
}

impl Action {
    pub const ALL: [Action; 3] = [
        Action::CloseViewer,
        Action::ToggleScale,
        Action::ToggleFullscreen,
    ];

    pub fn from_str(s: &str) -> Option<Action> {
        match s.trim().to_lowercase().as_str() {
            "close_viewer" | "close" => Some(Action::CloseViewer),
            "toggle_scale" | "scale" | "one_to_one" => Some(Action::ToggleScale),
            "toggle_fullscreen" | "fullscreen" => Some(Action::ToggleFullscreen),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CloseViewer => "close_viewer",
            Action::ToggleScale => "toggle_scale",
            Action::ToggleFullscreen => "toggle_fullscreen",
        }
    }
}

/// Parse an input binding such as `f`, `escape` or `ctrl+w`.
pub fn parse_input_binding(s: &str) -> Option<InputBinding> {
    let s = s.trim().to_lowercase();
    if let Some(key) = s.strip_prefix("ctrl+") {
        return parse_key(key).map(InputBinding::KeyWithCtrl);
    }
    if let Some(key) = s.strip_prefix("shift+") {
        return parse_key(key).map(InputBinding::KeyWithShift);
    }
    if let Some(key) = s.strip_prefix("alt+") {
        return parse_key(key).map(InputBinding::KeyWithAlt);
    }
    parse_key(&s).map(InputBinding::Key)
}

fn parse_key(s: &str) -> Option<egui::Key> {
    use egui::Key;
    let key = match s.trim() {
        "escape" | "esc" => Key::Escape,
        "enter" | "return" => Key::Enter,
        "space" => Key::Space,
        "tab" => Key::Tab,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "home" => Key::Home,
        "end" => Key::End,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "0" | "num0" => Key::Num0,
        "1" | "num1" => Key::Num1,
        "2" | "num2" => Key::Num2,
        "3" | "num3" => Key::Num3,
        "4" | "num4" => Key::Num4,
        "5" | "num5" => Key::Num5,
        "6" | "num6" => Key::Num6,
        "7" | "num7" => Key::Num7,
        "8" | "num8" => Key::Num8,
        "9" | "num9" => Key::Num9,
        other => return parse_letter(other),
    };
    Some(key)
}

fn parse_letter(s: &str) -> Option<egui::Key> {
    use egui::Key;
    const LETTERS: [Key; 26] = [
        Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
        Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
        Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
    ];
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c @ 'a'..='z'), None) => Some(LETTERS[(c as u8 - b'a') as usize]),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    bindings: HashMap<InputBinding, Action>,
    action_bindings: HashMap<Action, Vec<InputBinding>>,

    // ============ SERVER ============
    /// Backend root, e.g. `http://127.0.0.1:7860`.
    pub base_url: String,
    /// Records requested from `/api/history`; 0 means all.
    pub history_limit: usize,
    /// Per-request timeout. Generations can take minutes.
    pub request_timeout_secs: u64,

    // ============ VIEWER ============
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Wheel zoom factor is `exp(-delta * wheel_sensitivity)`.
    pub wheel_sensitivity: f32,
    /// Slack in points for pannable detection and edge flags.
    pub edge_threshold: f32,
    pub dialog_width_ratio: f32,
    pub dialog_height_ratio: f32,
    /// Ask the window system for fullscreen; `false` always simulates it.
    pub native_fullscreen: bool,
    /// How long to wait for the window system before simulating fullscreen.
    pub fullscreen_timeout_ms: u64,

    // ============ SETTINGS ============
    pub background_rgb: [u8; 3],
    /// Longest side of history thumbnails, in pixels.
    pub thumbnail_size: u32,
    /// Textures kept in the LRU cache.
    pub thumbnail_cache_size: usize,
    /// Longest side of the preview pane texture, in pixels.
    pub preview_max_side: u32,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Config {
            bindings: HashMap::new(),
            action_bindings: HashMap::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            history_limit: 0,
            request_timeout_secs: 600,
            min_zoom: 0.2,
            max_zoom: 8.0,
            wheel_sensitivity: 0.0015,
            edge_threshold: 1.0,
            dialog_width_ratio: 0.98,
            dialog_height_ratio: 0.96,
            native_fullscreen: true,
            fullscreen_timeout_ms: 500,
            background_rgb: [18, 18, 20],
            thumbnail_size: 256,
            thumbnail_cache_size: 64,
            preview_max_side: 1024,
        };
        config.set_defaults();
        config
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Server,
    Viewer,
    Settings,
    Shortcuts,
}

impl Config {
    fn set_defaults(&mut self) {
        self.add_binding(InputBinding::Key(egui::Key::Escape), Action::CloseViewer);
        self.add_binding(InputBinding::Key(egui::Key::Z), Action::ToggleScale);
        self.add_binding(InputBinding::Key(egui::Key::F), Action::ToggleFullscreen);
    }

    fn add_binding(&mut self, input: InputBinding, action: Action) {
        if let Some(previous) = self.bindings.insert(input, action) {
            if let Some(list) = self.action_bindings.get_mut(&previous) {
                list.retain(|binding| binding != &input);
            }
        }
        self.action_bindings.entry(action).or_default().push(input);
    }

    fn clear_bindings(&mut self, action: Action) {
        self.bindings.retain(|_, bound| *bound != action);
        self.action_bindings.remove(&action);
    }

    /// Platform config directory, e.g. `~/.config/gallery-viewer`.
    fn config_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "gallery-viewer")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.ini")
    }

    /// Load from the platform config path, writing the template on first run.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file is created from the template; an
    /// unreadable one falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            match fs::write(path, DEFAULT_CONFIG_INI) {
                Ok(()) => tracing::info!(path = %path.display(), "wrote default config"),
                Err(err) => tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "could not write default config"
                ),
            }
            return Self::parse_ini(DEFAULT_CONFIG_INI);
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::parse_ini(&content),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "could not read config, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse INI content. Unknown keys and invalid values are skipped with a
    /// warning; numeric values are clamped to sane ranges.
    pub fn parse_ini(content: &str) -> Self {
        let mut config = Config::default();
        let mut section = Section::None;
        let mut overridden: HashSet<Action> = HashSet::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = &line[1..line.len() - 1];
                section = match name.trim().to_lowercase().as_str() {
                    "server" => Section::Server,
                    "viewer" => Section::Viewer,
                    "settings" => Section::Settings,
                    "shortcuts" => Section::Shortcuts,
                    other => {
                        tracing::warn!(section = other, "unknown config section");
                        Section::None
                    }
                };
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            let applied = match section {
                Section::Server => config.apply_server(&key, value),
                Section::Viewer => config.apply_viewer(&key, value),
                Section::Settings => config.apply_settings(&key, value),
                Section::Shortcuts => match Action::from_str(&key) {
                    Some(action) => {
                        if overridden.insert(action) {
                            config.clear_bindings(action);
                        }
                        let mut any = false;
                        for binding_str in value.split(',').filter(|s| !s.trim().is_empty()) {
                            match parse_input_binding(binding_str) {
                                Some(binding) => {
                                    config.add_binding(binding, action);
                                    any = true;
                                }
                                None => tracing::warn!(
                                    binding = binding_str.trim(),
                                    "unknown key in shortcut"
                                ),
                            }
                        }
                        any
                    }
                    None => false,
                },
                Section::None => true,
            };
            if !applied {
                tracing::warn!(key = %key, value, "ignoring invalid config entry");
            }
        }

        config.fix_zoom_bounds();
        for action in Action::ALL {
            if config.get_bindings(action).is_empty() {
                tracing::warn!(action = action.as_str(), "shortcut has no bindings");
            }
        }
        config
    }

    fn apply_server(&mut self, key: &str, value: &str) -> bool {
        match key {
            "base_url" | "server" => {
                let trimmed = value.trim_end_matches('/');
                if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                    self.base_url = trimmed.to_string();
                    true
                } else {
                    false
                }
            }
            "history_limit" => value.parse::<usize>().map(|v| self.history_limit = v).is_ok(),
            "request_timeout_secs" => value
                .parse::<u64>()
                .map(|v| self.request_timeout_secs = v.clamp(5, 3600))
                .is_ok(),
            _ => false,
        }
    }

    fn apply_viewer(&mut self, key: &str, value: &str) -> bool {
        let float = || value.parse::<f32>().ok().filter(|v| v.is_finite());
        match key {
            "min_zoom" => float().map(|v| self.min_zoom = v.clamp(0.01, 1.0)).is_some(),
            "max_zoom" => float().map(|v| self.max_zoom = v.clamp(1.0, 64.0)).is_some(),
            "wheel_sensitivity" => float()
                .map(|v| self.wheel_sensitivity = v.clamp(0.0001, 0.05))
                .is_some(),
            "edge_threshold" => float().map(|v| self.edge_threshold = v.clamp(0.0, 32.0)).is_some(),
            "dialog_width_ratio" => float()
                .map(|v| self.dialog_width_ratio = v.clamp(0.5, 1.0))
                .is_some(),
            "dialog_height_ratio" => float()
                .map(|v| self.dialog_height_ratio = v.clamp(0.5, 1.0))
                .is_some(),
            "native_fullscreen" => parse_bool(value).map(|v| self.native_fullscreen = v).is_some(),
            "fullscreen_timeout_ms" => value
                .parse::<u64>()
                .map(|v| self.fullscreen_timeout_ms = v.clamp(50, 10_000))
                .is_ok(),
            _ => false,
        }
    }

    fn apply_settings(&mut self, key: &str, value: &str) -> bool {
        match key {
            "background_rgb" => parse_rgb_triplet(value)
                .map(|rgb| self.background_rgb = rgb)
                .is_some(),
            "thumbnail_size" => value
                .parse::<u32>()
                .map(|v| self.thumbnail_size = v.clamp(64, 1024))
                .is_ok(),
            "thumbnail_cache_size" => value
                .parse::<usize>()
                .map(|v| self.thumbnail_cache_size = v.clamp(8, 1024))
                .is_ok(),
            "preview_max_side" => value
                .parse::<u32>()
                .map(|v| self.preview_max_side = v.clamp(256, 8192))
                .is_ok(),
            _ => false,
        }
    }

    /// Zoom 1 must always be reachable.
    fn fix_zoom_bounds(&mut self) {
        self.min_zoom = self.min_zoom.min(1.0);
        self.max_zoom = self.max_zoom.max(1.0);
    }

    pub fn action_for(&self, input: &InputBinding) -> Option<Action> {
        self.bindings.get(input).copied()
    }

    pub fn get_bindings(&self, action: Action) -> Vec<InputBinding> {
        self.action_bindings.get(&action).cloned().unwrap_or_default()
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min: self.min_zoom,
            max: self.max_zoom,
            sensitivity: self.wheel_sensitivity,
        }
    }

    pub fn viewer_settings(&self) -> ViewerSettings {
        ViewerSettings {
            zoom: self.zoom_limits(),
            edge_threshold: self.edge_threshold,
            dialog_width_ratio: self.dialog_width_ratio,
            dialog_height_ratio: self.dialog_height_ratio,
            native_fullscreen: self.native_fullscreen,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fullscreen_timeout(&self) -> Duration {
        Duration::from_millis(self.fullscreen_timeout_ms)
    }

    pub fn background_color32(&self) -> egui::Color32 {
        let [r, g, b] = self.background_rgb;
        egui::Color32::from_rgb(r, g, b)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_rgb_triplet(value: &str) -> Option<[u8; 3]> {
    let parts: Vec<&str> = value
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;
    Some([r, g, b])
}
