//! eframe application: generation form, preview pane, history grid and the
//! modal viewer.
//!
//! Widgets never mutate the gallery directly. Each frame collects
//! [`UiAction`]s while drawing and applies them afterwards, so the state the
//! frame was drawn from stays consistent for the whole frame.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use egui::{
    Align, Align2, Color32, CursorIcon, FontId, PointerButton, Pos2, Rect, RichText, Sense, Vec2,
};

use crate::api::ApiError;
use crate::config::{Action, Config, InputBinding};
use crate::dialog::DialogSize;
use crate::form::{FormState, MODEL_PRESETS, SIZE_SHORTCUTS, SIZE_STEP};
use crate::format::{format_bytes, format_created_at, format_duration};
use crate::gallery::Gallery;
use crate::geometry::{HostLayout, ScaleMode};
use crate::history::PreviewSlot;
use crate::pan::EdgeFlags;
use crate::record::{GenerationRecord, RecordId};
use crate::status::{StatusKind, StatusLine, BUSY_MESSAGE, DONE_MESSAGE};
use crate::thumbnails::TextureCache;
use crate::viewer::{CloseOutcome, HostRequest, SessionToken, ViewerController};
use crate::worker::{BackendWorker, DecodedImage, Event, ImageKey, Job};

const DIALOG_MAX: Vec2 = Vec2::new(1100.0, 760.0);
const DIALOG_SCREEN_FRACTION: f32 = 0.9;
const DIALOG_PADDING: f32 = 12.0;
const HEADER_HEIGHT: f32 = 44.0;
const DETAILS_WIDTH: f32 = 300.0;
const DETAILS_GAP: f32 = 16.0;
const FORM_WIDTH: f32 = 300.0;
const THUMB_SIZE: f32 = 176.0;
const PREVIEW_HEIGHT: f32 = 380.0;
const EDGE_SHADE: f32 = 28.0;
const BUSY_REPAINT: Duration = Duration::from_millis(250);

const FULL_UV: Rect = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));

#[derive(Debug, Clone, PartialEq)]
enum UiAction {
    Open(RecordId),
    Close,
    ToggleScale,
    ToggleFullscreen,
    ShowInPreview(RecordId),
    AskDelete(RecordId),
    ConfirmDelete,
    CancelDelete,
    Generate,
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TextureState {
    Ready { id: egui::TextureId, natural: Vec2 },
    Loading,
    Failed,
}

/// Screen regions of the modal viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ModalRects {
    dialog: Rect,
    header: Rect,
    image: Rect,
    /// Hidden in fullscreen.
    details: Option<Rect>,
}

pub struct GalleryApp {
    config: Config,
    gallery: Gallery,
    worker: BackendWorker,
    textures: TextureCache,
    form: FormState,
    status: StatusLine,
    /// Record waiting for the user to confirm deletion.
    confirm_delete: Option<RecordId>,
    /// Deletes sent to the backend and not answered yet.
    deleting: HashSet<RecordId>,
    history_loading: bool,
    /// Native fullscreen asked of the window, not yet confirmed.
    fullscreen_pending: Option<(SessionToken, Instant)>,
    host_fullscreen: bool,
}

impl GalleryApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: Config,
        mut worker: BackendWorker,
    ) -> Self {
        let mut visuals = egui::Visuals::dark();
        let bg = config.background_color32();
        visuals.window_fill = bg;
        visuals.panel_fill = bg;
        cc.egui_ctx.set_visuals(visuals);

        worker.submit(Job::LoadHistory);
        let host_fullscreen = cc
            .egui_ctx
            .input(|i| i.viewport().fullscreen)
            .unwrap_or(false);

        Self {
            gallery: Gallery::new(config.viewer_settings()),
            textures: TextureCache::new(config.thumbnail_cache_size),
            form: FormState::default(),
            status: StatusLine::default(),
            confirm_delete: None,
            deleting: HashSet::new(),
            history_loading: true,
            fullscreen_pending: None,
            host_fullscreen,
            config,
            worker,
        }
    }

    fn process_events(&mut self, ctx: &egui::Context) {
        for event in self.worker.poll() {
            match event {
                Event::HistoryLoaded(result) => {
                    self.history_loading = false;
                    match result {
                        Ok(records) => {
                            if let Some(closed) = self.gallery.load(records) {
                                self.finish_close(ctx, closed);
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "history load failed");
                            let message = user_message(&err, "Unable to load history.");
                            self.status.set(StatusKind::Error, message);
                        }
                    }
                }
                Event::Deleted { id, result } => {
                    self.deleting.remove(&id);
                    match self.gallery.apply_delete_result(&id, result) {
                        Ok(outcome) => {
                            if let Some(record) = &outcome.removal.removed {
                                self.textures.forget_path(&record.output.path);
                            }
                            if let Some(closed) = outcome.closed {
                                self.finish_close(ctx, closed);
                            }
                        }
                        Err(err) => {
                            tracing::warn!(record = %id, error = %err, "delete failed");
                            self.status
                                .set(StatusKind::Error, user_message(&err, "Delete failed."));
                        }
                    }
                }
                Event::Generated(result) => match result {
                    Ok(record) => {
                        self.gallery.insert_generated(record);
                        self.status.set(StatusKind::Idle, DONE_MESSAGE);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "generation failed");
                        self.status
                            .set(StatusKind::Error, user_message(&err, "Generation failed."));
                    }
                },
                Event::ImageReady { key, result } => self.apply_image(ctx, key, result),
            }
        }
    }

    fn apply_image(
        &mut self,
        ctx: &egui::Context,
        key: ImageKey,
        result: Result<DecodedImage, ApiError>,
    ) {
        let stale_viewer =
            matches!(key, ImageKey::Viewer { .. }) && self.viewer_key().as_ref() != Some(&key);
        if stale_viewer {
            tracing::debug!(path = key.path(), "dropping image for closed viewer session");
            let current = self.viewer_key();
            self.textures.retain_viewer(current.as_ref());
            return;
        }
        let image = match result {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(path = key.path(), error = %err, "image fetch failed");
                self.textures.mark_failed(key);
                return;
            }
        };
        if let ImageKey::Viewer { token, .. } = &key {
            let natural = Vec2::new(image.original_width as f32, image.original_height as f32);
            self.gallery.viewer_mut().on_image_decoded(*token, natural);
        }
        self.textures.insert(ctx, key, image);
    }

    fn viewer_key(&self) -> Option<ImageKey> {
        let viewer = self.gallery.viewer();
        Some(ImageKey::Viewer {
            token: viewer.token()?,
            path: viewer.record()?.output.path.clone(),
        })
    }

    /// Forward window fullscreen changes and time out unanswered requests.
    fn sync_fullscreen(&mut self, ctx: &egui::Context) {
        let host = ctx
            .input(|i| i.viewport().fullscreen)
            .unwrap_or(self.host_fullscreen);
        if host != self.host_fullscreen {
            self.host_fullscreen = host;
            tracing::debug!(fullscreen = host, "window fullscreen changed");
            self.gallery.viewer_mut().on_fullscreen_changed(host);
            if host {
                self.fullscreen_pending = None;
            }
        }

        let Some((token, requested_at)) = self.fullscreen_pending else {
            return;
        };
        let timeout = self.config.fullscreen_timeout();
        if self.gallery.viewer().token() != Some(token) {
            self.fullscreen_pending = None;
        } else if requested_at.elapsed() >= timeout {
            self.fullscreen_pending = None;
            self.gallery.viewer_mut().on_fullscreen_rejected(token);
        } else {
            ctx.request_repaint_after(timeout.saturating_sub(requested_at.elapsed()));
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let presses: Vec<InputBinding> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        repeat: false,
                        modifiers,
                        ..
                    } => Some(InputBinding::from_press(*key, *modifiers)),
                    _ => None,
                })
                .collect()
        });

        for binding in presses {
            let Some(action) = self.config.action_for(&binding) else {
                continue;
            };
            if self.confirm_delete.is_some() {
                if action == Action::CloseViewer {
                    self.confirm_delete = None;
                }
                continue;
            }
            if !self.gallery.viewer().is_open() {
                continue;
            }
            match action {
                Action::CloseViewer => self.close_viewer(ctx),
                Action::ToggleScale => {
                    self.gallery.viewer_mut().toggle_scale();
                }
                Action::ToggleFullscreen => self.toggle_fullscreen(ctx),
            }
        }
    }

    fn open_viewer(&mut self, ctx: &egui::Context, id: &RecordId) {
        let focus = ctx.memory(|m| m.focused());
        match self.gallery.open(id, focus) {
            Ok(_) => {
                if let Some(focus) = focus {
                    ctx.memory_mut(|m| m.surrender_focus(focus));
                }
                let keep = self.viewer_key();
                self.textures.retain_viewer(keep.as_ref());
            }
            Err(err) => tracing::warn!(error = %err, "cannot open viewer"),
        }
    }

    fn close_viewer(&mut self, ctx: &egui::Context) {
        if let Some(outcome) = self.gallery.close() {
            self.finish_close(ctx, outcome);
        }
    }

    fn finish_close(&mut self, ctx: &egui::Context, outcome: CloseOutcome) {
        if outcome.exit_native_fullscreen {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
        }
        if let Some(focus) = outcome.restore_focus {
            ctx.memory_mut(|m| m.request_focus(focus));
        }
        self.fullscreen_pending = None;
        self.textures.retain_viewer(None);
    }

    fn toggle_fullscreen(&mut self, ctx: &egui::Context) {
        match self.gallery.viewer_mut().request_fullscreen_toggle() {
            Some(HostRequest::EnterFullscreen { token }) => {
                if self.host_fullscreen {
                    // Already fullscreen; no change event will come.
                    self.gallery.viewer_mut().on_fullscreen_changed(true);
                } else {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(true));
                    self.fullscreen_pending = Some((token, Instant::now()));
                    ctx.request_repaint_after(self.config.fullscreen_timeout());
                }
            }
            Some(HostRequest::ExitFullscreen) => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
            }
            None => {}
        }
    }

    fn generate(&mut self) {
        if self.status.is_busy() {
            return;
        }
        match self.form.to_request() {
            Ok(request) => {
                tracing::info!(
                    model = %request.model,
                    width = request.width,
                    height = request.height,
                    "generation requested"
                );
                self.status.set(StatusKind::Busy, BUSY_MESSAGE);
                self.worker.submit(Job::Generate(request));
            }
            Err(err) => self.status.set(StatusKind::Error, err.to_string()),
        }
    }

    fn apply(&mut self, ctx: &egui::Context, action: UiAction) {
        match action {
            UiAction::Open(id) => self.open_viewer(ctx, &id),
            UiAction::Close => self.close_viewer(ctx),
            UiAction::ToggleScale => {
                self.gallery.viewer_mut().toggle_scale();
            }
            UiAction::ToggleFullscreen => self.toggle_fullscreen(ctx),
            UiAction::ShowInPreview(id) => {
                if let Err(err) = self.gallery.set_preview(&id) {
                    tracing::warn!(error = %err, "cannot preview record");
                }
            }
            UiAction::AskDelete(id) => self.confirm_delete = Some(id),
            UiAction::ConfirmDelete => {
                if let Some(id) = self.confirm_delete.take() {
                    if self.gallery.history().contains(&id) && self.deleting.insert(id.clone()) {
                        self.worker.submit(Job::Delete(id));
                    }
                }
            }
            UiAction::CancelDelete => self.confirm_delete = None,
            UiAction::Generate => self.generate(),
            UiAction::Refresh => {
                self.history_loading = true;
                self.worker.submit(Job::LoadHistory);
            }
        }
    }

    fn draw_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let color = match self.status.kind() {
                    StatusKind::Idle => ui.visuals().weak_text_color(),
                    StatusKind::Busy => Color32::from_rgb(240, 190, 90),
                    StatusKind::Error => ui.visuals().error_fg_color,
                };
                ui.label(RichText::new(self.status.message()).color(color));
                if let Some(elapsed) = self.status.elapsed_label() {
                    ui.label(RichText::new(elapsed).monospace());
                }
                ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                    ui.label(RichText::new(self.worker.client().base_url()).small().weak());
                });
            });
        });
    }

    fn draw_form(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::SidePanel::left("form")
            .resizable(false)
            .exact_width(FORM_WIDTH)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.heading("Generate");
                    ui.add_space(6.0);

                    ui.label("Model");
                    ui.horizontal(|ui| {
                        for preset in &MODEL_PRESETS {
                            if ui
                                .selectable_label(self.form.model == preset.id, preset.label)
                                .clicked()
                            {
                                self.form.apply_preset(preset.id);
                            }
                        }
                    });
                    ui.label(RichText::new(self.form.hint()).small().weak());
                    ui.add_space(8.0);

                    ui.label("Prompt");
                    ui.add(
                        egui::TextEdit::multiline(&mut self.form.prompt)
                            .hint_text("Describe the image")
                            .desired_rows(4)
                            .desired_width(f32::INFINITY),
                    );
                    ui.label("Negative prompt");
                    ui.add(
                        egui::TextEdit::multiline(&mut self.form.negative_prompt)
                            .desired_rows(2)
                            .desired_width(f32::INFINITY),
                    );
                    ui.add_space(8.0);

                    egui::Grid::new("form_params")
                        .num_columns(2)
                        .spacing([12.0, 6.0])
                        .show(ui, |ui| {
                            ui.label("Width");
                            ui.add(
                                egui::DragValue::new(&mut self.form.width)
                                    .range(SIZE_STEP..=4096)
                                    .speed(SIZE_STEP as f64),
                            );
                            ui.end_row();

                            ui.label("Height");
                            ui.add(
                                egui::DragValue::new(&mut self.form.height)
                                    .range(SIZE_STEP..=4096)
                                    .speed(SIZE_STEP as f64),
                            );
                            ui.end_row();

                            ui.label("Steps");
                            ui.add(egui::DragValue::new(&mut self.form.steps).range(1..=100));
                            ui.end_row();

                            ui.label("Guidance");
                            ui.add(
                                egui::Slider::new(&mut self.form.guidance_scale, 0.0..=20.0)
                                    .step_by(0.1),
                            );
                            ui.end_row();

                            ui.label("Seed");
                            ui.horizontal(|ui| {
                                ui.add(
                                    egui::TextEdit::singleline(&mut self.form.seed)
                                        .hint_text("random")
                                        .desired_width(110.0),
                                );
                                if ui.button("Random").clicked() {
                                    self.form.randomize_seed();
                                }
                            });
                            ui.end_row();
                        });

                    ui.horizontal_wrapped(|ui| {
                        for size in SIZE_SHORTCUTS {
                            if ui.small_button(size.to_string()).clicked() {
                                self.form.set_square(size);
                            }
                        }
                    });
                    ui.add_space(12.0);

                    let busy = self.status.is_busy();
                    let label = if busy { "Generating..." } else { "Generate" };
                    let button = egui::Button::new(label)
                        .min_size(Vec2::new(ui.available_width(), 32.0));
                    if ui.add_enabled(!busy, button).clicked() {
                        actions.push(UiAction::Generate);
                    }
                });
            });
    }

    fn draw_gallery(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let frame = egui::Frame::none()
            .fill(self.config.background_color32())
            .inner_margin(16.0);
        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            self.draw_preview(ui, actions);
            ui.add_space(12.0);
            self.draw_history(ui, actions);
        });
    }

    fn draw_preview(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let max_side = self.config.preview_max_side;
        let (rect, response) =
            ui.allocate_exact_size(Vec2::new(ui.available_width(), PREVIEW_HEIGHT), Sense::click());

        match self.gallery.history().preview() {
            PreviewSlot::Placeholder(placeholder) => {
                let painter = ui.painter();
                painter.rect_filled(rect, 8.0, ui.visuals().extreme_bg_color);
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    placeholder.message(),
                    FontId::proportional(18.0),
                    ui.visuals().weak_text_color(),
                );
            }
            PreviewSlot::Record(record) => {
                let key = ImageKey::Preview(record.output.path.clone());
                let state = texture_for(&mut self.textures, &mut self.worker, key, max_side);
                paint_texture(ui, rect, 8.0, state);
                if response.on_hover_cursor(CursorIcon::PointingHand).clicked() {
                    actions.push(UiAction::Open(record.id.clone()));
                }
                ui.horizontal_wrapped(|ui| {
                    ui.add(egui::Label::new(record.prompt_or_untitled()).truncate());
                });
                ui.label(
                    RichText::new(format!(
                        "{} · {} · {}",
                        record.size_label(),
                        record.model_label(),
                        format_duration(record.duration_ms)
                    ))
                    .small()
                    .weak(),
                );
            }
        }
    }

    fn draw_history(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let thumb_side = self.config.thumbnail_size;
        ui.horizontal(|ui| {
            ui.heading("History");
            ui.label(RichText::new(format!("{} items", self.gallery.history().len())).weak());
            ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                if ui
                    .add_enabled(!self.history_loading, egui::Button::new("Refresh"))
                    .clicked()
                {
                    actions.push(UiAction::Refresh);
                }
                if self.history_loading {
                    ui.spinner();
                }
            });
        });
        ui.separator();

        if self.gallery.history().is_empty() {
            ui.label(RichText::new("No renders yet.").weak());
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.spacing_mut().item_spacing = Vec2::splat(12.0);
                    for record in self.gallery.history().records() {
                        let deleting = self.deleting.contains(&record.id);
                        egui::Frame::group(ui.style()).show(ui, |ui| {
                            ui.set_width(THUMB_SIZE);
                            ui.vertical(|ui| {
                                let (rect, thumb) =
                                    ui.allocate_exact_size(Vec2::splat(THUMB_SIZE), Sense::click());
                                // Only visible cards fetch, so the LRU never thrashes.
                                if ui.is_rect_visible(rect) {
                                    let key = ImageKey::Thumbnail(record.output.path.clone());
                                    let state = texture_for(
                                        &mut self.textures,
                                        &mut self.worker,
                                        key,
                                        thumb_side,
                                    );
                                    paint_texture(ui, rect, 6.0, state);
                                }
                                if thumb.on_hover_cursor(CursorIcon::PointingHand).clicked() {
                                    actions.push(UiAction::Open(record.id.clone()));
                                }
                                history_card_text(ui, record);
                                ui.horizontal(|ui| {
                                    if ui.small_button("Preview").clicked() {
                                        actions.push(UiAction::ShowInPreview(record.id.clone()));
                                    }
                                    let label = if deleting { "Deleting..." } else { "Delete" };
                                    if ui
                                        .add_enabled(!deleting, egui::Button::new(label).small())
                                        .clicked()
                                    {
                                        actions.push(UiAction::AskDelete(record.id.clone()));
                                    }
                                });
                            });
                        });
                    }
                });
            });
    }

    fn draw_viewer(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let screen = ctx.screen_rect();
        let fullscreen = self.gallery.viewer().is_fullscreen();
        let rects = modal_rects(screen, fullscreen, self.gallery.viewer().dialog_size());

        if self.gallery.viewer().wants_resize_events() {
            let host = host_layout(screen, &rects, ctx.pixels_per_point());
            self.gallery.viewer_mut().on_resize(host);
        }
        if self.confirm_delete.is_none() {
            self.viewer_pointer_input(ctx, rects.image);
        }

        let Some(key) = self.viewer_key() else {
            return;
        };
        let max_side = ctx.input(|i| i.max_texture_side) as u32;
        let state = texture_for(&mut self.textures, &mut self.worker, key, max_side);
        let bg = self.config.background_color32();
        let viewer = self.gallery.viewer();
        let Some(record) = viewer.record() else {
            return;
        };
        let deleting = self.deleting.contains(&record.id);

        egui::Area::new(egui::Id::new("viewer_modal"))
            .order(egui::Order::Foreground)
            .fixed_pos(screen.min)
            .show(ctx, |ui| {
                let backdrop = ui.allocate_rect(screen, Sense::click());
                ui.painter()
                    .rect_filled(screen, 0.0, Color32::from_black_alpha(190));
                let outside_dialog = ctx
                    .input(|i| i.pointer.interact_pos())
                    .is_some_and(|pos| !rects.dialog.contains(pos));
                if backdrop.clicked() && outside_dialog {
                    actions.push(UiAction::Close);
                }

                let rounding = if fullscreen { 0.0 } else { 10.0 };
                ui.painter().rect_filled(rects.dialog, rounding, bg);
                ui.allocate_rect(rects.dialog, Sense::click());

                ui.allocate_new_ui(
                    egui::UiBuilder::new()
                        .max_rect(rects.header)
                        .layout(egui::Layout::left_to_right(Align::Center)),
                    |ui| viewer_header(ui, viewer, record, deleting, actions),
                );

                paint_viewer_image(ui, rects.image, viewer, state);

                if let Some(details) = rects.details {
                    ui.allocate_new_ui(egui::UiBuilder::new().max_rect(details), |ui| {
                        egui::ScrollArea::vertical()
                            .auto_shrink([false, false])
                            .show(ui, |ui| details_panel(ui, record));
                    });
                }
            });

        let hovering_image = ctx
            .input(|i| i.pointer.hover_pos())
            .is_some_and(|pos| rects.image.contains(pos));
        if viewer.is_panning() {
            ctx.set_cursor_icon(CursorIcon::Grabbing);
        } else if viewer.is_pannable() && hovering_image {
            ctx.set_cursor_icon(CursorIcon::Grab);
        }
    }

    fn viewer_pointer_input(&mut self, ctx: &egui::Context, image_rect: Rect) {
        let (pressed, press_origin, latest, released, gone, hover, wheel) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.press_origin(),
                i.pointer.latest_pos(),
                i.pointer.any_released(),
                !i.pointer.has_pointer(),
                i.pointer.hover_pos(),
                i.raw_scroll_delta,
            )
        });
        let viewer = self.gallery.viewer_mut();

        if pressed {
            if let Some(pos) = press_origin {
                viewer.on_pointer_down(PointerButton::Primary, pos);
            }
        }
        if let Some(pos) = latest {
            viewer.on_pointer_move(pos);
        }
        if released || gone {
            viewer.on_pointer_up();
        }

        // egui reports wheel-up as positive y; the engine wants DOM-style deltas.
        if wheel != Vec2::ZERO {
            if let Some(pos) = hover.filter(|pos| image_rect.contains(*pos)) {
                if viewer.is_fullscreen() {
                    viewer.on_wheel(-wheel.y, pos);
                } else {
                    viewer.on_scroll(-wheel);
                }
            }
        }
    }

    fn draw_confirm(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::Area::new(egui::Id::new("confirm_delete"))
            .order(egui::Order::Tooltip)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style())
                    .inner_margin(16.0)
                    .show(ui, |ui| {
                        ui.label("Delete this history item?");
                        ui.add_space(8.0);
                        ui.horizontal(|ui| {
                            if ui.button("Delete").clicked() {
                                actions.push(UiAction::ConfirmDelete);
                            }
                            if ui.button("Cancel").clicked() {
                                actions.push(UiAction::CancelDelete);
                            }
                        });
                    });
            });
    }
}

impl eframe::App for GalleryApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_events(ctx);
        self.sync_fullscreen(ctx);
        self.handle_keys(ctx);

        let mut actions = Vec::new();
        self.draw_status(ctx);
        self.draw_form(ctx, &mut actions);
        self.draw_gallery(ctx, &mut actions);
        if self.gallery.viewer().is_open() {
            self.draw_viewer(ctx, &mut actions);
        }
        if self.confirm_delete.is_some() {
            self.draw_confirm(ctx, &mut actions);
        }

        for action in actions {
            self.apply(ctx, action);
        }

        if self.status.is_busy() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::from(self.config.background_color32()).to_array()
    }
}

/// Cached texture for `key`, submitting a fetch the first time it is missing.
fn texture_for(
    textures: &mut TextureCache,
    worker: &mut BackendWorker,
    key: ImageKey,
    max_side: u32,
) -> TextureState {
    if let Some(ready) = textures.get(&key).map(|texture| TextureState::Ready {
        id: texture.handle.id(),
        natural: texture.natural,
    }) {
        return ready;
    }
    if textures.has_failed(&key) {
        return TextureState::Failed;
    }
    if textures.begin_fetch(&key) {
        worker.submit(Job::FetchImage { key, max_side });
    }
    TextureState::Loading
}

fn paint_texture(ui: &egui::Ui, rect: Rect, rounding: f32, state: TextureState) {
    let painter = ui.painter();
    painter.rect_filled(rect, rounding, ui.visuals().extreme_bg_color);
    match state {
        TextureState::Ready { id, natural } => {
            let size = fit_within(natural, rect.shrink(4.0).size());
            painter.image(id, Rect::from_center_size(rect.center(), size), FULL_UV, Color32::WHITE);
        }
        TextureState::Loading => {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Loading...",
                FontId::proportional(13.0),
                ui.visuals().weak_text_color(),
            );
        }
        TextureState::Failed => {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Unavailable",
                FontId::proportional(13.0),
                ui.visuals().error_fg_color,
            );
        }
    }
}

fn history_card_text(ui: &mut egui::Ui, record: &GenerationRecord) {
    ui.add(egui::Label::new(record.prompt_or_untitled()).truncate());
    ui.horizontal(|ui| {
        chip(ui, record.mode.label());
        chip(ui, &record.model_label());
    });
    ui.label(
        RichText::new(format!(
            "{} · {}",
            format_created_at(record.created_at.as_deref()),
            format_duration(record.duration_ms)
        ))
        .small()
        .weak(),
    );
}

fn chip(ui: &mut egui::Ui, text: &str) {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(8.0)
        .inner_margin(egui::Margin::symmetric(6.0, 2.0))
        .show(ui, |ui| {
            ui.label(RichText::new(text).small());
        });
}

fn viewer_header(
    ui: &mut egui::Ui,
    viewer: &ViewerController,
    record: &GenerationRecord,
    deleting: bool,
    actions: &mut Vec<UiAction>,
) {
    ui.label(RichText::new(record.file_name().unwrap_or("Image")).strong());
    ui.label(RichText::new(viewer.scale_label()).monospace().weak());

    ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
        if ui.button("Close").clicked() {
            actions.push(UiAction::Close);
        }
        if ui.button("Show in preview").clicked() {
            actions.push(UiAction::ShowInPreview(record.id.clone()));
        }
        if ui
            .add_enabled(!deleting, egui::Button::new("Delete"))
            .clicked()
        {
            actions.push(UiAction::AskDelete(record.id.clone()));
        }
        let full = if viewer.is_fullscreen() { "Exit" } else { "Full" };
        if ui.button(full).clicked() {
            actions.push(UiAction::ToggleFullscreen);
        }
        let scale = match viewer.scale_mode() {
            ScaleMode::Fit => "1:1",
            ScaleMode::Pixel => "Fit",
        };
        if ui
            .add_enabled(viewer.natural_size().is_some(), egui::Button::new(scale))
            .clicked()
        {
            actions.push(UiAction::ToggleScale);
        }
    });
}

fn paint_viewer_image(
    ui: &egui::Ui,
    viewport: Rect,
    viewer: &ViewerController,
    state: TextureState,
) {
    let painter = ui.painter().with_clip_rect(viewport);
    match (state, viewer.layout()) {
        (TextureState::Ready { id, .. }, Some(layout)) => {
            let origin = viewport.min + viewer.image_offset();
            painter.image(id, Rect::from_min_size(origin, layout.size), FULL_UV, Color32::WHITE);
            if viewer.is_pannable() {
                shade_edges(&painter, viewport, viewer.edges());
            }
        }
        (TextureState::Failed, _) => {
            painter.text(
                viewport.center(),
                Align2::CENTER_CENTER,
                "Unable to load image.",
                FontId::proportional(16.0),
                ui.visuals().error_fg_color,
            );
        }
        _ => {
            painter.text(
                viewport.center(),
                Align2::CENTER_CENTER,
                "Loading image...",
                FontId::proportional(16.0),
                ui.visuals().weak_text_color(),
            );
        }
    }
}

/// Darken each side that has more content beyond it.
fn shade_edges(painter: &egui::Painter, viewport: Rect, edges: EdgeFlags) {
    let shade = Color32::from_black_alpha(110);
    let (min, max) = (viewport.min, viewport.max);
    let band = |rect: Rect| painter.rect_filled(rect, 0.0, shade);
    if !edges.left {
        band(Rect::from_min_max(min, Pos2::new(min.x + EDGE_SHADE, max.y)));
    }
    if !edges.right {
        band(Rect::from_min_max(Pos2::new(max.x - EDGE_SHADE, min.y), max));
    }
    if !edges.top {
        band(Rect::from_min_max(min, Pos2::new(max.x, min.y + EDGE_SHADE)));
    }
    if !edges.bottom {
        band(Rect::from_min_max(Pos2::new(min.x, max.y - EDGE_SHADE), max));
    }
}

fn details_panel(ui: &mut egui::Ui, record: &GenerationRecord) {
    ui.label(RichText::new("Prompt").small().weak());
    ui.label(record.prompt_or_untitled());
    if let Some(negative) = record.negative_prompt_text() {
        ui.add_space(6.0);
        ui.label(RichText::new("Negative prompt").small().weak());
        ui.label(negative);
    }
    ui.add_space(10.0);

    egui::Grid::new("viewer_details")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            detail_row(ui, "Model", record.model_label());
            detail_row(ui, "Mode", record.mode.label().to_string());
            detail_row(ui, "Size", record.size_label());
            detail_row(ui, "Steps", record.params.steps.to_string());
            detail_row(ui, "Guidance", format!("{:.1}", record.params.guidance_scale));
            detail_row(ui, "Seed", record.params.seed.to_string());
            if let Some(strength) = record.params.strength {
                detail_row(ui, "Strength", format!("{strength:.2}"));
            }
            detail_row(ui, "Duration", format_duration(record.duration_ms));
            detail_row(ui, "Created", format_created_at(record.created_at.as_deref()));
            if let Some(name) = record.file_name() {
                detail_row(ui, "File", name.to_string());
            }
            if let Some(bytes) = record.output.size_bytes {
                detail_row(ui, "File size", format_bytes(bytes));
            }
        });

    let inputs = record.input_images();
    if !inputs.is_empty() {
        ui.add_space(10.0);
        ui.label(RichText::new("Inputs").small().weak());
        for input in inputs {
            ui.label(input.name.as_deref().unwrap_or(&input.path));
        }
    }
}

fn detail_row(ui: &mut egui::Ui, name: &str, value: String) {
    ui.label(RichText::new(name).weak());
    ui.label(value);
    ui.end_row();
}

/// Status text for a failed backend call: the server's own message when it
/// sent one, `fallback` otherwise.
fn user_message(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Status { message, .. } if !message.trim().is_empty() => message.clone(),
        _ => fallback.to_string(),
    }
}

fn modal_rects(screen: Rect, fullscreen: bool, explicit: DialogSize) -> ModalRects {
    let dialog = if fullscreen {
        screen
    } else {
        let default = (screen.size() * DIALOG_SCREEN_FRACTION).min(DIALOG_MAX);
        let size = Vec2::new(
            explicit.width.unwrap_or(default.x),
            explicit.height.unwrap_or(default.y),
        )
        .min(screen.size());
        Rect::from_center_size(screen.center(), size)
    };

    let inner = dialog.shrink(DIALOG_PADDING);
    let header = Rect::from_min_size(inner.min, Vec2::new(inner.width(), HEADER_HEIGHT));
    let body = Rect::from_min_max(Pos2::new(inner.min.x, header.max.y), inner.max);
    if fullscreen {
        return ModalRects {
            dialog,
            header,
            image: body,
            details: None,
        };
    }

    let image_right = (body.max.x - DETAILS_WIDTH - DETAILS_GAP).max(body.min.x);
    let image = Rect::from_min_max(body.min, Pos2::new(image_right, body.max.y));
    let details = Rect::from_min_max(
        Pos2::new((image_right + DETAILS_GAP).min(body.max.x), body.min.y),
        body.max,
    );
    ModalRects {
        dialog,
        header,
        image,
        details: Some(details),
    }
}

/// Largest size with `size`'s aspect ratio that fits in `bounds`.
fn fit_within(size: Vec2, bounds: Vec2) -> Vec2 {
    if size.x <= 0.0 || size.y <= 0.0 {
        return Vec2::ZERO;
    }
    size * (bounds.x / size.x).min(bounds.y / size.y)
}

fn host_layout(screen: Rect, rects: &ModalRects, pixels_per_point: f32) -> HostLayout {
    HostLayout {
        window: screen.size(),
        dialog: rects.dialog.size(),
        image_rect: rects.image,
        side_panel: if rects.details.is_some() {
            DETAILS_WIDTH + DETAILS_GAP
        } else {
            0.0
        },
        pixels_per_point,
    }
}
