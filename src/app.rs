// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! Owns the editing session, the box editor, and the persistence
//! gateway, and wires the panels together. Every durable mutation is a
//! transaction: snapshot the document, apply the change in memory,
//! persist on a background thread, and roll back to the snapshot if
//! the write fails.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crate::io::config::AppConfig;
use crate::io::gateway::LabelGateway;
use crate::io::media::{self, LoadedImage};
use crate::models::document::{LabelDocument, LabelObject};
use crate::models::editor::BoxEditor;
use crate::models::interp;
use crate::models::session::Session;
use crate::models::timekey::{self, TIME_MATCH_THRESHOLD};
use crate::ui::{canvas, objects, timeline};
use crate::util::color;

/// Wall-clock seconds for a full sweep of the normalized timeline
/// while playback runs.
const SWEEP_SECS: f64 = 30.0;

/// Playback tick interval.
const TICK: Duration = Duration::from_millis(33);

/// A durable write still in flight, with the document state to restore
/// if it fails.
struct PendingWrite {
    snapshot: LabelDocument,
    rx: Receiver<anyhow::Result<()>>,
}

/// One durable mutation, executed off the UI thread.
enum WriteOp {
    Merge(Vec<LabelObject>),
    DeleteKeyframe { obj_id: String, time: f64 },
    DeleteObject { obj_id: String, times: Vec<f64> },
}

fn run_write(gateway: &LabelGateway, op: WriteOp) -> anyhow::Result<()> {
    match op {
        WriteOp::Merge(updates) => gateway.write(&updates),
        WriteOp::DeleteKeyframe { obj_id, time } => gateway.delete_keyframe(&obj_id, time),
        WriteOp::DeleteObject { obj_id, times } => {
            for time in times {
                gateway.delete_keyframe(&obj_id, time)?;
            }
            Ok(())
        }
    }
}

/// Main application state.
pub struct VikaApp {
    config: AppConfig,
    gateway: Option<LabelGateway>,
    session: Session,
    editor: BoxEditor,

    playing: bool,
    last_tick: Instant,

    pending_writes: Vec<PendingWrite>,
    doc_loader: Option<Receiver<Result<LabelDocument, String>>>,
    image_loader: Option<Receiver<Result<LoadedImage, String>>>,

    backdrop: Option<egui::TextureHandle>,
    frame_size: Option<(u32, u32)>,

    loading_message: Option<String>,
    status: Option<String>,
    new_label: String,
    rename_edit: Option<(String, String)>,
}

impl Default for VikaApp {
    fn default() -> Self {
        Self::new()
    }
}

impl VikaApp {
    /// Create a new application instance.
    pub fn new() -> Self {
        Self {
            config: AppConfig::load(),
            gateway: None,
            session: Session::default(),
            editor: BoxEditor::new(),
            playing: false,
            last_tick: Instant::now(),
            pending_writes: Vec::new(),
            doc_loader: None,
            image_loader: None,
            backdrop: None,
            frame_size: None,
            loading_message: None,
            status: None,
            new_label: String::new(),
            rename_edit: None,
        }
    }

    /// Point the session at a video; its label document resolves to the
    /// `.cache` sibling unless a label file is opened afterwards.
    fn open_video(&mut self, path: PathBuf) {
        log::info!("Opening video {}", path.display());
        self.gateway = Some(LabelGateway::new(path, None));
        self.start_document_load();
    }

    /// Open an explicit label file, keeping the current video path.
    fn open_label_file(&mut self, path: PathBuf) {
        let video_path = self
            .gateway
            .as_ref()
            .map(|gw| gw.video_path().to_path_buf())
            .unwrap_or_default();
        log::info!("Opening label file {}", path.display());
        self.gateway = Some(LabelGateway::new(video_path, Some(path)));
        self.start_document_load();
    }

    /// Read (and possibly migrate) the document on a background thread.
    fn start_document_load(&mut self) {
        let Some(gateway) = self.gateway.clone() else {
            return;
        };
        let (sender, receiver) = channel();
        self.doc_loader = Some(receiver);
        self.loading_message = Some("Loading labels...".to_string());

        std::thread::spawn(move || {
            let result = gateway.read().map_err(|e| format!("{e:#}"));
            let _ = sender.send(result);
        });
    }

    /// Load a reference frame image as the canvas backdrop.
    fn load_frame_image(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.loading_message = Some("Loading frame image...".to_string());

        std::thread::spawn(move || {
            let result = media::load_image(&path).map_err(|e| format!("{e:#}"));
            let _ = sender.send(result);
        });
    }

    /// Recompute the rendered view from the document, selection, and
    /// playback position. Drops any unsaved canvas edit.
    fn refresh_view(&mut self) {
        let boxes = interp::boxes_at(
            &self.session.doc,
            self.session.selected(),
            self.session.position(),
        );
        self.editor.set_boxes(boxes);
    }

    fn seek(&mut self, t: f64) {
        self.session.set_position(t);
        self.refresh_view();
    }

    fn toggle_play(&mut self) {
        self.playing = !self.playing;
        self.last_tick = Instant::now();
    }

    /// The optimistic-write transaction: snapshot, mutate in memory,
    /// persist in the background, roll back in `poll_pending_writes`
    /// if the write fails.
    fn apply_persist(&mut self, op: WriteOp, mutate: impl FnOnce(&mut Session)) {
        let Some(gateway) = self.gateway.clone() else {
            self.status = Some("Open a video or label file first".to_string());
            return;
        };
        let snapshot = self.session.doc.clone();
        mutate(&mut self.session);
        self.session.prune();
        self.refresh_view();

        let (sender, receiver) = channel();
        std::thread::spawn(move || {
            let _ = sender.send(run_write(&gateway, op));
        });
        self.pending_writes.push(PendingWrite {
            snapshot,
            rx: receiver,
        });
    }

    fn poll_pending_writes(&mut self) {
        let mut remaining = Vec::new();
        for pending in std::mem::take(&mut self.pending_writes) {
            match pending.rx.try_recv() {
                Ok(Ok(())) => log::debug!("write committed"),
                Ok(Err(e)) => {
                    log::error!("write failed, rolling back: {e:#}");
                    self.status = Some(format!("Save failed: {e}"));
                    self.session.doc = pending.snapshot;
                    self.session.prune();
                    self.refresh_view();
                }
                Err(TryRecvError::Empty) => remaining.push(pending),
                Err(TryRecvError::Disconnected) => log::error!("write thread vanished"),
            }
        }
        self.pending_writes = remaining;
    }

    fn poll_document_loader(&mut self) {
        let Some(receiver) = &self.doc_loader else {
            return;
        };
        if let Ok(result) = receiver.try_recv() {
            self.doc_loader = None;
            self.loading_message = None;
            match result {
                Ok(doc) => {
                    log::info!("Loaded {} objects", doc.objects.len());
                    self.session.reset(doc);
                    self.refresh_view();
                }
                Err(e) => {
                    log::error!("Failed to load labels: {}", e);
                    self.status = Some(format!("Load failed: {e}"));
                }
            }
        }
    }

    fn poll_image_loader(&mut self, ctx: &egui::Context) {
        let Some(receiver) = &self.image_loader else {
            return;
        };
        if let Ok(result) = receiver.try_recv() {
            self.image_loader = None;
            self.loading_message = None;
            match result {
                Ok(loaded) => {
                    let size = [loaded.width as usize, loaded.height as usize];
                    let color_image =
                        egui::ColorImage::from_rgba_unmultiplied(size, &loaded.pixels);
                    self.backdrop = Some(ctx.load_texture(
                        "frame_image",
                        color_image,
                        egui::TextureOptions::LINEAR,
                    ));
                    self.frame_size = Some((loaded.width, loaded.height));
                }
                Err(e) => {
                    log::error!("Failed to load frame image: {}", e);
                    self.status = Some(format!("Image load failed: {e}"));
                }
            }
        }
    }

    /// Persist the active object's current box as a keyframe at the
    /// playback position, snapping onto an existing keyframe within
    /// the match threshold instead of creating a near-duplicate.
    fn save_keyframe(&mut self) {
        let Some(active_id) = self.session.active().map(str::to_string) else {
            self.status = Some("No active object to save".to_string());
            return;
        };
        let Some(dbox) = self.editor.box_for(&active_id).cloned() else {
            self.status = Some("Active object has no box at this time".to_string());
            return;
        };
        let Some(obj) = self.session.doc.object(&active_id) else {
            return;
        };

        let t = self.session.position();
        let key = timekey::nearest_key(&obj.timeline, t, TIME_MATCH_THRESHOLD)
            .unwrap_or_else(|| timekey::to_key(t));

        let mut anchor = dbox.anchor;
        anchor.label = obj.label.clone();
        anchor.color = None;
        if anchor.is_degenerate() {
            self.status = Some("Box too small to save".to_string());
            return;
        }

        let mut updated = obj.clone();
        updated.timeline.insert(key.clone(), anchor.clone());

        self.apply_persist(WriteOp::Merge(vec![updated]), move |session| {
            if let Some(obj) = session.doc.object_mut(&active_id) {
                obj.timeline.insert(key, anchor);
            }
        });
        self.status = Some(format!("Saved keyframe at {:.4}", t));
    }

    /// Delete the active object's keyframe nearest the playback
    /// position.
    fn delete_keyframe(&mut self) {
        let Some(active_id) = self.session.active().map(str::to_string) else {
            return;
        };
        let t = self.session.position();
        self.apply_persist(
            WriteOp::DeleteKeyframe {
                obj_id: active_id.clone(),
                time: t,
            },
            move |session| {
                session.doc.remove_keyframe(&active_id, t);
            },
        );
    }

    /// Objects stay session-local until their first keyframe is saved;
    /// the merge write that persists the keyframe carries the object.
    fn create_object(&mut self, label: String) {
        let id = self.session.doc.next_id();
        self.session.doc.objects.push(LabelObject {
            id: id.clone(),
            label,
            color: color::for_id(&id),
            timeline: Default::default(),
        });
        self.session.activate(&id);
        self.refresh_view();
    }

    fn rename_object(&mut self, id: String, label: String) {
        let Some(obj) = self.session.doc.object(&id) else {
            return;
        };
        if obj.timeline.is_empty() {
            // nothing durable yet
            self.session.doc.rename_object(&id, &label);
            self.refresh_view();
            return;
        }
        let mut updated = obj.clone();
        updated.label = label.clone();
        for bx in updated.timeline.values_mut() {
            bx.label = label.clone();
        }
        self.apply_persist(WriteOp::Merge(vec![updated]), move |session| {
            session.doc.rename_object(&id, &label);
        });
    }

    fn remove_object(&mut self, id: String) {
        let Some(obj) = self.session.doc.object(&id) else {
            return;
        };
        let times: Vec<f64> = obj
            .timeline
            .keys()
            .filter_map(|key| key.parse().ok())
            .collect();
        if times.is_empty() {
            // nothing durable yet
            self.session.doc.remove_object(&id);
            self.session.prune();
            self.refresh_view();
            return;
        }
        self.apply_persist(
            WriteOp::DeleteObject {
                obj_id: id.clone(),
                times,
            },
            move |session| {
                session.doc.remove_object(&id);
            },
        );
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.toggle_play();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if self.editor.cancel() {
                self.status = Some("Box removed".to_string());
            }
        }
        if ctx.input(|i| i.key_pressed(egui::Key::S) || i.key_pressed(egui::Key::Enter)) {
            self.save_keyframe();
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            self.delete_keyframe();
        }
    }

    fn advance_playback(&mut self, ctx: &egui::Context) {
        if !self.playing {
            return;
        }
        let now = Instant::now();
        let dt = now - self.last_tick;
        self.last_tick = now;

        let mut t = self.session.position() + dt.as_secs_f64() / SWEEP_SECS;
        if t >= 1.0 {
            t = 0.0;
        }
        self.seek(t);
        ctx.request_repaint_after(TICK);
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Video...").clicked() {
                    let mut dialog = rfd::FileDialog::new()
                        .add_filter("Videos", &["mp4", "mkv", "webm", "avi", "mov"]);
                    if let Some(root) = &self.config.video_root {
                        dialog = dialog.set_directory(root);
                    }
                    if let Some(path) = dialog.pick_file() {
                        self.open_video(path);
                    }
                    ui.close_menu();
                }
                if ui.button("Open Label File...").clicked() {
                    let mut dialog = rfd::FileDialog::new().add_filter("Labels", &["json"]);
                    if let Some(root) = &self.config.labels_root {
                        dialog = dialog.set_directory(root);
                    }
                    if let Some(path) = dialog.pick_file() {
                        self.open_label_file(path);
                    }
                    ui.close_menu();
                }
                if ui.button("Open Frame Image...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Images", &["jpg", "jpeg", "png", "bmp"])
                        .pick_file()
                    {
                        self.load_frame_image(path);
                    }
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                let has_active = self.session.active().is_some();
                if ui
                    .add_enabled(has_active, egui::Button::new("Save Keyframe (S)"))
                    .clicked()
                {
                    self.save_keyframe();
                    ui.close_menu();
                }
                if ui
                    .add_enabled(has_active, egui::Button::new("Delete Keyframe (Del)"))
                    .clicked()
                {
                    self.delete_keyframe();
                    ui.close_menu();
                }
            });

            ui.menu_button("Settings", |ui| {
                if ui.button("Set Video Root...").clicked() {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        self.config.video_root = Some(dir);
                        if let Err(e) = self.config.save() {
                            log::error!("Failed to save config: {e:#}");
                        }
                    }
                    ui.close_menu();
                }
                if ui.button("Set Labels Root...").clicked() {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        self.config.labels_root = Some(dir);
                        if let Err(e) = self.config.save() {
                            log::error!("Failed to save config: {e:#}");
                        }
                    }
                    ui.close_menu();
                }
            });
        });
    }
}

impl eframe::App for VikaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_pending_writes();
        self.poll_document_loader();
        self.poll_image_loader(ctx);
        self.advance_playback(ctx);
        self.handle_keyboard(ctx);

        if self.loading_message.is_some() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });

        let objects_action = egui::SidePanel::right("objects")
            .default_width(260.0)
            .show(ctx, |ui| {
                objects::show(
                    ui,
                    &self.session,
                    &mut self.new_label,
                    &mut self.rename_edit,
                )
            })
            .inner;

        match objects_action {
            objects::ObjectsAction::Create(label) => self.create_object(label),
            objects::ObjectsAction::Toggle(id) => {
                self.session.toggle_selection(&id);
                self.refresh_view();
            }
            objects::ObjectsAction::Activate(id) => {
                self.session.activate(&id);
                self.refresh_view();
            }
            objects::ObjectsAction::Rename(id, label) => self.rename_object(id, label),
            objects::ObjectsAction::Remove(id) => self.remove_object(id),
            objects::ObjectsAction::None => {}
        }

        let timeline_action = egui::TopBottomPanel::bottom("timeline")
            .show(ctx, |ui| {
                let action = timeline::show(ui, &self.session, self.playing);
                ui.separator();
                ui.horizontal(|ui| {
                    ui.label(format!("t = {:.4}", self.session.position()));
                    if let Some(status) = &self.status {
                        ui.separator();
                        ui.label(egui::RichText::new(status).weak());
                    }
                });
                action
            })
            .inner;

        match timeline_action {
            timeline::TimelineAction::Seek(t) => self.seek(t),
            timeline::TimelineAction::TogglePlay => self.toggle_play(),
            timeline::TimelineAction::SaveKeyframe => self.save_keyframe(),
            timeline::TimelineAction::DeleteKeyframe => self.delete_keyframe(),
            timeline::TimelineAction::None => {}
        }

        let canvas_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if let Some(message) = &self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(message)
                                    .size(16.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                        });
                    });
                    return canvas::CanvasAction::None;
                }
                if self.gateway.is_none() {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.heading(
                                egui::RichText::new("VIKA")
                                    .size(32.0)
                                    .color(egui::Color32::from_gray(200)),
                            );
                            ui.label(
                                egui::RichText::new("Video Interpolated Keyframe Annotator")
                                    .size(14.0)
                                    .color(egui::Color32::from_gray(150)),
                            );
                            ui.add_space(20.0);
                            ui.label(
                                egui::RichText::new("Open a video to begin annotating")
                                    .color(egui::Color32::from_gray(180)),
                            );
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new("File → Open Video...")
                                    .weak()
                                    .color(egui::Color32::from_gray(130)),
                            );
                        });
                    });
                    return canvas::CanvasAction::None;
                }
                canvas::show(
                    ui,
                    &mut self.editor,
                    self.session.active_object(),
                    &self.backdrop,
                    self.frame_size,
                )
            })
            .inner;

        match canvas_action {
            canvas::CanvasAction::Edited => {
                self.status = Some("Unsaved box edit - press S to save a keyframe".to_string());
            }
            canvas::CanvasAction::Discarded => {
                self.status = Some("Box discarded (below minimum size)".to_string());
            }
            canvas::CanvasAction::None => {}
        }
    }
}
