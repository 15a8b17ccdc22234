// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for the video frame and box annotations.
//!
//! Renders the boxes held by the editor over an optional reference
//! frame, converts egui pointer events into normalized coordinates for
//! the editing state machine, and reflects its cursor hint.

use crate::models::document::LabelObject;
use crate::models::editor::{BoxEditor, CursorHint, GestureEnd};
use crate::util::{color, geometry};

/// Result of canvas interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasAction {
    None,
    /// A gesture ended with a surviving box edit (not yet persisted).
    Edited,
    /// A gesture ended below the minimum box size and was dropped.
    Discarded,
}

/// Display the drawing surface and feed pointer events to the editor.
pub fn show(
    ui: &mut egui::Ui,
    editor: &mut BoxEditor,
    active: Option<&LabelObject>,
    backdrop: &Option<egui::TextureHandle>,
    frame_size: Option<(u32, u32)>,
) -> CanvasAction {
    let mut action = CanvasAction::None;
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let available = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available);

        let surface = letterboxed_rect(ui, available, frame_size);

        if let Some(texture) = backdrop {
            ui.painter().image(
                texture.id(),
                surface,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        } else {
            ui.painter()
                .rect_filled(surface, 0.0, egui::Color32::from_gray(25));
        }

        let response = ui.allocate_rect(surface, egui::Sense::click_and_drag());

        let to_norm = |pos: egui::Pos2| {
            geometry::normalize_coordinates(
                (pos.x - surface.min.x) as f64,
                (pos.y - surface.min.y) as f64,
                surface.width() as f64,
                surface.height() as f64,
            )
        };

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                editor.pointer_down(to_norm(pos), active);
            }
        } else if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                editor.pointer_move(to_norm(pos));
            }
        } else if response.drag_stopped() {
            match editor.pointer_up() {
                GestureEnd::Edited => action = CanvasAction::Edited,
                GestureEnd::Discarded => action = CanvasAction::Discarded,
                GestureEnd::None => {}
            }
        } else if let Some(pos) = response.hover_pos() {
            // idle move: only refreshes the cursor hint
            editor.pointer_move(to_norm(pos));
        }

        if response.hovered() {
            ui.ctx().set_cursor_icon(match editor.cursor() {
                CursorHint::Default => egui::CursorIcon::Default,
                CursorHint::Move => egui::CursorIcon::Grabbing,
                CursorHint::Resize => egui::CursorIcon::ResizeNwSe,
            });
        }

        draw_boxes(ui.painter(), editor, &surface);
    });

    action
}

/// Largest rect of the frame's aspect ratio centered in the available
/// space. Falls back to 16:9 when no frame is loaded.
fn letterboxed_rect(
    ui: &egui::Ui,
    available: egui::Vec2,
    frame_size: Option<(u32, u32)>,
) -> egui::Rect {
    let aspect = match frame_size {
        Some((w, h)) if h > 0 => w as f32 / h as f32,
        _ => 16.0 / 9.0,
    };
    let available_aspect = available.x / available.y;

    let (display_width, display_height) = if aspect > available_aspect {
        // Frame is wider - fit to width
        (available.x, available.x / aspect)
    } else {
        // Frame is taller - fit to height
        (available.y * aspect, available.y)
    };

    let x_offset = (available.x - display_width) / 2.0;
    let y_offset = (available.y - display_height) / 2.0;

    egui::Rect::from_min_size(
        ui.min_rect().min + egui::vec2(x_offset, y_offset),
        egui::vec2(display_width, display_height),
    )
}

/// Draw back to front so the front box (index 0) paints last.
fn draw_boxes(painter: &egui::Painter, editor: &BoxEditor, surface: &egui::Rect) {
    let w = surface.width() as f64;
    let h = surface.height() as f64;

    for (idx, dbox) in editor.boxes().iter().enumerate().rev() {
        let col = color::to_color32(&dbox.color);
        let anchor = &dbox.anchor;
        let (px, py) = geometry::denormalize_coordinates(
            &crate::util::geometry::Point::new(anchor.sx, anchor.sy),
            w,
            h,
        );
        let rect = egui::Rect::from_min_size(
            surface.min + egui::vec2(px as f32, py as f32),
            egui::vec2((anchor.w * w) as f32, (anchor.h * h) as f32),
        );

        let stroke_width = if idx == 0 { 3.0 } else { 2.0 };
        painter.rect_stroke(rect, 0.0, egui::Stroke::new(stroke_width, col));

        // resize handle on the bottom-right corner
        painter.rect_filled(
            egui::Rect::from_center_size(rect.max, egui::vec2(8.0, 8.0)),
            0.0,
            col,
        );

        // label tag above the top-left corner
        let galley = painter.layout_no_wrap(
            anchor.label.clone(),
            egui::FontId::proportional(14.0),
            egui::Color32::WHITE,
        );
        let tag = egui::Rect::from_min_size(
            rect.min - egui::vec2(0.0, galley.size().y + 4.0),
            galley.size() + egui::vec2(8.0, 4.0),
        );
        painter.rect_filled(tag, 0.0, col);
        painter.galley(
            tag.min + egui::vec2(4.0, 2.0),
            galley,
            egui::Color32::WHITE,
        );
    }
}
