// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Playback timeline and keyframe strip.
//!
//! Scrubber for the normalized playback position, play/pause, the
//! active object's keyframe markers, and save/delete keyframe actions.

use crate::models::session::Session;
use crate::models::timekey::{self, TIME_MATCH_THRESHOLD};
use crate::util::color;

/// Result of timeline interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineAction {
    None,
    Seek(f64),
    TogglePlay,
    SaveKeyframe,
    DeleteKeyframe,
}

/// Display the timeline controls.
pub fn show(ui: &mut egui::Ui, session: &Session, playing: bool) -> TimelineAction {
    let mut action = TimelineAction::None;

    ui.horizontal(|ui| {
        let icon = if playing { "⏸" } else { "▶" };
        if ui.button(icon).clicked() {
            action = TimelineAction::TogglePlay;
        }

        let mut t = session.position();
        let slider = ui.add(
            egui::Slider::new(&mut t, 0.0..=1.0)
                .fixed_decimals(4)
                .trailing_fill(true),
        );
        if slider.changed() {
            action = TimelineAction::Seek(t);
        }

        let on_keyframe = session.active_object().and_then(|obj| {
            timekey::nearest_key(&obj.timeline, session.position(), TIME_MATCH_THRESHOLD)
        });

        let has_active = session.active_object().is_some();
        if ui
            .add_enabled(has_active, egui::Button::new("Set key"))
            .on_hover_text("Save the active object's box at this time (S)")
            .clicked()
        {
            action = TimelineAction::SaveKeyframe;
        }
        if ui
            .add_enabled(on_keyframe.is_some(), egui::Button::new("Del key"))
            .on_hover_text("Delete the keyframe at this time (Delete)")
            .clicked()
        {
            action = TimelineAction::DeleteKeyframe;
        }

        if on_keyframe.is_some() {
            let col = session
                .active_object()
                .map(|obj| color::to_color32(&obj.color))
                .unwrap_or(egui::Color32::YELLOW);
            ui.colored_label(col, "● keyframe");
        }
    });

    if let Some(seek) = keyframe_strip(ui, session) {
        action = TimelineAction::Seek(seek);
    }

    action
}

/// Marker strip for the active object's keyframes; clicking a marker
/// jumps to it, clicking elsewhere seeks to the clicked position.
fn keyframe_strip(ui: &mut egui::Ui, session: &Session) -> Option<f64> {
    let obj = session.active_object()?;

    let width = ui.available_width();
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(width, 16.0), egui::Sense::click());
    let painter = ui.painter();
    painter.rect_filled(rect, 2.0, egui::Color32::from_gray(30));

    let col = color::to_color32(&obj.color);
    for key in obj.timeline.keys() {
        let Ok(t) = key.parse::<f64>() else { continue };
        let x = rect.min.x + (t as f32) * rect.width();
        painter.circle_filled(egui::pos2(x, rect.center().y), 4.0, col);
    }

    // playback cursor
    let cursor_x = rect.min.x + (session.position() as f32) * rect.width();
    painter.line_segment(
        [
            egui::pos2(cursor_x, rect.min.y),
            egui::pos2(cursor_x, rect.max.y),
        ],
        egui::Stroke::new(1.0, egui::Color32::WHITE),
    );

    if response.clicked() {
        let pos = response.interact_pointer_pos()?;
        let clicked_t = ((pos.x - rect.min.x) / rect.width()).clamp(0.0, 1.0) as f64;
        // snap onto a marker when the click lands close to one
        let snapped = timekey::nearest_key(&obj.timeline, clicked_t, 0.02)
            .and_then(|key| key.parse::<f64>().ok());
        return Some(snapped.unwrap_or(clicked_t));
    }
    None
}
