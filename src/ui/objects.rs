// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Object list panel.
//!
//! Create, select, activate, rename, and delete annotated objects. The
//! panel only reads the session and reports the user's intent back as
//! an action for the app to apply.

use crate::models::session::Session;
use crate::util::color;

/// Result of object panel interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectsAction {
    None,
    Create(String),
    Toggle(String),
    Activate(String),
    Rename(String, String),
    Remove(String),
}

/// Display the object list.
pub fn show(
    ui: &mut egui::Ui,
    session: &Session,
    new_label: &mut String,
    rename_edit: &mut Option<(String, String)>,
) -> ObjectsAction {
    let mut action = ObjectsAction::None;

    ui.heading("Objects");
    ui.separator();

    ui.horizontal(|ui| {
        let field = ui.text_edit_singleline(new_label);
        let submitted =
            field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if (ui.button("Add").clicked() || submitted) && !new_label.trim().is_empty() {
            action = ObjectsAction::Create(new_label.trim().to_string());
            new_label.clear();
        }
    });

    ui.add_space(4.0);

    for obj in &session.doc.objects {
        let is_selected = session.is_selected(&obj.id);
        let is_active = session.active() == Some(obj.id.as_str());

        ui.horizontal(|ui| {
            // color swatch
            let (swatch, _) =
                ui.allocate_exact_size(egui::vec2(10.0, 20.0), egui::Sense::hover());
            let mut col = color::to_color32(&obj.color);
            if !is_selected {
                col = col.gamma_multiply(0.3);
            }
            ui.painter().rect_filled(swatch, 2.0, col);

            let eye = if is_selected { "👁" } else { "—" };
            if ui
                .selectable_label(is_selected, eye)
                .on_hover_text("Show/hide this object")
                .clicked()
            {
                action = ObjectsAction::Toggle(obj.id.clone());
            }

            if ui
                .radio(is_active, "")
                .on_hover_text("Edit this object's keyframes")
                .clicked()
            {
                action = ObjectsAction::Activate(obj.id.clone());
            }

            match rename_edit {
                Some((id, buffer)) if *id == obj.id => {
                    let field = ui.text_edit_singleline(buffer);
                    if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        let value = buffer.trim().to_string();
                        // an emptied name deletes the object
                        action = if value.is_empty() {
                            ObjectsAction::Remove(obj.id.clone())
                        } else {
                            ObjectsAction::Rename(obj.id.clone(), value)
                        };
                        *rename_edit = None;
                    } else if ui.input(|i| i.key_pressed(egui::Key::Escape))
                        || field.lost_focus()
                    {
                        *rename_edit = None;
                    }
                }
                _ => {
                    if ui
                        .selectable_label(false, &obj.label)
                        .on_hover_text("Click to rename")
                        .clicked()
                    {
                        *rename_edit = Some((obj.id.clone(), obj.label.clone()));
                    }
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("✕").on_hover_text("Delete object").clicked() {
                    action = ObjectsAction::Remove(obj.id.clone());
                }
                ui.label(
                    egui::RichText::new(format!("{} keys", obj.timeline.len()))
                        .weak()
                        .small(),
                );
            });
        });
    }

    if session.doc.objects.is_empty() {
        ui.label(
            egui::RichText::new("No objects yet. Type a label above to create one.")
                .weak()
                .italics(),
        );
    }

    action
}
