// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer-driven box editing.
//!
//! An explicit finite-state machine over normalized surface
//! coordinates. The drawing surface feeds it pointer-down/move/up
//! events and renders whatever it holds; it never touches storage.
//! Feeding synthetic points exercises every transition without a
//! canvas.

use crate::models::document::{AnchorBox, LabelObject, MIN_BOX_SIZE};
use crate::models::interp::DisplayBox;
use crate::util::geometry::Point;

/// Horizontal and vertical reach of the resize-corner hit zone around
/// a box's bottom-right corner.
pub const CORNER_REACH_X: f64 = 0.02;
pub const CORNER_REACH_Y: f64 = 0.01;

/// Side length of a freshly created box before the user sizes it.
const SEED_SIZE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditState {
    Idle,
    Dragging { index: usize, offset: Point },
    Resizing { index: usize, anchor: Point },
}

/// Hover hint for the surface cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Move,
    Resize,
}

/// Outcome of a completed pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEnd {
    /// No gesture was in progress.
    None,
    /// The edited box survived and may differ from the persisted view.
    Edited,
    /// The box fell below the minimum size and was dropped.
    Discarded,
}

/// Editing state over the boxes currently rendered at one playback
/// position. Index 0 is the front of the render list.
#[derive(Debug)]
pub struct BoxEditor {
    boxes: Vec<DisplayBox>,
    state: EditState,
    cursor: CursorHint,
    /// Box owning the current or most recent gesture.
    target: Option<usize>,
}

impl Default for BoxEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxEditor {
    pub fn new() -> Self {
        Self {
            boxes: Vec::new(),
            state: EditState::Idle,
            cursor: CursorHint::Default,
            target: None,
        }
    }

    /// Replace the rendered view (playback position or selection
    /// changed). Abandons any gesture in progress.
    pub fn set_boxes(&mut self, boxes: Vec<DisplayBox>) {
        self.boxes = boxes;
        self.state = EditState::Idle;
        self.cursor = CursorHint::Default;
        self.target = None;
    }

    pub fn boxes(&self) -> &[DisplayBox] {
        &self.boxes
    }

    pub fn cursor(&self) -> CursorHint {
        self.cursor
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// The box owning the current or most recent gesture.
    pub fn target_box(&self) -> Option<&DisplayBox> {
        self.target.and_then(|i| self.boxes.get(i))
    }

    /// The rendered box of one object, if it is on the surface.
    pub fn box_for(&self, obj_id: &str) -> Option<&DisplayBox> {
        self.boxes.iter().find(|b| b.obj_id == obj_id)
    }

    /// Hit-test priority: resize corner of any box, then box interior
    /// (promoting the hit box to the front), then empty space, which
    /// starts a new box for the active object unless it already has one
    /// at this position.
    pub fn pointer_down(&mut self, p: Point, active: Option<&LabelObject>) {
        if let Some(index) = hit_corner(p, &self.boxes) {
            let anchor = Point::new(self.boxes[index].anchor.sx, self.boxes[index].anchor.sy);
            self.state = EditState::Resizing { index, anchor };
            self.target = Some(index);
            return;
        }

        if let Some(index) = hit_body(p, &self.boxes) {
            let hit = self.boxes.remove(index);
            let offset = Point::new(p.x - hit.anchor.sx, p.y - hit.anchor.sy);
            self.boxes.insert(0, hit);
            self.state = EditState::Dragging { index: 0, offset };
            self.target = Some(0);
            return;
        }

        let Some(obj) = active else {
            return;
        };
        if self.box_for(&obj.id).is_some() {
            return;
        }

        // Seed the size from the object's last keyframe so a plain
        // click stamps a same-sized box at the new time.
        let (w, h) = match obj.last_keyframe() {
            Some(last) => (last.w, last.h),
            None => (SEED_SIZE, SEED_SIZE),
        };
        let anchor = AnchorBox {
            sx: p.x,
            sy: p.y,
            w,
            h,
            label: obj.label.clone(),
            color: None,
        };
        self.boxes.insert(
            0,
            DisplayBox {
                obj_id: obj.id.clone(),
                color: obj.color.clone(),
                anchor,
            },
        );
        self.state = EditState::Resizing { index: 0, anchor: p };
        self.target = Some(0);
    }

    pub fn pointer_move(&mut self, p: Point) {
        self.cursor = if hit_corner(p, &self.boxes).is_some() {
            CursorHint::Resize
        } else {
            CursorHint::Default
        };

        match self.state {
            EditState::Idle => {}
            EditState::Dragging { index, offset } => {
                if let Some(target) = self.boxes.get_mut(index) {
                    target.anchor.sx = p.x - offset.x;
                    target.anchor.sy = p.y - offset.y;
                }
                self.cursor = CursorHint::Move;
            }
            EditState::Resizing { index, anchor } => {
                if let Some(target) = self.boxes.get_mut(index) {
                    // The box flips around the anchor when the pointer
                    // crosses it; w and h never go negative and
                    // (sx, sy) stays the top-left corner.
                    target.anchor.sx = p.x.min(anchor.x);
                    target.anchor.w = (p.x - anchor.x).abs();
                    target.anchor.sy = p.y.min(anchor.y);
                    target.anchor.h = (p.y - anchor.y).abs();
                }
                self.cursor = CursorHint::Resize;
            }
        }
    }

    /// Ends the gesture. A box left below the minimum size is dropped
    /// entirely; this is the sole automatic-delete rule.
    pub fn pointer_up(&mut self) -> GestureEnd {
        let index = match self.state {
            EditState::Idle => return GestureEnd::None,
            EditState::Dragging { index, .. } | EditState::Resizing { index, .. } => index,
        };
        self.state = EditState::Idle;
        self.cursor = CursorHint::Default;

        if self
            .boxes
            .get(index)
            .is_some_and(|b| b.anchor.is_degenerate())
        {
            self.boxes.remove(index);
            self.target = None;
            return GestureEnd::Discarded;
        }
        GestureEnd::Edited
    }

    /// Cancel key: remove the targeted box without persisting it.
    pub fn cancel(&mut self) -> bool {
        let Some(index) = self.target.take() else {
            return false;
        };
        if index < self.boxes.len() {
            self.boxes.remove(index);
        }
        self.state = EditState::Idle;
        self.cursor = CursorHint::Default;
        true
    }
}

/// Index of the frontmost box whose interior contains `p`.
pub fn hit_body(p: Point, boxes: &[DisplayBox]) -> Option<usize> {
    boxes.iter().position(|b| {
        let a = &b.anchor;
        p.x >= a.sx && p.x <= a.sx + a.w && p.y >= a.sy && p.y <= a.sy + a.h
    })
}

/// Index of the frontmost box whose bottom-right corner zone contains
/// `p`.
pub fn hit_corner(p: Point, boxes: &[DisplayBox]) -> Option<usize> {
    boxes.iter().position(|b| {
        let cx = b.anchor.sx + b.anchor.w;
        let cy = b.anchor.sy + b.anchor.h;
        (p.x - cx).abs() <= CORNER_REACH_X && (p.y - cy).abs() <= CORNER_REACH_Y
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::Timeline;
    use crate::models::timekey::to_key;

    fn display(obj_id: &str, sx: f64, sy: f64, w: f64, h: f64) -> DisplayBox {
        DisplayBox {
            obj_id: obj_id.to_string(),
            color: "hsl(138, 70%, 50%)".to_string(),
            anchor: AnchorBox::new(sx, sy, w, h, "cat"),
        }
    }

    fn active_object(id: &str, frames: &[(f64, AnchorBox)]) -> LabelObject {
        LabelObject {
            id: id.to_string(),
            label: "cat".to_string(),
            color: "hsl(275, 70%, 50%)".to_string(),
            timeline: frames
                .iter()
                .map(|(t, bx)| (to_key(*t), bx.clone()))
                .collect::<Timeline>(),
        }
    }

    #[test]
    fn test_create_resize_release() {
        let mut editor = BoxEditor::new();
        let obj = active_object("1", &[]);

        editor.pointer_down(Point::new(0.3, 0.3), Some(&obj));
        editor.pointer_move(Point::new(0.5, 0.6));
        assert_eq!(editor.pointer_up(), GestureEnd::Edited);

        let boxes = editor.boxes();
        assert_eq!(boxes.len(), 1);
        let a = &boxes[0].anchor;
        assert!((a.sx - 0.3).abs() < 1e-12);
        assert!((a.sy - 0.3).abs() < 1e-12);
        assert!((a.w - 0.2).abs() < 1e-12);
        assert!((a.h - 0.3).abs() < 1e-12);
        assert_eq!(boxes[0].obj_id, "1");
        assert_eq!(boxes[0].color, obj.color);
    }

    #[test]
    fn test_resize_flips_across_the_anchor() {
        let mut editor = BoxEditor::new();
        let obj = active_object("1", &[]);

        editor.pointer_down(Point::new(0.5, 0.5), Some(&obj));
        editor.pointer_move(Point::new(0.2, 0.1));
        editor.pointer_up();

        let a = &editor.boxes()[0].anchor;
        assert!((a.sx - 0.2).abs() < 1e-12);
        assert!((a.sy - 0.1).abs() < 1e-12);
        assert!((a.w - 0.3).abs() < 1e-12);
        assert!((a.h - 0.4).abs() < 1e-12);
        assert!(a.w >= 0.0 && a.h >= 0.0);
    }

    #[test]
    fn test_degenerate_gesture_leaves_no_box() {
        let mut editor = BoxEditor::new();
        let obj = active_object("1", &[]);

        editor.pointer_down(Point::new(0.3, 0.3), Some(&obj));
        editor.pointer_move(Point::new(0.305, 0.305));
        assert_eq!(editor.pointer_up(), GestureEnd::Discarded);
        assert!(editor.boxes().is_empty());
    }

    #[test]
    fn test_click_stamps_last_keyframe_size() {
        let mut editor = BoxEditor::new();
        let obj = active_object("1", &[(0.2, AnchorBox::new(0.1, 0.1, 0.3, 0.25, "cat"))]);

        editor.pointer_down(Point::new(0.4, 0.4), Some(&obj));
        assert_eq!(editor.pointer_up(), GestureEnd::Edited);

        let a = &editor.boxes()[0].anchor;
        assert_eq!((a.sx, a.sy), (0.4, 0.4));
        assert_eq!((a.w, a.h), (0.3, 0.25));
    }

    #[test]
    fn test_no_create_when_active_already_rendered() {
        let mut editor = BoxEditor::new();
        editor.set_boxes(vec![display("1", 0.1, 0.1, 0.2, 0.2)]);
        let obj = active_object("1", &[]);

        // click in empty space: object 1 already has a box here
        editor.pointer_down(Point::new(0.8, 0.8), Some(&obj));
        assert_eq!(editor.state(), EditState::Idle);
        assert_eq!(editor.boxes().len(), 1);
    }

    #[test]
    fn test_no_create_without_active_object() {
        let mut editor = BoxEditor::new();
        editor.pointer_down(Point::new(0.5, 0.5), None);
        assert_eq!(editor.state(), EditState::Idle);
        assert!(editor.boxes().is_empty());
    }

    #[test]
    fn test_drag_keeps_pointer_offset() {
        let mut editor = BoxEditor::new();
        editor.set_boxes(vec![display("1", 0.2, 0.2, 0.2, 0.2)]);

        editor.pointer_down(Point::new(0.25, 0.3), None);
        assert!(matches!(editor.state(), EditState::Dragging { .. }));
        editor.pointer_move(Point::new(0.5, 0.5));
        editor.pointer_up();

        let a = &editor.boxes()[0].anchor;
        assert!((a.sx - 0.45).abs() < 1e-12);
        assert!((a.sy - 0.4).abs() < 1e-12);
        // size untouched by a drag
        assert_eq!((a.w, a.h), (0.2, 0.2));
    }

    #[test]
    fn test_corner_hit_beats_body_hit() {
        let mut editor = BoxEditor::new();
        editor.set_boxes(vec![display("1", 0.2, 0.2, 0.3, 0.3)]);

        // inside the box but within the corner zone of (0.5, 0.5)
        editor.pointer_down(Point::new(0.49, 0.495), None);
        assert!(matches!(editor.state(), EditState::Resizing { .. }));
    }

    #[test]
    fn test_body_hit_promotes_to_front() {
        let mut editor = BoxEditor::new();
        editor.set_boxes(vec![
            display("1", 0.0, 0.0, 0.2, 0.2),
            display("2", 0.6, 0.6, 0.2, 0.2),
        ]);

        editor.pointer_down(Point::new(0.7, 0.7), None);
        assert_eq!(editor.boxes()[0].obj_id, "2");
        assert_eq!(editor.boxes()[1].obj_id, "1");
    }

    #[test]
    fn test_resize_existing_box_anchors_at_origin() {
        let mut editor = BoxEditor::new();
        editor.set_boxes(vec![display("1", 0.2, 0.2, 0.3, 0.3)]);

        editor.pointer_down(Point::new(0.5, 0.5), None);
        editor.pointer_move(Point::new(0.6, 0.7));
        editor.pointer_up();

        let a = &editor.boxes()[0].anchor;
        assert_eq!((a.sx, a.sy), (0.2, 0.2));
        assert!((a.w - 0.4).abs() < 1e-12);
        assert!((a.h - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_cancel_removes_target() {
        let mut editor = BoxEditor::new();
        editor.set_boxes(vec![display("1", 0.2, 0.2, 0.3, 0.3)]);

        editor.pointer_down(Point::new(0.3, 0.3), None);
        editor.pointer_up();
        assert!(editor.cancel());
        assert!(editor.boxes().is_empty());
        assert!(!editor.cancel());
    }

    #[test]
    fn test_cursor_hint_near_corner() {
        let mut editor = BoxEditor::new();
        editor.set_boxes(vec![display("1", 0.2, 0.2, 0.3, 0.3)]);

        editor.pointer_move(Point::new(0.5, 0.5));
        assert_eq!(editor.cursor(), CursorHint::Resize);
        editor.pointer_move(Point::new(0.3, 0.3));
        assert_eq!(editor.cursor(), CursorHint::Default);
    }

    #[test]
    fn test_pointer_up_without_gesture() {
        let mut editor = BoxEditor::new();
        assert_eq!(editor.pointer_up(), GestureEnd::None);
    }
}
