// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Keyframe interpolation.
//!
//! Turns the sparse keyframes of the selected objects into the boxes
//! rendered at a playback position: linear interpolation between the
//! bracketing keyframes, or an exact keyframe when the position is
//! parked on one. The drawing surface edits exactly this computed view
//! and never reads raw keyframes directly.

use crate::models::document::{AnchorBox, LabelDocument, LabelObject};
use crate::models::timekey::{self, TIME_MATCH_THRESHOLD};

/// A box as shown on the drawing surface, tagged with its owning
/// object.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayBox {
    pub obj_id: String,
    pub color: String,
    pub anchor: AnchorBox,
}

/// Boxes visible at position `t`, one per selected object that is
/// visible there, in selection order.
pub fn boxes_at(doc: &LabelDocument, selected_ids: &[String], t: f64) -> Vec<DisplayBox> {
    selected_ids
        .iter()
        .filter_map(|id| doc.object(id).and_then(|obj| box_at(obj, t)))
        .collect()
}

/// The rendered box of one object at position `t`, if any.
pub fn box_at(obj: &LabelObject, t: f64) -> Option<DisplayBox> {
    let mut frames: Vec<(f64, &String)> = obj
        .timeline
        .keys()
        .filter_map(|key| key.parse::<f64>().ok().map(|time| (time, key)))
        .collect();
    frames.sort_by(|a, b| a.0.total_cmp(&b.0));

    // A bracketing pair wins over an exact keyframe hit, so the
    // rendered box stays continuous when t sits exactly on a knot.
    for pair in frames.windows(2) {
        let (t1, k1) = pair[0];
        let (t2, k2) = pair[1];
        if t >= t1 && t <= t2 {
            let ratio = if t2 > t1 { (t - t1) / (t2 - t1) } else { 0.0 };
            let anchor = lerp(&obj.timeline[k1], &obj.timeline[k2], ratio, &obj.label);
            return Some(display(obj, anchor));
        }
    }

    let key = timekey::nearest_key(&obj.timeline, t, TIME_MATCH_THRESHOLD)?;
    let anchor = obj.timeline.get(&key)?.clone();
    Some(display(obj, anchor))
}

fn display(obj: &LabelObject, anchor: AnchorBox) -> DisplayBox {
    DisplayBox {
        obj_id: obj.id.clone(),
        color: obj.color.clone(),
        anchor,
    }
}

fn lerp(b1: &AnchorBox, b2: &AnchorBox, ratio: f64, label: &str) -> AnchorBox {
    let mix = |v1: f64, v2: f64| v1 + (v2 - v1) * ratio;
    AnchorBox {
        sx: mix(b1.sx, b2.sx),
        sy: mix(b1.sy, b2.sy),
        w: mix(b1.w, b2.w),
        h: mix(b1.h, b2.h),
        label: label.to_string(),
        color: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::timekey::to_key;

    fn object(id: &str, frames: &[(f64, AnchorBox)]) -> LabelObject {
        LabelObject {
            id: id.to_string(),
            label: "cat".to_string(),
            color: "hsl(138, 70%, 50%)".to_string(),
            timeline: frames
                .iter()
                .map(|(t, bx)| (to_key(*t), bx.clone()))
                .collect(),
        }
    }

    fn doc_with(objects: Vec<LabelObject>) -> LabelDocument {
        let mut doc = LabelDocument::empty();
        doc.objects = objects;
        doc.normalize();
        doc
    }

    #[test]
    fn test_halfway_query_is_the_midpoint() {
        let box_a = AnchorBox::new(0.0, 0.0, 0.2, 0.2, "cat");
        let box_b = AnchorBox::new(0.4, 0.6, 0.4, 0.1, "cat");
        let obj = object("1", &[(0.2, box_a), (0.8, box_b)]);

        let shown = box_at(&obj, 0.5).unwrap();
        assert!((shown.anchor.sx - 0.2).abs() < 1e-12);
        assert!((shown.anchor.sy - 0.3).abs() < 1e-12);
        assert!((shown.anchor.w - 0.3).abs() < 1e-12);
        assert!((shown.anchor.h - 0.15).abs() < 1e-12);
        assert_eq!(shown.color, obj.color);
        assert_eq!(shown.obj_id, "1");
    }

    #[test]
    fn test_endpoints_reproduce_keyframes_exactly() {
        let box_a = AnchorBox::new(0.1, 0.2, 0.3, 0.4, "cat");
        let box_b = AnchorBox::new(0.5, 0.6, 0.1, 0.2, "cat");
        let obj = object("1", &[(0.2, box_a.clone()), (0.8, box_b.clone())]);

        let at_start = box_at(&obj, 0.2).unwrap().anchor;
        assert_eq!(
            (at_start.sx, at_start.sy, at_start.w, at_start.h),
            (box_a.sx, box_a.sy, box_a.w, box_a.h)
        );

        let at_end = box_at(&obj, 0.8).unwrap().anchor;
        assert_eq!(
            (at_end.sx, at_end.sy, at_end.w, at_end.h),
            (box_b.sx, box_b.sy, box_b.w, box_b.h)
        );
    }

    #[test]
    fn test_weighted_average_property() {
        let box_a = AnchorBox::new(0.0, 0.0, 0.2, 0.2, "cat");
        let box_b = AnchorBox::new(1.0, 0.5, 0.4, 0.6, "cat");
        let (t1, t2) = (0.25, 0.75);
        let obj = object("1", &[(t1, box_a.clone()), (t2, box_b.clone())]);

        for t in [0.25, 0.3, 0.41, 0.6, 0.75] {
            let ratio = (t - t1) / (t2 - t1);
            let shown = box_at(&obj, t).unwrap().anchor;
            assert!((shown.sx - (box_a.sx + (box_b.sx - box_a.sx) * ratio)).abs() < 1e-12);
            assert!((shown.h - (box_a.h + (box_b.h - box_a.h) * ratio)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_keyframe_never_interpolates() {
        let obj = object("1", &[(0.5, AnchorBox::new(0.1, 0.1, 0.2, 0.2, "cat"))]);
        // visible only at/near its one time
        assert!(box_at(&obj, 0.5).is_some());
        assert!(box_at(&obj, 0.503).is_some());
        assert!(box_at(&obj, 0.6).is_none());
        assert!(box_at(&obj, 0.4).is_none());
    }

    #[test]
    fn test_outside_all_brackets_and_threshold_is_invisible() {
        let obj = object(
            "1",
            &[
                (0.2, AnchorBox::new(0.1, 0.1, 0.2, 0.2, "cat")),
                (0.4, AnchorBox::new(0.2, 0.2, 0.2, 0.2, "cat")),
            ],
        );
        assert!(box_at(&obj, 0.1).is_none());
        assert!(box_at(&obj, 0.9).is_none());
    }

    #[test]
    fn test_bracket_takes_priority_over_exact_match() {
        // two knots at the same geometry; t exactly on the first knot
        // must go through the bracket path and stay continuous
        let box_a = AnchorBox::new(0.1, 0.1, 0.2, 0.2, "cat");
        let box_b = AnchorBox::new(0.3, 0.1, 0.2, 0.2, "cat");
        let obj = object("1", &[(0.4, box_a.clone()), (0.6, box_b)]);

        let shown = box_at(&obj, 0.4).unwrap().anchor;
        assert_eq!(shown.sx, box_a.sx);
        let just_after = box_at(&obj, 0.400001).unwrap().anchor;
        assert!((just_after.sx - shown.sx).abs() < 1e-3);
    }

    #[test]
    fn test_output_order_follows_selection() {
        let obj1 = object("1", &[(0.5, AnchorBox::new(0.1, 0.1, 0.2, 0.2, "cat"))]);
        let obj2 = object("2", &[(0.5, AnchorBox::new(0.3, 0.3, 0.2, 0.2, "cat"))]);
        let doc = doc_with(vec![obj1, obj2]);

        let shown = boxes_at(&doc, &["2".to_string(), "1".to_string()], 0.5);
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].obj_id, "2");
        assert_eq!(shown[1].obj_id, "1");
    }

    #[test]
    fn test_unknown_and_empty_selection_render_nothing() {
        let doc = doc_with(vec![object(
            "1",
            &[(0.5, AnchorBox::new(0.1, 0.1, 0.2, 0.2, "cat"))],
        )]);
        assert!(boxes_at(&doc, &[], 0.5).is_empty());
        assert!(boxes_at(&doc, &["99".to_string()], 0.5).is_empty());
    }

    #[test]
    fn test_empty_timeline_renders_nothing() {
        let obj = object("1", &[]);
        assert!(box_at(&obj, 0.5).is_none());
    }
}
