// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Label document data structures and legacy-schema migration.
//!
//! One document per video: a set of identified objects, each carrying a
//! timeline of keyframe boxes. Version 1 files stored untagged boxes
//! grouped per time; those are upgraded to the v2 shape on first read.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::timekey;
use crate::util::color;

/// Boxes with a width or height below this are degenerate; the editing
/// layer discards them and they are never persisted.
pub const MIN_BOX_SIZE: f64 = 0.02;

/// Current on-disk schema generation.
pub const DOCUMENT_VERSION: u32 = 2;

/// A bounding box with all spatial fields normalized to [0, 1] relative
/// to the video frame. `(sx, sy)` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorBox {
    pub sx: f64,
    pub sy: f64,
    pub w: f64,
    pub h: f64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl AnchorBox {
    pub fn new(sx: f64, sy: f64, w: f64, h: f64, label: &str) -> Self {
        Self {
            sx,
            sy,
            w,
            h,
            label: label.to_string(),
            color: None,
        }
    }

    /// True if the box is too small to keep.
    pub fn is_degenerate(&self) -> bool {
        self.w < MIN_BOX_SIZE || self.h < MIN_BOX_SIZE
    }
}

/// Keyframes of one object, keyed by canonical time key. Keys are
/// fixed-width, so the lexical ordering of the map is numeric ordering.
pub type Timeline = BTreeMap<String, AnchorBox>;

/// An annotated entity with its keyframe timeline. `id` is unique
/// within a document and assigned from the document's id counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelObject {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub timeline: Timeline,
}

impl LabelObject {
    /// The box of the object's last keyframe, if it has any.
    pub fn last_keyframe(&self) -> Option<&AnchorBox> {
        self.timeline.values().next_back()
    }
}

/// Document metadata. Unknown fields round-trip through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "nextId", default, skip_serializing_if = "Option::is_none")]
    pub next_id: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Legacy (v1) box groups: multiple untagged boxes per time, entity
/// identity carried only in label suffixes.
pub type LegacyLabels = BTreeMap<String, Vec<AnchorBox>>;

/// A v1 document, read-only input to migration.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyDocument {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub labels: LegacyLabels,
}

/// The in-memory annotation document for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDocument {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub objects: Vec<LabelObject>,
    pub version: u32,
    /// Legacy per-time box groups, preserved for old readers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<LegacyLabels>,
}

impl Default for LabelDocument {
    fn default() -> Self {
        Self::empty()
    }
}

/// The sole format-detection rule: a document lacking both the
/// `version` discriminant and the `objects` array is legacy. This must
/// run before any other access to the parsed value.
pub fn detect_legacy(raw: &Value) -> bool {
    match raw.as_object() {
        Some(map) => !map.contains_key("version") && !map.contains_key("objects"),
        None => false,
    }
}

impl LabelDocument {
    /// An empty v2 document, used when no label file exists yet.
    pub fn empty() -> Self {
        Self {
            metadata: Metadata::default(),
            objects: Vec::new(),
            version: DOCUMENT_VERSION,
            labels: None,
        }
    }

    /// Build a document from raw JSON, migrating the legacy schema when
    /// detected. A value that is neither legacy nor v2 is an error,
    /// never a silently coerced document.
    pub fn from_json(raw: Value) -> Result<Self> {
        if !raw.is_object() {
            bail!("label file is not a JSON object");
        }
        if detect_legacy(&raw) {
            let legacy: LegacyDocument = serde_json::from_value(raw)
                .context("label file is neither a v2 nor a legacy document")?;
            return Ok(migrate(legacy));
        }
        let mut doc: LabelDocument =
            serde_json::from_value(raw).context("malformed v2 label file")?;
        doc.normalize();
        Ok(doc)
    }

    /// Re-canonicalize every timeline key and raise the id counter so it
    /// can never collide with an existing object.
    pub fn normalize(&mut self) {
        for obj in &mut self.objects {
            let timeline = std::mem::take(&mut obj.timeline);
            obj.timeline = timeline
                .into_iter()
                .map(|(key, bx)| (timekey::canonical(&key), bx))
                .collect();
        }
        let numeric_max = self
            .objects
            .iter()
            .filter_map(|obj| obj.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        let floor = (self.objects.len() as u64).max(numeric_max);
        self.metadata.next_id = Some(self.metadata.next_id.unwrap_or(0).max(floor));
    }

    /// Increment the id counter and return the fresh id. Called exactly
    /// once per newly created object.
    pub fn next_id(&mut self) -> String {
        let id = self.metadata.next_id.unwrap_or(0).max(self.objects.len() as u64) + 1;
        self.metadata.next_id = Some(id);
        id.to_string()
    }

    pub fn object(&self, id: &str) -> Option<&LabelObject> {
        self.objects.iter().find(|obj| obj.id == id)
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut LabelObject> {
        self.objects.iter_mut().find(|obj| obj.id == id)
    }

    pub fn remove_object(&mut self, id: &str) -> Option<LabelObject> {
        let index = self.objects.iter().position(|obj| obj.id == id)?;
        Some(self.objects.remove(index))
    }

    pub fn rename_object(&mut self, id: &str, label: &str) -> bool {
        match self.object_mut(id) {
            Some(obj) => {
                obj.label = label.to_string();
                for bx in obj.timeline.values_mut() {
                    bx.label = label.to_string();
                }
                true
            }
            None => false,
        }
    }

    /// Merge partial updates. An update matching an existing id
    /// shallow-merges its timeline (new keys overwrite, others stay) and
    /// replaces label and color; an unmatched update is appended.
    pub fn merge(&mut self, updates: &[LabelObject]) {
        for update in updates {
            match self.object_mut(&update.id) {
                Some(existing) => {
                    existing.label = update.label.clone();
                    if !update.color.is_empty() {
                        existing.color = update.color.clone();
                    }
                    for (key, bx) in &update.timeline {
                        existing
                            .timeline
                            .insert(timekey::canonical(key), bx.clone());
                    }
                }
                None => {
                    let mut obj = update.clone();
                    obj.timeline = obj
                        .timeline
                        .into_iter()
                        .map(|(key, bx)| (timekey::canonical(&key), bx))
                        .collect();
                    self.objects.push(obj);
                }
            }
        }
        self.normalize();
    }

    /// Remove the keyframe nearest to `time` (within the snapping
    /// threshold) from the object `id`. An object left with an empty
    /// timeline is removed entirely. Absent targets are a no-op.
    pub fn remove_keyframe(&mut self, id: &str, time: f64) -> bool {
        let Some(obj) = self.object_mut(id) else {
            return false;
        };
        let Some(key) = timekey::nearest_key(&obj.timeline, time, timekey::TIME_MATCH_THRESHOLD)
        else {
            return false;
        };
        obj.timeline.remove(&key);
        if obj.timeline.is_empty() {
            self.remove_object(id);
        }
        true
    }
}

/// Strip the phase suffix legacy files used to tell one entity's start
/// box from its end box.
pub fn strip_phase_suffix(label: &str) -> &str {
    const SUFFIXES: [&str; 4] = ["_start", "_end", "_开始", "_结束"];
    for suffix in SUFFIXES {
        if let Some(base) = label.strip_suffix(suffix) {
            return base;
        }
    }
    label
}

/// Upgrade a legacy document: group boxes by suffix-stripped label,
/// assign each group a fresh id and color, and keep the original
/// `labels` field for backward compatibility. Total and deterministic,
/// so migrating the same input twice yields the same object set.
pub fn migrate(legacy: LegacyDocument) -> LabelDocument {
    let mut order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Timeline> = BTreeMap::new();

    for (time, boxes) in &legacy.labels {
        let key = timekey::canonical(time);
        for bx in boxes {
            let base = strip_phase_suffix(&bx.label).to_string();
            if !groups.contains_key(&base) {
                order.push(base.clone());
            }
            let mut tagged = bx.clone();
            tagged.label = base.clone();
            groups.entry(base).or_default().insert(key.clone(), tagged);
        }
    }

    let mut doc = LabelDocument {
        metadata: legacy.metadata,
        objects: Vec::new(),
        version: DOCUMENT_VERSION,
        labels: Some(legacy.labels),
    };
    for label in order {
        let id = doc.next_id();
        let timeline = groups.remove(&label).unwrap_or_default();
        let color = color::for_id(&id);
        doc.objects.push(LabelObject {
            id,
            label,
            color,
            timeline,
        });
    }
    doc.normalize();
    doc
}
