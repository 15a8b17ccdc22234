// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Durable label-document storage.
//!
//! Three idempotent verbs over the document identified by
//! `(video_path, label_path?)`. Without an explicit label path the
//! document lives in a `.cache` directory next to the video, named
//! `<video filename>.json`. Reads transparently upgrade legacy files
//! on disk; writes merge partial updates and overwrite the whole file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::models::document::{self, LabelDocument, LabelObject};

/// Handle to one video's durable label document.
#[derive(Debug, Clone)]
pub struct LabelGateway {
    video_path: PathBuf,
    label_path: Option<PathBuf>,
}

impl LabelGateway {
    pub fn new(video_path: impl Into<PathBuf>, label_path: Option<PathBuf>) -> Self {
        Self {
            video_path: video_path.into(),
            label_path,
        }
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    /// Durable location of this document: the explicit label file when
    /// given, else the `.cache` sibling of the video.
    pub fn target_path(&self) -> PathBuf {
        if let Some(path) = &self.label_path {
            return path.clone();
        }
        let dir = self.video_path.parent().unwrap_or_else(|| Path::new("."));
        let name = self
            .video_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        dir.join(".cache").join(format!("{name}.json"))
    }

    /// Load the document. A missing file yields an empty v2 document; a
    /// legacy file is migrated and the upgraded form written back; a
    /// malformed file is an error, never a partial document.
    pub fn read(&self) -> Result<LabelDocument> {
        let path = self.target_path();
        if !path.exists() {
            return Ok(LabelDocument::empty());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading label file {}", path.display()))?;
        let raw: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing label file {}", path.display()))?;

        if document::detect_legacy(&raw) {
            log::info!("migrating legacy label file {}", path.display());
            let doc = LabelDocument::from_json(raw)?;
            self.persist(&doc)
                .context("writing back migrated label file")?;
            return Ok(doc);
        }
        LabelDocument::from_json(raw)
            .with_context(|| format!("in label file {}", path.display()))
    }

    /// Merge-write partial updates (see
    /// [`LabelDocument::merge`]) and overwrite the whole file.
    pub fn write(&self, updates: &[LabelObject]) -> Result<()> {
        let mut doc = self.read()?;
        doc.merge(updates);
        self.persist(&doc)
    }

    /// Remove the keyframe nearest to `time` from object `obj_id`,
    /// cascading to object removal when its timeline empties. Absent
    /// targets are a no-op, not an error.
    pub fn delete_keyframe(&self, obj_id: &str, time: f64) -> Result<()> {
        let mut doc = self.read()?;
        if !doc.remove_keyframe(obj_id, time) {
            log::debug!("delete_keyframe: no keyframe of {} near {}", obj_id, time);
        }
        self.persist(&doc)
    }

    fn persist(&self, doc: &LabelDocument) -> Result<()> {
        let path = self.target_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating label directory {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(&path, json).with_context(|| format!("writing label file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{AnchorBox, Timeline};
    use serde_json::json;

    fn update(id: &str, label: &str, frames: &[(&str, AnchorBox)]) -> LabelObject {
        LabelObject {
            id: id.to_string(),
            label: label.to_string(),
            color: String::new(),
            timeline: frames
                .iter()
                .map(|(k, bx)| (k.to_string(), bx.clone()))
                .collect::<Timeline>(),
        }
    }

    #[test]
    fn test_cache_path_derivation() {
        let gw = LabelGateway::new("/videos/clips/walk.mp4", None);
        assert_eq!(
            gw.target_path(),
            PathBuf::from("/videos/clips/.cache/walk.mp4.json")
        );
    }

    #[test]
    fn test_explicit_label_path_wins() {
        let gw = LabelGateway::new(
            "/videos/walk.mp4",
            Some(PathBuf::from("/labels/walk.json")),
        );
        assert_eq!(gw.target_path(), PathBuf::from("/labels/walk.json"));
    }

    #[test]
    fn test_read_missing_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let gw = LabelGateway::new(dir.path().join("walk.mp4"), None);
        let doc = gw.read().unwrap();
        assert!(doc.objects.is_empty());
        assert_eq!(doc.version, 2);
        // reading never creates the file
        assert!(!gw.target_path().exists());
    }

    #[test]
    fn test_write_creates_cache_directory() {
        let dir = tempfile::tempdir().unwrap();
        let gw = LabelGateway::new(dir.path().join("walk.mp4"), None);
        gw.write(&[update(
            "1",
            "dog",
            &[("0.5", AnchorBox::new(0.1, 0.1, 0.2, 0.2, "dog"))],
        )])
        .unwrap();
        assert!(gw.target_path().exists());
        assert_eq!(gw.read().unwrap().objects.len(), 1);
    }

    #[test]
    fn test_write_merges_timelines() {
        let dir = tempfile::tempdir().unwrap();
        let gw = LabelGateway::new(dir.path().join("walk.mp4"), None);
        gw.write(&[update(
            "1",
            "dog",
            &[("0.1", AnchorBox::new(0.0, 0.0, 0.1, 0.1, "dog"))],
        )])
        .unwrap();
        gw.write(&[update(
            "1",
            "dog",
            &[("0.3", AnchorBox::new(0.2, 0.2, 0.1, 0.1, "dog"))],
        )])
        .unwrap();

        let doc = gw.read().unwrap();
        assert_eq!(doc.objects.len(), 1);
        assert!(doc.objects[0].timeline.contains_key("0.1000000"));
        assert!(doc.objects[0].timeline.contains_key("0.3000000"));
        assert!(doc.metadata.next_id.unwrap() >= 1);
    }

    #[test]
    fn test_write_twice_equals_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let gw = LabelGateway::new(dir.path().join("walk.mp4"), None);
        let up = update(
            "1",
            "dog",
            &[("0.3", AnchorBox::new(0.2, 0.2, 0.1, 0.1, "dog"))],
        );
        gw.write(std::slice::from_ref(&up)).unwrap();
        let once = gw.read().unwrap();
        gw.write(std::slice::from_ref(&up)).unwrap();
        let twice = gw.read().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_delete_keyframe_snaps_and_cascades() {
        let dir = tempfile::tempdir().unwrap();
        let gw = LabelGateway::new(dir.path().join("walk.mp4"), None);
        gw.write(&[update(
            "1",
            "dog",
            &[("0.1000000", AnchorBox::new(0.0, 0.0, 0.1, 0.1, "dog"))],
        )])
        .unwrap();

        gw.delete_keyframe("1", 0.1001).unwrap();
        let doc = gw.read().unwrap();
        assert!(doc.object("1").is_none());
    }

    #[test]
    fn test_delete_keyframe_missing_target_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let gw = LabelGateway::new(dir.path().join("walk.mp4"), None);
        gw.delete_keyframe("1", 0.5).unwrap();
        assert!(gw.read().unwrap().objects.is_empty());
    }

    #[test]
    fn test_legacy_file_upgraded_on_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let label_path = dir.path().join("walk.json");
        let legacy = json!({
            "metadata": {},
            "labels": {
                "0.1000000": [{"sx": 0.0, "sy": 0.0, "w": 0.1, "h": 0.1, "label": "cat_开始"}]
            }
        });
        fs::write(&label_path, serde_json::to_string(&legacy).unwrap()).unwrap();

        let gw = LabelGateway::new(dir.path().join("walk.mp4"), Some(label_path.clone()));
        let doc = gw.read().unwrap();
        assert_eq!(doc.objects.len(), 1);
        assert_eq!(doc.objects[0].label, "cat");

        // the file on disk is now v2, with the legacy field retained
        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&label_path).unwrap()).unwrap();
        assert_eq!(on_disk["version"], 2);
        assert!(on_disk["objects"].is_array());
        assert!(on_disk["labels"].is_object());

        // a second read is a plain v2 read
        let again = gw.read().unwrap();
        assert_eq!(again.objects, doc.objects);
    }

    #[test]
    fn test_malformed_file_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let label_path = dir.path().join("walk.json");
        fs::write(&label_path, "{not json").unwrap();
        let gw = LabelGateway::new(dir.path().join("walk.mp4"), Some(label_path));
        assert!(gw.read().is_err());
    }
}
