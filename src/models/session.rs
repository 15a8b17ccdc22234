// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session-local editing state.
//!
//! The document plus everything that is never persisted: the ordered
//! set of selected object ids, at most one active object (always a
//! member of the selection), and the playback position.

use crate::models::document::{LabelDocument, LabelObject};

#[derive(Debug, Default)]
pub struct Session {
    pub doc: LabelDocument,
    selected: Vec<String>,
    active: Option<String>,
    position: f64,
}

impl Session {
    pub fn new(doc: LabelDocument) -> Self {
        Self {
            doc,
            selected: Vec::new(),
            active: None,
            position: 0.0,
        }
    }

    /// Swap in a freshly loaded document, dropping stale session state.
    pub fn reset(&mut self, doc: LabelDocument) {
        self.doc = doc;
        self.selected.clear();
        self.active = None;
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_object(&self) -> Option<&LabelObject> {
        self.active.as_deref().and_then(|id| self.doc.object(id))
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn set_position(&mut self, t: f64) {
        self.position = t.clamp(0.0, 1.0);
    }

    /// Toggle an object's visibility. Deselecting the active object
    /// clears activation; the first selection becomes active.
    pub fn toggle_selection(&mut self, id: &str) {
        if self.doc.object(id).is_none() {
            return;
        }
        if let Some(index) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(index);
            if self.active.as_deref() == Some(id) {
                self.active = None;
            }
        } else {
            self.selected.push(id.to_string());
            if self.active.is_none() {
                self.active = Some(id.to_string());
            }
        }
    }

    /// Make an object active, selecting it if necessary.
    pub fn activate(&mut self, id: &str) {
        if self.doc.object(id).is_none() {
            return;
        }
        if !self.is_selected(id) {
            self.selected.push(id.to_string());
        }
        self.active = Some(id.to_string());
    }

    /// Drop selection entries whose objects no longer exist (after a
    /// cascade delete or rollback).
    pub fn prune(&mut self) {
        self.selected.retain(|id| self.doc.object(id).is_some());
        if let Some(id) = &self.active {
            if !self.is_selected(id) {
                self.active = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::LabelObject;

    fn session_with_ids(ids: &[&str]) -> Session {
        let mut doc = LabelDocument::empty();
        for id in ids {
            doc.objects.push(LabelObject {
                id: id.to_string(),
                label: format!("obj{}", id),
                color: String::new(),
                timeline: Default::default(),
            });
        }
        doc.normalize();
        Session::new(doc)
    }

    #[test]
    fn test_first_selection_becomes_active() {
        let mut s = session_with_ids(&["1", "2"]);
        s.toggle_selection("1");
        assert_eq!(s.active(), Some("1"));
        s.toggle_selection("2");
        assert_eq!(s.active(), Some("1"));
        assert!(s.is_selected("2"));
    }

    #[test]
    fn test_deselecting_active_clears_it() {
        let mut s = session_with_ids(&["1", "2"]);
        s.toggle_selection("1");
        s.toggle_selection("2");
        s.toggle_selection("1");
        assert!(!s.is_selected("1"));
        assert_eq!(s.active(), None);
        assert!(s.is_selected("2"));
    }

    #[test]
    fn test_activate_implies_selected() {
        let mut s = session_with_ids(&["1"]);
        s.activate("1");
        assert!(s.is_selected("1"));
        assert_eq!(s.active(), Some("1"));
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut s = session_with_ids(&["1"]);
        s.toggle_selection("99");
        s.activate("99");
        assert!(s.selected().is_empty());
        assert_eq!(s.active(), None);
    }

    #[test]
    fn test_prune_drops_stale_ids() {
        let mut s = session_with_ids(&["1", "2"]);
        s.toggle_selection("1");
        s.toggle_selection("2");
        s.doc.remove_object("1");
        s.prune();
        assert!(!s.is_selected("1"));
        assert_eq!(s.active(), None);
        assert!(s.is_selected("2"));
    }

    #[test]
    fn test_position_is_clamped() {
        let mut s = session_with_ids(&[]);
        s.set_position(1.5);
        assert_eq!(s.position(), 1.0);
        s.set_position(-0.1);
        assert_eq!(s.position(), 0.0);
    }
}
