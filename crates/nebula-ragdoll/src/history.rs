//! Snapshot-based undo/redo for ragdoll documents.
//!
//! Every stored snapshot is an independent deep copy of the document, so
//! edits to the live document never reach into the history.

use nebula_config::Config;

use crate::document::RagdollDocument;
use crate::error::RagdollError;

/// Linear undo/redo stack of document snapshots.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    snapshots: Vec<RagdollDocument>,
    /// Index of the current snapshot. Meaningless while `snapshots` is empty.
    cursor: usize,
    /// Maximum number of snapshots, 0 for no limit.
    max_size: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoHistory {
    /// Default maximum history size.
    pub const DEFAULT_MAX_SIZE: usize = 100;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_SIZE)
    }

    /// History keeping at most `max_size` snapshots (0 keeps everything).
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            max_size,
        }
    }

    /// History sized by `editor.undo_depth`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_capacity(config.editor.undo_depth)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Stores a compacted copy of `document` with its pending edits applied,
    /// dropping every snapshot after the cursor.
    pub fn store(&mut self, document: &RagdollDocument) {
        let mut snapshot = document.clone();
        snapshot.apply();
        snapshot.compact();

        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(snapshot);
        self.cursor = self.snapshots.len() - 1;

        // Trim if over limit
        if self.max_size > 0 && self.snapshots.len() > self.max_size {
            let excess = self.snapshots.len() - self.max_size;
            self.snapshots.drain(..excess);
            self.cursor -= excess;
        }
    }

    /// Steps back one snapshot. At the oldest snapshot the current one is
    /// returned again. `None` if nothing was stored.
    pub fn undo(&mut self) -> Option<&RagdollDocument> {
        if self.snapshots.is_empty() {
            return None;
        }
        self.cursor = self.cursor.saturating_sub(1);
        self.snapshots.get(self.cursor)
    }

    /// Steps forward one snapshot. At the newest snapshot the current one is
    /// returned again.
    pub fn redo(&mut self) -> Option<&RagdollDocument> {
        if self.snapshots.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1).min(self.snapshots.len() - 1);
        self.snapshots.get(self.cursor)
    }

    /// Snapshot at the cursor.
    pub fn current(&self) -> Option<&RagdollDocument> {
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Clear all history.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.cursor = 0;
    }

    /// Copies the properties of `snapshot` into `document`.
    ///
    /// # Errors
    ///
    /// Returns [`RagdollError::StructuralMismatch`] if nodes were added or
    /// removed since the snapshot was taken. `document` is untouched; reload
    /// it with `reset(true)` to recover.
    pub fn revert(
        document: &mut RagdollDocument,
        snapshot: &RagdollDocument,
    ) -> Result<(), RagdollError> {
        document.revert_to(snapshot).inspect_err(|err| {
            tracing::warn!(
                "Cannot revert `{}` to the snapshot: {err}. Reset the ragdoll to undo the changes.",
                document.species()
            );
        })
    }

    /// Undoes into `document`. Returns `false` if the history is empty.
    ///
    /// # Errors
    ///
    /// See [`UndoHistory::revert`].
    pub fn undo_into(&mut self, document: &mut RagdollDocument) -> Result<bool, RagdollError> {
        match self.undo() {
            Some(snapshot) => Self::revert(document, snapshot).map(|()| true),
            None => Ok(false),
        }
    }

    /// Redoes into `document`. Returns `false` if the history is empty.
    ///
    /// # Errors
    ///
    /// See [`UndoHistory::revert`].
    pub fn redo_into(&mut self, document: &mut RagdollDocument) -> Result<bool, RagdollError> {
        match self.redo() {
            Some(snapshot) => Self::revert(document, snapshot).map(|()| true),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LoadOptions;
    use crate::value::ParamValue;

    const TEXT: &str = r#"<Ragdoll limbscale="1">
  <limb id="0" type="Torso"/>
  <limb id="1" type="Head"/>
  <joint limb1="0" limb2="1"/>
</Ragdoll>"#;

    fn document() -> RagdollDocument {
        RagdollDocument::from_markup_str(TEXT, "human", "h.xml", LoadOptions::default()).unwrap()
    }

    fn scale(doc: &RagdollDocument) -> f32 {
        doc.node(doc.limbs()[0]).unwrap().properties().float("scale").unwrap()
    }

    fn set_scale(doc: &mut RagdollDocument, value: f32) {
        let limb = doc.limbs()[0];
        doc.set(limb, "scale", ParamValue::Float(value)).unwrap();
    }

    #[test]
    fn test_snapshots_are_isolated() {
        let mut doc = document();
        let mut history = UndoHistory::new();
        history.store(&doc);
        set_scale(&mut doc, 0.5);
        doc.apply();
        let snapshot = history.current().unwrap();
        assert_eq!(scale(snapshot), 1.0);
        let element = snapshot.node(snapshot.limbs()[0]).unwrap().element();
        assert_eq!(snapshot.markup().attribute(element, "scale"), Some("1"));
    }

    #[test]
    fn test_undo_restores_stored_values() {
        let mut doc = document();
        let mut history = UndoHistory::new();
        history.store(&doc);
        set_scale(&mut doc, 0.5);
        assert!(history.undo_into(&mut doc).unwrap());
        assert_eq!(scale(&doc), 1.0);
    }

    #[test]
    fn test_undo_redo_walk_and_boundaries() {
        let mut doc = document();
        let mut history = UndoHistory::new();
        assert!(history.undo().is_none());

        history.store(&doc);
        set_scale(&mut doc, 0.5);
        history.store(&doc);
        set_scale(&mut doc, 0.25);
        history.store(&doc);
        assert_eq!(history.len(), 3);

        assert_eq!(scale(history.undo().unwrap()), 0.5);
        assert_eq!(scale(history.undo().unwrap()), 1.0);
        assert!(!history.can_undo());
        assert_eq!(scale(history.undo().unwrap()), 1.0);
        assert_eq!(scale(history.redo().unwrap()), 0.5);
        assert!(history.can_redo());

        // Storing mid-stack drops the redo tail.
        set_scale(&mut doc, 2.0);
        history.store(&doc);
        assert_eq!(history.len(), 3);
        assert!(!history.can_redo());
        assert_eq!(scale(history.redo().unwrap()), 2.0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut doc = document();
        let mut history = UndoHistory::with_capacity(2);
        for value in [0.5, 0.75, 1.5] {
            set_scale(&mut doc, value);
            history.store(&doc);
        }
        assert_eq!(history.len(), 2);
        assert_eq!(scale(history.undo().unwrap()), 0.75);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_depth_comes_from_config() {
        let mut config = Config::default();
        assert_eq!(UndoHistory::from_config(&config).max_size(), 100);

        config.editor.undo_depth = 1;
        let mut doc = document();
        let mut history = UndoHistory::from_config(&config);
        history.store(&doc);
        set_scale(&mut doc, 0.5);
        history.store(&doc);
        assert_eq!(history.len(), 1);
        assert_eq!(scale(history.undo().unwrap()), 0.5);
    }

    #[test]
    fn test_snapshots_drop_removed_nodes() {
        let mut doc = document();
        let head = doc.limb_by_id(1).unwrap();
        let sound = doc.add_sound(head).unwrap();
        assert!(doc.remove_node(sound));
        let mut history = UndoHistory::new();
        history.store(&doc);

        let snapshot = history.current().unwrap();
        assert!(snapshot.tree().slot_count() < doc.tree().slot_count());
        assert!(snapshot.markup().slot_count() < doc.markup().slot_count());
        set_scale(&mut doc, 0.25);
        assert!(history.undo_into(&mut doc).unwrap());
        assert_eq!(scale(&doc), 1.0);
    }

    #[test]
    fn test_structural_change_blocks_revert() {
        let mut doc = document();
        let mut history = UndoHistory::new();
        history.store(&doc);
        let head = doc.limb_by_id(1).unwrap();
        doc.add_sound(head).unwrap();
        set_scale(&mut doc, 0.5);

        assert!(history.undo_into(&mut doc).is_err());
        assert_eq!(scale(&doc), 0.5);

        doc.reset(false).unwrap();
        history.clear();
        assert!(history.is_empty());
        assert!(!history.redo_into(&mut doc).unwrap());
    }
}
