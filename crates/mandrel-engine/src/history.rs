//! HistoryManager — linear undo/redo over committed tree mutations.
//!
//! Each step stores the full tree before and after the mutation; applying
//! a stored tree exactly reconstructs the other side, and the dirty index
//! for the follow-up rebuild is the first position where the two trees
//! disagree. A new mutation after an undo discards the redo stack.

use crate::types::FeatureTree;

/// One committed mutation, both sides.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub before: FeatureTree,
    pub after: FeatureTree,
}

/// Two-stack linear history.
#[derive(Debug, Default)]
pub struct HistoryManager {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed mutation, discarding any redo tail.
    pub fn record(&mut self, before: FeatureTree, after: FeatureTree) {
        self.undo.push(HistoryEntry { before, after });
        self.redo.clear();
    }

    /// Pop the latest step for undoing. The entry moves to the redo stack.
    pub fn undo_step(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo.pop()?;
        self.redo.push(entry.clone());
        Some(entry)
    }

    /// Pop the latest undone step for redoing. Moves back to undo.
    pub fn redo_step(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo.pop()?;
        self.undo.push(entry.clone());
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

/// First tree position whose rebuild input differs between two trees,
/// counting the active-bound change as a difference at the smaller bound.
pub fn first_divergence(a: &FeatureTree, b: &FeatureTree) -> usize {
    let shared = a.features.len().min(b.features.len());
    let mut dirty = shared;
    for i in 0..shared {
        let fa = &a.features[i];
        let fb = &b.features[i];
        if fa.id != fb.id || fa.operation != fb.operation || fa.suppressed != fb.suppressed {
            dirty = i;
            break;
        }
    }
    if a.features.len() != b.features.len() {
        dirty = dirty.min(shared);
    }
    if a.active_bound() != b.active_bound() {
        dirty = dirty.min(a.active_bound().min(b.active_bound()));
    }
    dirty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Feature, FeatureTree, Operation};
    use mandrel_types::{ProfileLoop, SketchPlane, SolvedProfileSet};
    use uuid::Uuid;

    fn sketch_feature() -> Feature {
        Feature {
            id: Uuid::new_v4(),
            name: "Sketch".to_string(),
            operation: Operation::Sketch {
                profiles: SolvedProfileSet {
                    plane: SketchPlane {
                        origin: [0.0, 0.0, 0.0],
                        normal: [0.0, 0.0, 1.0],
                        x_axis: [1.0, 0.0, 0.0],
                    },
                    loops: vec![ProfileLoop {
                        points: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
                        is_outer: true,
                    }],
                },
            },
            suppressed: false,
        }
    }

    #[test]
    fn divergence_of_identical_trees_is_past_the_end() {
        let mut tree = FeatureTree::new();
        tree.features.push(sketch_feature());
        assert_eq!(first_divergence(&tree, &tree.clone()), 1);
    }

    #[test]
    fn divergence_spots_a_suppression_flip() {
        let mut a = FeatureTree::new();
        a.features.push(sketch_feature());
        a.features.push(sketch_feature());
        let mut b = a.clone();
        b.features[1].suppressed = true;
        assert_eq!(first_divergence(&a, &b), 1);
    }

    #[test]
    fn divergence_spots_a_shorter_tree() {
        let mut a = FeatureTree::new();
        a.features.push(sketch_feature());
        a.features.push(sketch_feature());
        let mut b = a.clone();
        b.features.pop();
        assert_eq!(first_divergence(&a, &b), 1);
    }

    #[test]
    fn divergence_tracks_rollback_bound() {
        let mut a = FeatureTree::new();
        a.features.push(sketch_feature());
        a.features.push(sketch_feature());
        let mut b = a.clone();
        b.active_index = Some(0);
        assert_eq!(first_divergence(&a, &b), 1);
    }

    #[test]
    fn new_mutation_discards_redo() {
        let mut history = HistoryManager::new();
        let empty = FeatureTree::new();
        let mut one = FeatureTree::new();
        one.features.push(sketch_feature());

        history.record(empty.clone(), one.clone());
        assert!(history.undo_step().is_some());
        assert!(history.can_redo());

        history.record(empty, one);
        assert!(!history.can_redo());
    }
}
