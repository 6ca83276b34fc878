//! The parametric modeling engine core: feature tree store, incremental
//! rebuild with persistent naming, reference resolution, and linear
//! undo/redo.
//!
//! The geometry capability comes in through the `KernelSession` trait
//! object on every call that can touch geometry; the engine owns no
//! kernel of its own.

pub mod history;
pub mod rebuild;
pub mod resolve;
pub mod snapshot;
pub mod store;
pub mod types;

use uuid::Uuid;

use mandrel_ops::{KernelSession, OpResult};

use crate::history::{first_divergence, HistoryManager};
use crate::rebuild::{FeatureStatus, GenerationCounter, RebuildEngine, RebuildOutcome};
use crate::resolve::ResolverConfig;
use crate::snapshot::{FeatureNode, TreeSnapshot};
use crate::store::StoreError;
use crate::types::{FeatureTree, Operation};

/// The engine facade: tree + rebuild cache + history. Every committed
/// mutation records an undo step and replays the dirty suffix.
pub struct Engine {
    pub tree: FeatureTree,
    rebuild: RebuildEngine,
    history: HistoryManager,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            tree: FeatureTree::new(),
            rebuild: RebuildEngine::with_config(config),
            history: HistoryManager::new(),
        }
    }

    /// Adopt an existing tree (a loaded project) and build it in full.
    pub fn from_tree(tree: FeatureTree, session: &mut dyn KernelSession) -> Self {
        let mut engine = Self::new();
        engine.tree = tree;
        engine.rebuild_from(0, session);
        engine
    }

    /// Append a feature and rebuild from it.
    pub fn add_feature(
        &mut self,
        name: impl Into<String>,
        operation: Operation,
        session: &mut dyn KernelSession,
    ) -> Result<Uuid, StoreError> {
        let before = self.tree.clone();
        let (id, position) = self.tree.append(name.into(), operation)?;
        self.commit(before, position, session);
        Ok(id)
    }

    /// Insert a feature at an index and rebuild from it.
    pub fn insert_feature(
        &mut self,
        index: usize,
        name: impl Into<String>,
        operation: Operation,
        session: &mut dyn KernelSession,
    ) -> Result<Uuid, StoreError> {
        let before = self.tree.clone();
        let id = self.tree.insert(index, name.into(), operation)?;
        self.commit(before, index, session);
        Ok(id)
    }

    /// Replace a feature's operation and rebuild from its index.
    pub fn edit_feature(
        &mut self,
        id: Uuid,
        operation: Operation,
        session: &mut dyn KernelSession,
    ) -> Result<(), StoreError> {
        let before = self.tree.clone();
        let dirty = self.tree.edit_operation(id, operation)?;
        self.commit(before, dirty, session);
        Ok(())
    }

    /// Rename a feature. Recorded in history; no rebuild.
    pub fn rename_feature(&mut self, id: Uuid, name: impl Into<String>) -> Result<(), StoreError> {
        let before = self.tree.clone();
        self.tree.rename(id, name.into())?;
        self.history.record(before, self.tree.clone());
        Ok(())
    }

    /// Delete a feature and rebuild from its old position. Succeeds even
    /// when later features still reference it — those turn Errored on the
    /// rebuild, not lost.
    pub fn delete_feature(
        &mut self,
        id: Uuid,
        session: &mut dyn KernelSession,
    ) -> Result<(), StoreError> {
        let before = self.tree.clone();
        let dirty = self.tree.delete(id)?;
        self.commit(before, dirty, session);
        Ok(())
    }

    /// Move a feature and rebuild from the smaller of the two positions.
    pub fn reorder_feature(
        &mut self,
        id: Uuid,
        new_index: usize,
        session: &mut dyn KernelSession,
    ) -> Result<(), StoreError> {
        let before = self.tree.clone();
        let dirty = self.tree.reorder(id, new_index)?;
        self.commit(before, dirty, session);
        Ok(())
    }

    /// Suppress or unsuppress a feature and rebuild from it.
    pub fn set_suppressed(
        &mut self,
        id: Uuid,
        suppressed: bool,
        session: &mut dyn KernelSession,
    ) -> Result<(), StoreError> {
        let before = self.tree.clone();
        let dirty = self.tree.set_suppressed(id, suppressed)?;
        self.commit(before, dirty, session);
        Ok(())
    }

    /// Move the rollback point and rebuild the affected suffix.
    pub fn set_rollback(
        &mut self,
        index: Option<usize>,
        session: &mut dyn KernelSession,
    ) -> Result<(), StoreError> {
        let before = self.tree.clone();
        let dirty = self.tree.set_rollback(index)?;
        self.commit(before, dirty, session);
        Ok(())
    }

    /// Undo the latest mutation. Returns false with nothing to undo.
    pub fn undo(&mut self, session: &mut dyn KernelSession) -> bool {
        let Some(entry) = self.history.undo_step() else {
            return false;
        };
        let dirty = first_divergence(&entry.after, &entry.before);
        self.tree = entry.before;
        self.rebuild_from(dirty, session);
        true
    }

    /// Redo the latest undone mutation. Returns false with nothing to redo.
    pub fn redo(&mut self, session: &mut dyn KernelSession) -> bool {
        let Some(entry) = self.history.redo_step() else {
            return false;
        };
        let dirty = first_divergence(&entry.before, &entry.after);
        self.tree = entry.after;
        self.rebuild_from(dirty, session);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Cached result of a built feature.
    pub fn result(&self, id: Uuid) -> Option<&OpResult> {
        self.rebuild.result(id)
    }

    pub fn status(&self, id: Uuid) -> Option<&FeatureStatus> {
        self.rebuild.status(id)
    }

    /// The shared generation counter; claiming the next generation on it
    /// supersedes an in-flight rebuild at its next feature boundary.
    pub fn generations(&self) -> GenerationCounter {
        self.rebuild.generations()
    }

    pub fn committed_generation(&self) -> u64 {
        self.rebuild.committed_generation()
    }

    /// Replay from `dirty_from`; the prefix rides the cache.
    pub fn rebuild_from(
        &mut self,
        dirty_from: usize,
        session: &mut dyn KernelSession,
    ) -> RebuildOutcome {
        self.rebuild.rebuild(&self.tree, session, dirty_from)
    }

    /// Read-only tree view for the host, with per-feature outcomes.
    pub fn tree_snapshot(&self) -> TreeSnapshot {
        let features = self
            .tree
            .features
            .iter()
            .map(|f| {
                let status = self
                    .rebuild
                    .status(f.id)
                    .cloned()
                    .unwrap_or(FeatureStatus::Inactive);
                let warnings = self
                    .rebuild
                    .result(f.id)
                    .map(|r| r.diagnostics.warnings.clone())
                    .unwrap_or_default();
                FeatureNode {
                    id: f.id,
                    name: f.name.clone(),
                    kind: f.operation.kind_name(),
                    suppressed: f.suppressed,
                    status,
                    warnings,
                }
            })
            .collect();
        TreeSnapshot {
            features,
            active_index: self.tree.active_index,
            generation: self.rebuild.committed_generation(),
        }
    }

    fn commit(&mut self, before: FeatureTree, dirty: usize, session: &mut dyn KernelSession) {
        self.history.record(before, self.tree.clone());
        self.rebuild_from(dirty, session);
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
