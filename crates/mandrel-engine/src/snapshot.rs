//! Read-only view of the tree handed to the host after every rebuild.

use uuid::Uuid;

use crate::rebuild::FeatureStatus;

/// Snapshot of the feature tree with per-feature build outcomes. This is
/// the only surface the host UI reads; it carries no kernel handles or
/// entity ids.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    pub features: Vec<FeatureNode>,
    pub active_index: Option<usize>,
    /// Generation of the rebuild that produced this snapshot.
    pub generation: u64,
}

impl TreeSnapshot {
    pub fn errored(&self) -> impl Iterator<Item = &FeatureNode> {
        self.features.iter().filter(|f| f.status.is_errored())
    }

    pub fn blocked(&self) -> impl Iterator<Item = &FeatureNode> {
        self.features.iter().filter(|f| f.status.is_blocked())
    }
}

/// One feature's row in the snapshot.
#[derive(Debug, Clone)]
pub struct FeatureNode {
    pub id: Uuid,
    pub name: String,
    pub kind: &'static str,
    pub suppressed: bool,
    pub status: FeatureStatus,
    /// Non-fatal diagnostics from this feature's build.
    pub warnings: Vec<String>,
}
