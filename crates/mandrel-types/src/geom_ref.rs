use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::Role;
use crate::topo::{TopoKind, TopoQuery, TopoSignature};

/// Persistent pointer to geometry. The only way geometry is ever referenced
/// across rebuilds or in a saved project: kernel entity ids live one session
/// and must never leak into anything that outlives one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeomRef {
    /// What kind of entity this points at.
    pub kind: TopoKind,
    /// Whose output to look in.
    pub anchor: Anchor,
    /// How to find the entity inside that output.
    pub selector: Selector,
    /// Whether a fuzzy or failed resolution is an error or a warning.
    pub policy: ResolvePolicy,
}

/// Names the feature output (or datum) containing the target entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Anchor {
    /// A named output of a feature at a strictly earlier tree index.
    Feature { feature_id: Uuid, output: OutputKey },
    /// A construction datum (plane, axis, point).
    Datum { datum_id: Uuid },
}

impl Anchor {
    /// The anchored feature id, if this anchors a feature output.
    pub fn feature_id(&self) -> Option<Uuid> {
        match self {
            Anchor::Feature { feature_id, .. } => Some(*feature_id),
            Anchor::Datum { .. } => None,
        }
    }
}

/// Which of a feature's named outputs to search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputKey {
    /// The primary solid body.
    Primary,
    /// A secondary body (boolean split, multi-body extrude).
    Secondary { index: usize },
    /// An extracted profile.
    Profile { index: usize },
    /// A named datum output.
    Datum { name: String },
}

/// How to find one entity inside an anchored output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
    /// The Nth entity carrying a semantic role. Exact and cheap.
    Role { role: Role, index: usize },
    /// Best weighted-similarity match against a stored fingerprint.
    Signature { signature: TopoSignature },
    /// Explicit filters plus a tie-break rule.
    Query { query: TopoQuery },
}

/// What to do when resolution is ambiguous or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResolvePolicy {
    /// Any failure or ambiguity is a hard error.
    Strict,
    /// Take the closest candidate and attach a warning; fail only when
    /// there is no candidate at all.
    BestEffort,
}
