use mandrel_kernel::{EntityId, KernelError, SolidHandle, TriMesh};
use mandrel_types::{OutputKey, Role, TopoKind, TopoSignature};

/// Everything one feature execution produced: named output bodies, the
/// provenance record the persistent-naming system runs on, and non-fatal
/// diagnostics. Session-local — invalidated, never mutated, when anything
/// upstream changes.
#[derive(Debug, Clone, PartialEq)]
pub struct OpResult {
    pub outputs: Vec<(OutputKey, BodyOutput)>,
    pub provenance: Provenance,
    pub diagnostics: Diagnostics,
}

impl OpResult {
    /// Result with no outputs and empty provenance (sketch features).
    pub fn empty() -> Self {
        Self {
            outputs: Vec::new(),
            provenance: Provenance::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Find an output body by key.
    pub fn output(&self, key: &OutputKey) -> Option<&BodyOutput> {
        self.outputs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, body)| body)
    }
}

/// One named output body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyOutput {
    /// Kernel handle. Session-local, never persisted.
    pub handle: SolidHandle,
    /// Precomputed tessellation, when the caller asked for one.
    pub mesh: Option<TriMesh>,
}

/// What an operation did to topology: the before/after diff plus the
/// semantic labels its classifier handed out. All vectors are in
/// deterministic order (ascending entity id, or classifier emission order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Provenance {
    pub created: Vec<EntityRecord>,
    pub deleted: Vec<EntityRecord>,
    pub modified: Vec<Rewrite>,
    pub roles: Vec<(EntityId, Role)>,
}

impl Provenance {
    /// Entity ids carrying `role`, in recorded order.
    pub fn entities_with_role(&self, role: &Role) -> Vec<EntityId> {
        self.roles
            .iter()
            .filter(|(_, r)| r == role)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// A topological entity with the fingerprint it had when recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: EntityId,
    pub kind: TopoKind,
    pub signature: TopoSignature,
}

/// An entity that changed identity or shape across one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub before: EntityId,
    pub after: EntityId,
    pub reason: RewriteReason,
}

/// Why a surviving logical entity carries a new id or shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum RewriteReason {
    /// Shrunk in place by an intersecting operation.
    Trimmed,
    /// One entity became several.
    Split,
    /// Several entities became one.
    Merged,
    /// Same id or pairing, shape changed.
    Moved,
}

/// Non-fatal observations from one execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub warnings: Vec<String>,
    /// Kernel time in milliseconds, reported by the caller. Never read
    /// from a clock inside this subsystem.
    pub kernel_time_ms: f64,
    pub tessellation_time_ms: f64,
}

/// Errors from operation executors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("no usable profile for operation")]
    NoProfile,

    #[error("profile index {index} out of range ({count} available)")]
    ProfileOutOfRange { index: usize, count: usize },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },
}
