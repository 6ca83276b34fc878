/// Opaque handle to a solid owned by the geometry kernel.
/// Valid for the current kernel session only. Deliberately not serializable:
/// a handle must never outlive the session that minted it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SolidHandle(pub(crate) u64);

impl SolidHandle {
    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

/// Transient kernel entity identifier. Stable within one kernel session,
/// NOT across rebuilds. Ordered so fuzzy-match tie-breaks are reproducible.
/// Deliberately not serializable — persistent references go through GeomRef.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

/// Errors from kernel operations. Each variant keeps its diagnostic payload
/// so callers can surface the cause without stringifying it away.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("profile is degenerate: {reason}")]
    DegenerateProfile { reason: String },

    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("blend (fillet/chamfer) failed: {reason}")]
    BlendFailed { reason: String },

    #[error("shell failed: {reason}")]
    ShellFailed { reason: String },

    #[error("tessellation failed: {reason}")]
    TessellationFailed { reason: String },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: EntityId },

    #[error("stale or unknown solid handle")]
    StaleHandle,

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },

    #[error("kernel error: {message}")]
    Other { message: String },
}

/// Tessellated triangle mesh. Session-local like the handles it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TriMesh {
    /// Flat vertex positions [x0, y0, z0, x1, ...].
    pub vertices: Vec<f32>,
    /// Flat vertex normals, parallel to `vertices`.
    pub normals: Vec<f32>,
    /// Triangle indices into the vertex array.
    pub indices: Vec<u32>,
    /// Triangle ranges attributed to logical faces, for picking.
    pub face_ranges: Vec<FaceRange>,
}

/// Maps a contiguous index range of a TriMesh to one logical face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRange {
    pub face: EntityId,
    /// Start offset into `indices` (inclusive).
    pub start: u32,
    /// End offset into `indices` (exclusive).
    pub end: u32,
}
