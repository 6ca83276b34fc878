use serde::{Deserialize, Serialize};

/// Semantic tag attached to an entity by the operation that produced it.
/// Roles are the fast path of persistent naming: they survive rebuilds as
/// long as the operation still produces an entity playing the same part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Role {
    /// Extrude end cap on the positive direction side.
    EndCapPos,
    /// Extrude end cap on the sketch-plane side.
    EndCapNeg,
    /// Lateral face swept from the Nth profile segment.
    WallFace { index: usize },
    /// Boundary edge of the positive end cap.
    EndCapPosEdge { index: usize },
    /// Boundary edge of the negative end cap.
    EndCapNegEdge { index: usize },
    /// First face of a partial revolve.
    RevolveStart,
    /// Last face of a partial revolve.
    RevolveEnd,
    /// Blend face created by a fillet.
    FilletFace { index: usize },
    /// Bevel face created by a chamfer.
    ChamferFace { index: usize },
    /// Inner offset face created by a shell.
    ShellFace { index: usize },
    /// The profile face an extrude or revolve started from.
    ProfileFace,
    /// Result face inherited from the blank (first) body of a boolean.
    BlankFace { index: usize },
    /// Result face inherited from the tool (second) body of a boolean.
    ToolFace { index: usize },
}
