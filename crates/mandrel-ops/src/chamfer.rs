use mandrel_kernel::{EntityId, SolidHandle};
use mandrel_types::{OutputKey, Role};

use crate::diff::diff_snapshots;
use crate::fillet::blend_roles;
use crate::result::{BodyOutput, Diagnostics, OpError, OpResult, Provenance};
use crate::session::KernelSession;
use crate::snapshot::capture;

/// Execute a chamfer on the given edges of a solid.
pub fn execute_chamfer(
    session: &mut dyn KernelSession,
    solid: &SolidHandle,
    edges: &[EntityId],
    distance: f64,
) -> Result<OpResult, OpError> {
    if distance <= 0.0 {
        return Err(OpError::InvalidParameter {
            reason: "chamfer distance must be positive".to_string(),
        });
    }
    if edges.is_empty() {
        return Err(OpError::InvalidParameter {
            reason: "chamfer needs at least one edge".to_string(),
        });
    }

    let before = capture(session.probe(), solid);
    let handle = session.chamfer_edges(solid, edges, distance)?;
    let after = capture(session.probe(), &handle);
    let outcome = diff_snapshots(&before, &after);

    let roles = blend_roles(&outcome, |index| Role::ChamferFace { index });

    Ok(OpResult {
        outputs: vec![(
            OutputKey::Primary,
            BodyOutput {
                handle,
                mesh: None,
            },
        )],
        provenance: Provenance {
            created: outcome.created,
            deleted: outcome.deleted,
            modified: outcome.modified,
            roles,
        },
        diagnostics: Diagnostics::default(),
    })
}
