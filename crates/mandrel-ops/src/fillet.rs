use mandrel_kernel::{EntityId, SolidHandle};
use mandrel_types::{OutputKey, Role, TopoKind};

use crate::diff::{diff_snapshots, DiffOutcome};
use crate::result::{BodyOutput, Diagnostics, OpError, OpResult, Provenance};
use crate::session::KernelSession;
use crate::snapshot::capture;

/// Execute a fillet on the given edges of a solid.
pub fn execute_fillet(
    session: &mut dyn KernelSession,
    solid: &SolidHandle,
    edges: &[EntityId],
    radius: f64,
) -> Result<OpResult, OpError> {
    if radius <= 0.0 {
        return Err(OpError::InvalidParameter {
            reason: "fillet radius must be positive".to_string(),
        });
    }
    if edges.is_empty() {
        return Err(OpError::InvalidParameter {
            reason: "fillet needs at least one edge".to_string(),
        });
    }

    let before = capture(session.probe(), solid);
    let handle = session.fillet_edges(solid, edges, radius)?;
    let after = capture(session.probe(), &handle);
    let outcome = diff_snapshots(&before, &after);

    // Trimmed neighbors pair off in the diff, so the created faces are
    // exactly the new blend faces, already in ascending-id order.
    let roles = blend_roles(&outcome, |index| Role::FilletFace { index });

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

/// Assign a blend role to every created face, in the differ's order.
pub(crate) fn blend_roles(
    outcome: &DiffOutcome,
    make_role: impl Fn(usize) -> Role,
) -> Vec<(EntityId, Role)> {
    outcome
        .created
        .iter()
        .filter(|rec| rec.kind == TopoKind::Face)
        .enumerate()
        .map(|(i, rec)| (rec.id, make_role(i)))
        .collect()
}
