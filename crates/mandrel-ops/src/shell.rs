use std::collections::BTreeSet;

use mandrel_kernel::{EntityId, KernelProbe, SolidHandle};
use mandrel_types::{OutputKey, Role, TopoKind};

use crate::diff::diff_snapshots;
use crate::result::{BodyOutput, Diagnostics, OpError, OpResult, Provenance};
use crate::session::KernelSession;
use crate::snapshot::{capture, TopoSnapshot};

/// Execute a shell: hollow the solid, opening it at `open_faces`.
pub fn execute_shell(
    session: &mut dyn KernelSession,
    solid: &SolidHandle,
    open_faces: &[EntityId],
    thickness: f64,
) -> Result<OpResult, OpError> {
    if thickness <= 0.0 {
        return Err(OpError::InvalidParameter {
            reason: "shell thickness must be positive".to_string(),
        });
    }

    let before = capture(session.probe(), solid);
    let handle = session.shell(solid, open_faces, thickness)?;
    let after = capture(session.probe(), &handle);
    let outcome = diff_snapshots(&before, &after);

    let roles = classify_shell_roles(session.probe(), &handle, &before);

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

/// Every face the shell introduced (the inner offsets) gets a role, in
/// ascending-id order.
fn classify_shell_roles(
    probe: &dyn KernelProbe,
    solid: &SolidHandle,
    before: &TopoSnapshot,
) -> Vec<(EntityId, Role)> {
    let before_ids: BTreeSet<EntityId> = before.faces.iter().map(|(id, _)| *id).collect();
    probe
        .entities(solid, TopoKind::Face)
        .into_iter()
        .filter(|id| !before_ids.contains(id))
        .enumerate()
        .map(|(i, id)| (id, Role::ShellFace { index: i }))
        .collect()
}
