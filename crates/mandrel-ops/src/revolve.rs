use mandrel_kernel::{EntityId, KernelProbe, SolidHandle};
use mandrel_types::{OutputKey, Role, TopoKind};

use crate::diff::diff_snapshots;
use crate::result::{BodyOutput, Diagnostics, OpError, OpResult, Provenance};
use crate::session::KernelSession;
use crate::snapshot::{capture, TopoSnapshot};

/// Execute a revolve: sweep a profile face around an axis by `angle`
/// radians.
pub fn execute_revolve(
    session: &mut dyn KernelSession,
    face: EntityId,
    axis_origin: [f64; 3],
    axis_direction: [f64; 3],
    angle: f64,
) -> Result<OpResult, OpError> {
    if angle.abs() < 1e-12 {
        return Err(OpError::InvalidParameter {
            reason: "revolve angle must be non-zero".to_string(),
        });
    }

    let handle = session.revolve(face, axis_origin, axis_direction, angle)?;

    let after = capture(session.probe(), &handle);
    let outcome = diff_snapshots(&TopoSnapshot::empty(), &after);
    let roles = classify_revolve_roles(session.probe(), &handle, axis_direction);

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

/// The planar faces bounding the sweep are the start/end faces (start on
/// the negative axis side); revolved faces are walls in ascending order.
fn classify_revolve_roles(
    probe: &dyn KernelProbe,
    solid: &SolidHandle,
    axis_direction: [f64; 3],
) -> Vec<(EntityId, Role)> {
    let faces = probe.entities(solid, TopoKind::Face);
    let axis = normalize(axis_direction);

    let mut start = None;
    let mut end = None;
    let mut walls = Vec::new();
    for id in faces {
        let sig = probe.signature(id, TopoKind::Face);
        let planar = sig.surface_type.as_deref() == Some("planar");
        let dot = sig
            .normal
            .map(|n| n[0] * axis[0] + n[1] * axis[1] + n[2] * axis[2])
            .unwrap_or(0.0);
        if planar && dot < -0.5 && start.is_none() {
            start = Some(id);
        } else if planar && dot > 0.5 && end.is_none() {
            end = Some(id);
        } else {
            walls.push(id);
        }
    }

    let mut roles = Vec::new();
    if let Some(id) = start {
        roles.push((id, Role::RevolveStart));
    }
    if let Some(id) = end {
        roles.push((id, Role::RevolveEnd));
    }
    for (i, id) in walls.into_iter().enumerate() {
        roles.push((id, Role::WallFace { index: i }));
    }
    roles
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len < 1e-12 {
        return [0.0, 0.0, 1.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}
