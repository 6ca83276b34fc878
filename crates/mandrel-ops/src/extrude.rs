use mandrel_kernel::{EntityId, KernelProbe, SolidHandle};
use mandrel_types::{OutputKey, Role, TopoKind};

use crate::diff::diff_snapshots;
use crate::result::{BodyOutput, Diagnostics, OpError, OpResult, Provenance};
use crate::session::KernelSession;
use crate::snapshot::{capture, TopoSnapshot};

/// Execute an extrude: sweep an already-built profile face along a
/// direction. `before` carries the input topology when the extrude grows
/// an existing body; the first extrude of a branch passes None.
pub fn execute_extrude(
    session: &mut dyn KernelSession,
    face: EntityId,
    direction: [f64; 3],
    depth: f64,
    before: Option<&TopoSnapshot>,
) -> Result<OpResult, OpError> {
    if depth.abs() < 1e-12 {
        return Err(OpError::InvalidParameter {
            reason: "extrude depth must be non-zero".to_string(),
        });
    }

    let handle = session.extrude(face, direction, depth)?;

    let after = capture(session.probe(), &handle);
    let empty = TopoSnapshot::empty();
    let outcome = diff_snapshots(before.unwrap_or(&empty), &after);

    let roles = classify_extrude_roles(session.probe(), &handle, direction);

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

/// Label an extruded solid: the two opposite planar faces most aligned
/// with the sweep direction are the end caps, everything else is a wall
/// face in ascending-id order, and each cap's boundary edges are labeled
/// for downstream edge references.
fn classify_extrude_roles(
    probe: &dyn KernelProbe,
    solid: &SolidHandle,
    direction: [f64; 3],
) -> Vec<(EntityId, Role)> {
    let faces = probe.entities(solid, TopoKind::Face);
    if faces.is_empty() {
        return Vec::new();
    }

    let dir = normalize(direction);
    let dots: Vec<(EntityId, f64)> = faces
        .iter()
        .map(|&id| {
            let sig = probe.signature(id, TopoKind::Face);
            let dot = sig
                .normal
                .map(|n| n[0] * dir[0] + n[1] * dir[1] + n[2] * dir[2])
                .unwrap_or(0.0);
            (id, dot)
        })
        .collect();

    // Ascending ids already; max/min with ties kept at the first
    // (smallest-id) occurrence.
    let pos_cap = dots
        .iter()
        .filter(|(_, d)| *d > 0.5)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, _)| *id);
    let neg_cap = dots
        .iter()
        .filter(|(_, d)| *d < -0.5)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, _)| *id);

    let mut roles = Vec::new();
    if let Some(id) = pos_cap {
        roles.push((id, Role::EndCapPos));
    }
    if let Some(id) = neg_cap {
        roles.push((id, Role::EndCapNeg));
    }
    let mut wall_index = 0;
    for &(id, _) in &dots {
        if Some(id) == pos_cap || Some(id) == neg_cap {
            continue;
        }
        roles.push((id, Role::WallFace { index: wall_index }));
        wall_index += 1;
    }

    if let Some(cap) = pos_cap {
        for (i, edge) in probe.face_edges(cap).into_iter().enumerate() {
            roles.push((edge, Role::EndCapPosEdge { index: i }));
        }
    }
    if let Some(cap) = neg_cap {
        for (i, edge) in probe.face_edges(cap).into_iter().enumerate() {
            roles.push((edge, Role::EndCapNegEdge { index: i }));
        }
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
