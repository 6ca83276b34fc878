use mandrel_kernel::{EntityId, KernelProbe, SolidHandle};
use mandrel_types::{OutputKey, Role, TopoKind};

use crate::diff::diff_snapshots;
use crate::result::{BodyOutput, Diagnostics, OpError, OpResult, Provenance};
use crate::session::KernelSession;
use crate::similarity::signature_similarity;
use crate::snapshot::{capture, TopoSnapshot};

/// Which boolean to run. The first operand is the blank, the second the
/// tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanKind {
    Union,
    Subtract,
    Intersect,
}

/// Execute a boolean between two solids. Provenance diffs the result
/// against the union of both input topologies, so faces consumed from
/// either body show up as deleted or paired.
pub fn execute_boolean(
    session: &mut dyn KernelSession,
    blank: &SolidHandle,
    tool: &SolidHandle,
    kind: BooleanKind,
) -> Result<OpResult, OpError> {
    let snap_blank = capture(session.probe(), blank);
    let snap_tool = capture(session.probe(), tool);
    let before = TopoSnapshot::merged(&snap_blank, &snap_tool);

    let handle = match kind {
        BooleanKind::Union => session.boolean_union(blank, tool)?,
        BooleanKind::Subtract => session.boolean_subtract(blank, tool)?,
        BooleanKind::Intersect => session.boolean_intersect(blank, tool)?,
    };

    let after = capture(session.probe(), &handle);
    let outcome = diff_snapshots(&before, &after);
    let roles = classify_boolean_roles(session.probe(), &handle, &snap_blank, &snap_tool);

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

/// Attribute each result face to the input body it most resembles.
fn classify_boolean_roles(
    probe: &dyn KernelProbe,
    result: &SolidHandle,
    snap_blank: &TopoSnapshot,
    snap_tool: &TopoSnapshot,
) -> Vec<(EntityId, Role)> {
    let mut roles = Vec::new();
    let mut blank_index = 0;
    let mut tool_index = 0;

    for face in probe.entities(result, TopoKind::Face) {
        let sig = probe.signature(face, TopoKind::Face);
        let best = |snap: &TopoSnapshot| {
            snap.faces
                .iter()
                .map(|(_, s)| signature_similarity(&sig, s))
                .fold(0.0_f64, f64::max)
        };
        if best(snap_blank) >= best(snap_tool) {
            roles.push((face, Role::BlankFace { index: blank_index }));
            blank_index += 1;
        } else {
            roles.push((face, Role::ToolFace { index: tool_index }));
            tool_index += 1;
        }
    }

    roles
}
