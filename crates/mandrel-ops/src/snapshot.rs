use mandrel_kernel::{EntityId, KernelProbe, SolidHandle};
use mandrel_types::{TopoKind, TopoSignature};

/// The topology of one solid at a point in time, fingerprints attached.
/// Entity lists are in ascending id order (the probe contract).
#[derive(Debug, Clone, Default)]
pub struct TopoSnapshot {
    pub faces: Vec<(EntityId, TopoSignature)>,
    pub edges: Vec<(EntityId, TopoSignature)>,
    pub vertices: Vec<(EntityId, TopoSignature)>,
}

impl TopoSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenate two snapshots (boolean inputs diff against both bodies).
    pub fn merged(a: &TopoSnapshot, b: &TopoSnapshot) -> Self {
        let mut out = a.clone();
        out.faces.extend(b.faces.iter().cloned());
        out.edges.extend(b.edges.iter().cloned());
        out.vertices.extend(b.vertices.iter().cloned());
        out
    }

    pub fn of_kind(&self, kind: TopoKind) -> &[(EntityId, TopoSignature)] {
        match kind {
            TopoKind::Face => &self.faces,
            TopoKind::Edge => &self.edges,
            TopoKind::Vertex => &self.vertices,
            TopoKind::Shell | TopoKind::Solid => &[],
        }
    }
}

/// Capture a snapshot of a solid for diffing.
pub fn capture(probe: &dyn KernelProbe, solid: &SolidHandle) -> TopoSnapshot {
    TopoSnapshot {
        faces: probe.signatures_of(solid, TopoKind::Face),
        edges: probe.signatures_of(solid, TopoKind::Edge),
        vertices: probe.signatures_of(solid, TopoKind::Vertex),
    }
}
