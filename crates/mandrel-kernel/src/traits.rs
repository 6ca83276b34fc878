use mandrel_types::{SolvedProfileSet, TopoKind, TopoSignature};

use crate::types::{EntityId, KernelError, SolidHandle, TriMesh};

/// Construction side of the geometry capability. One entry point per
/// operation; each takes resolved inputs and returns a new handle or a
/// typed failure. The engine core never looks inside a handle.
pub trait GeomKernel {
    /// Build planar faces from a solved profile set, one per outer loop.
    /// Returns the face ids in loop order.
    fn faces_from_profile(
        &mut self,
        profile: &SolvedProfileSet,
    ) -> Result<Vec<EntityId>, KernelError>;

    /// Sweep a planar face along a direction vector.
    fn extrude(
        &mut self,
        face: EntityId,
        direction: [f64; 3],
        depth: f64,
    ) -> Result<SolidHandle, KernelError>;

    /// Sweep a planar face around an axis.
    fn revolve(
        &mut self,
        face: EntityId,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle: f64,
    ) -> Result<SolidHandle, KernelError>;

    fn boolean_union(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError>;

    /// a minus b.
    fn boolean_subtract(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError>;

    fn boolean_intersect(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError>;

    /// Round the given edges with a constant radius.
    fn fillet_edges(
        &mut self,
        solid: &SolidHandle,
        edges: &[EntityId],
        radius: f64,
    ) -> Result<SolidHandle, KernelError>;

    /// Bevel the given edges with a constant setback distance.
    fn chamfer_edges(
        &mut self,
        solid: &SolidHandle,
        edges: &[EntityId],
        distance: f64,
    ) -> Result<SolidHandle, KernelError>;

    /// Hollow a solid, removing the listed faces and offsetting the rest
    /// inward by `thickness`.
    fn shell(
        &mut self,
        solid: &SolidHandle,
        open_faces: &[EntityId],
        thickness: f64,
    ) -> Result<SolidHandle, KernelError>;

    /// Triangulate a solid for display.
    fn tessellate(&mut self, solid: &SolidHandle, tolerance: f64)
        -> Result<TriMesh, KernelError>;
}

/// Introspection side of the geometry capability: read-only queries over a
/// handle's constituent entities. Every listing method MUST return results
/// in ascending EntityId order — the rebuild determinism contract depends
/// on it.
pub trait KernelProbe {
    /// All entities of one kind in a solid, ascending by id.
    fn entities(&self, solid: &SolidHandle, kind: TopoKind) -> Vec<EntityId>;

    /// Edges bounding a face, ascending by id.
    fn face_edges(&self, face: EntityId) -> Vec<EntityId>;

    /// Faces sharing an edge, ascending by id.
    fn edge_faces(&self, edge: EntityId) -> Vec<EntityId>;

    /// Endpoint vertices of an edge.
    fn edge_vertices(&self, edge: EntityId) -> Option<(EntityId, EntityId)>;

    /// Faces sharing at least one edge with the given face, ascending by id.
    fn face_neighbors(&self, face: EntityId) -> Vec<EntityId>;

    /// Geometric fingerprint of one entity. Absent fields are permitted.
    fn signature(&self, entity: EntityId, kind: TopoKind) -> TopoSignature;

    /// Fingerprints for every entity of a kind, ascending by id.
    fn signatures_of(
        &self,
        solid: &SolidHandle,
        kind: TopoKind,
    ) -> Vec<(EntityId, TopoSignature)>;
}
