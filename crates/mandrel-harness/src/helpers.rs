//! Helper functions: profile builders, GeomRef constructors, and a kernel
//! wrapper that supersedes an in-flight rebuild partway through.

use std::sync::Once;

use uuid::Uuid;

use mandrel_engine::rebuild::GenerationCounter;
use mandrel_engine::types::{ExtrudeParams, FilletParams, Operation};
use mandrel_kernel::{
    EntityId, GeomKernel, KernelError, KernelProbe, MockKernel, SolidHandle, TriMesh,
};
use mandrel_types::{
    Anchor, GeomRef, OutputKey, ProfileLoop, ResolvePolicy, Role, Selector, SketchPlane,
    SolvedProfileSet, TopoKind, TopoQuery, TopoSignature,
};

/// Opt into tracing output for test runs via RUST_LOG.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .try_init();
    });
}

// ── Profile builders ────────────────────────────────────────────────────────

/// XY-plane sketch with one rectangular outer loop, origin corner at (0,0).
pub fn rect_sketch_op(width: f64, height: f64) -> Operation {
    Operation::Sketch {
        profiles: SolvedProfileSet {
            plane: xy_plane(),
            loops: vec![ProfileLoop {
                points: vec![
                    [0.0, 0.0],
                    [width, 0.0],
                    [width, height],
                    [0.0, height],
                ],
                is_outer: true,
            }],
        },
    }
}

/// XY-plane sketch with one regular N-gon outer loop of the given
/// circumradius, centered at the origin.
pub fn ngon_sketch_op(sides: usize, radius: f64) -> Operation {
    let points = (0..sides)
        .map(|i| {
            let theta = 2.0 * std::f64::consts::PI * i as f64 / sides as f64;
            [radius * theta.cos(), radius * theta.sin()]
        })
        .collect();
    Operation::Sketch {
        profiles: SolvedProfileSet {
            plane: xy_plane(),
            loops: vec![ProfileLoop {
                points,
                is_outer: true,
            }],
        },
    }
}

pub fn xy_plane() -> SketchPlane {
    SketchPlane {
        origin: [0.0, 0.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        x_axis: [1.0, 0.0, 0.0],
    }
}

/// Plain extrude of a sketch's first profile along the plane normal.
pub fn extrude_op(sketch: Uuid, depth: f64) -> Operation {
    Operation::Extrude {
        params: ExtrudeParams {
            sketch,
            profile_index: 0,
            depth,
            direction: None,
            cut: false,
            target: None,
        },
    }
}

/// Fillet one edge of a feature's primary output, referenced by role.
pub fn fillet_op(anchor: Uuid, role: Role, index: usize, radius: f64) -> Operation {
    Operation::Fillet {
        params: FilletParams {
            edges: vec![edge_ref(anchor, role, index)],
            radius,
        },
    }
}

// ── GeomRef constructors ────────────────────────────────────────────────────

pub fn face_ref(feature_id: Uuid, role: Role, index: usize) -> GeomRef {
    GeomRef {
        kind: TopoKind::Face,
        anchor: primary(feature_id),
        selector: Selector::Role { role, index },
        policy: ResolvePolicy::Strict,
    }
}

pub fn edge_ref(feature_id: Uuid, role: Role, index: usize) -> GeomRef {
    GeomRef {
        kind: TopoKind::Edge,
        anchor: primary(feature_id),
        selector: Selector::Role { role, index },
        policy: ResolvePolicy::Strict,
    }
}

pub fn signature_ref(feature_id: Uuid, kind: TopoKind, signature: TopoSignature) -> GeomRef {
    GeomRef {
        kind,
        anchor: primary(feature_id),
        selector: Selector::Signature { signature },
        policy: ResolvePolicy::Strict,
    }
}

pub fn query_ref(feature_id: Uuid, kind: TopoKind, query: TopoQuery) -> GeomRef {
    GeomRef {
        kind,
        anchor: primary(feature_id),
        selector: Selector::Query { query },
        policy: ResolvePolicy::Strict,
    }
}

/// A body-level reference to a feature's primary output.
pub fn body_ref(feature_id: Uuid) -> GeomRef {
    GeomRef {
        kind: TopoKind::Solid,
        anchor: primary(feature_id),
        selector: Selector::Query {
            query: TopoQuery {
                filters: Vec::new(),
                tie_break: None,
            },
        },
        policy: ResolvePolicy::Strict,
    }
}

fn primary(feature_id: Uuid) -> Anchor {
    Anchor::Feature {
        feature_id,
        output: OutputKey::Primary,
    }
}

// ── Cancellation-injecting kernel wrapper ───────────────────────────────────

/// Wraps a MockKernel and claims the next generation on a shared counter
/// when the Nth construction call starts — simulating a newer rebuild
/// request arriving while one is in flight.
pub struct SupersedingSession {
    pub inner: MockKernel,
    counter: GenerationCounter,
    bump_on_call: u64,
    calls: u64,
    bumped: bool,
}

impl SupersedingSession {
    pub fn new(inner: MockKernel, counter: GenerationCounter, bump_on_call: u64) -> Self {
        Self {
            inner,
            counter,
            bump_on_call,
            calls: 0,
            bumped: false,
        }
    }

    /// Whether the wrapper has fired its supersede.
    pub fn bumped(&self) -> bool {
        self.bumped
    }

    fn tick(&mut self) {
        self.calls += 1;
        if !self.bumped && self.calls == self.bump_on_call {
            self.counter.next();
            self.bumped = true;
        }
    }
}

impl GeomKernel for SupersedingSession {
    fn faces_from_profile(
        &mut self,
        profile: &SolvedProfileSet,
    ) -> Result<Vec<EntityId>, KernelError> {
        self.tick();
        self.inner.faces_from_profile(profile)
    }

    fn extrude(
        &mut self,
        face: EntityId,
        direction: [f64; 3],
        depth: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.tick();
        self.inner.extrude(face, direction, depth)
    }

    fn revolve(
        &mut self,
        face: EntityId,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.tick();
        self.inner.revolve(face, axis_origin, axis_direction, angle)
    }

    fn boolean_union(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError> {
        self.tick();
        self.inner.boolean_union(a, b)
    }

    fn boolean_subtract(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError> {
        self.tick();
        self.inner.boolean_subtract(a, b)
    }

    fn boolean_intersect(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError> {
        self.tick();
        self.inner.boolean_intersect(a, b)
    }

    fn fillet_edges(
        &mut self,
        solid: &SolidHandle,
        edges: &[EntityId],
        radius: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.tick();
        self.inner.fillet_edges(solid, edges, radius)
    }

    fn chamfer_edges(
        &mut self,
        solid: &SolidHandle,
        edges: &[EntityId],
        distance: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.tick();
        self.inner.chamfer_edges(solid, edges, distance)
    }

    fn shell(
        &mut self,
        solid: &SolidHandle,
        open_faces: &[EntityId],
        thickness: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.tick();
        self.inner.shell(solid, open_faces, thickness)
    }

    fn tessellate(
        &mut self,
        solid: &SolidHandle,
        tolerance: f64,
    ) -> Result<TriMesh, KernelError> {
        self.tick();
        self.inner.tessellate(solid, tolerance)
    }
}

impl KernelProbe for SupersedingSession {
    fn entities(&self, solid: &SolidHandle, kind: TopoKind) -> Vec<EntityId> {
        self.inner.entities(solid, kind)
    }

    fn face_edges(&self, face: EntityId) -> Vec<EntityId> {
        self.inner.face_edges(face)
    }

    fn edge_faces(&self, edge: EntityId) -> Vec<EntityId> {
        self.inner.edge_faces(edge)
    }

    fn edge_vertices(&self, edge: EntityId) -> Option<(EntityId, EntityId)> {
        self.inner.edge_vertices(edge)
    }

    fn face_neighbors(&self, face: EntityId) -> Vec<EntityId> {
        self.inner.face_neighbors(face)
    }

    fn signature(&self, entity: EntityId, kind: TopoKind) -> TopoSignature {
        self.inner.signature(entity, kind)
    }

    fn signatures_of(
        &self,
        solid: &SolidHandle,
        kind: TopoKind,
    ) -> Vec<(EntityId, TopoSignature)> {
        self.inner.signatures_of(solid, kind)
    }
}
