//! MockKernel — deterministic double for GeomKernel + KernelProbe.
//!
//! Builds synthetic prism topology with predictable entity counts, ids,
//! and signatures: an N-sided profile extrudes to N wall faces, two caps,
//! 3N edges, and 2N vertices. Fillet/chamfer replace an edge with a blend
//! face and trim its neighbors under fresh ids while everything untouched
//! keeps its id; booleans re-id everything, the way a real kernel would.
//!
//! Extras the engine tests lean on: `op_count()` counts construction calls
//! (introspection is free), and `fail_next_op()` forces the next
//! construction call to fail with a typed error.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use mandrel_types::{AdjacencyFingerprint, SolvedProfileSet, TopoKind, TopoSignature};

use crate::traits::{GeomKernel, KernelProbe};
use crate::types::{EntityId, FaceRange, KernelError, SolidHandle, TriMesh};

#[derive(Debug, Clone)]
struct MockVertex {
    id: EntityId,
    position: [f64; 3],
}

#[derive(Debug, Clone)]
struct MockEdge {
    id: EntityId,
    start: EntityId,
    end: EntityId,
    length: f64,
    midpoint: [f64; 3],
    curve_type: String,
}

#[derive(Debug, Clone)]
struct MockFace {
    id: EntityId,
    edges: Vec<EntityId>,
    normal: [f64; 3],
    centroid: [f64; 3],
    area: f64,
    surface_type: String,
}

#[derive(Debug, Clone)]
struct MockSolid {
    vertices: Vec<MockVertex>,
    edges: Vec<MockEdge>,
    faces: Vec<MockFace>,
}

/// A planar face minted by `faces_from_profile`, waiting to be swept.
#[derive(Debug, Clone)]
struct ProfileFace {
    points: Vec<[f64; 3]>,
    normal: [f64; 3],
    centroid: [f64; 3],
    area: f64,
}

/// Deterministic test double for the geometry capability.
pub struct MockKernel {
    next_id: u64,
    next_handle: u64,
    solids: BTreeMap<u64, MockSolid>,
    profile_faces: BTreeMap<u64, ProfileFace>,
    ops_run: u64,
    forced_failure: Option<String>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            solids: BTreeMap::new(),
            profile_faces: BTreeMap::new(),
            ops_run: 0,
            forced_failure: None,
        }
    }

    /// Number of construction (GeomKernel) calls executed so far.
    /// Introspection does not count.
    pub fn op_count(&self) -> u64 {
        self.ops_run
    }

    /// Force the next construction call to fail with the given reason.
    pub fn fail_next_op(&mut self, reason: impl Into<String>) {
        self.forced_failure = Some(reason.into());
    }

    fn enter_op(&mut self) -> Result<(), KernelError> {
        self.ops_run += 1;
        if let Some(message) = self.forced_failure.take() {
            return Err(KernelError::Other { message });
        }
        Ok(())
    }

    fn alloc_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn alloc_handle(&mut self) -> SolidHandle {
        let h = SolidHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn solid(&self, handle: &SolidHandle) -> Result<&MockSolid, KernelError> {
        self.solids.get(&handle.id()).ok_or(KernelError::StaleHandle)
    }

    /// Build a prism by sweeping a polygonal face along `direction` by `depth`.
    /// Allocation order is fixed: bottom vertices, top vertices, bottom ring
    /// edges, top ring edges, vertical edges, wall faces, positive cap,
    /// negative cap.
    fn sweep_prism(
        &mut self,
        base: &ProfileFace,
        direction: [f64; 3],
        depth: f64,
        wall_surface: &str,
    ) -> MockSolid {
        let dir = normalize(direction);
        let offset = scale(dir, depth);
        let n = base.points.len();

        let bottom: Vec<MockVertex> = base
            .points
            .iter()
            .map(|&p| MockVertex {
                id: self.alloc_id(),
                position: p,
            })
            .collect();
        let top: Vec<MockVertex> = base
            .points
            .iter()
            .map(|&p| MockVertex {
                id: self.alloc_id(),
                position: add(p, offset),
            })
            .collect();

        let bottom_ring = self.ring_edges(&bottom);
        let top_ring = self.ring_edges(&top);
        let verticals: Vec<MockEdge> = (0..n)
            .map(|i| MockEdge {
                id: self.alloc_id(),
                start: bottom[i].id,
                end: top[i].id,
                length: depth.abs(),
                midpoint: mid(bottom[i].position, top[i].position),
                curve_type: "line".to_string(),
            })
            .collect();

        let mut faces = Vec::with_capacity(n + 2);
        for i in 0..n {
            let j = (i + 1) % n;
            let edge_vec = sub(base.points[j], base.points[i]);
            let outward = normalize(cross(edge_vec, base.normal));
            let wall_centroid = add(bottom_ring[i].midpoint, scale(dir, depth / 2.0));
            faces.push(MockFace {
                id: self.alloc_id(),
                edges: vec![
                    bottom_ring[i].id,
                    verticals[j].id,
                    top_ring[i].id,
                    verticals[i].id,
                ],
                normal: outward,
                centroid: wall_centroid,
                area: bottom_ring[i].length * depth.abs(),
                surface_type: wall_surface.to_string(),
            });
        }
        faces.push(MockFace {
            id: self.alloc_id(),
            edges: top_ring.iter().map(|e| e.id).collect(),
            normal: dir,
            centroid: add(base.centroid, offset),
            area: base.area,
            surface_type: "planar".to_string(),
        });
        faces.push(MockFace {
            id: self.alloc_id(),
            edges: bottom_ring.iter().map(|e| e.id).collect(),
            normal: scale(dir, -1.0),
            centroid: base.centroid,
            area: base.area,
            surface_type: "planar".to_string(),
        });

        let mut vertices = bottom;
        vertices.extend(top);
        let mut edges = bottom_ring;
        edges.extend(top_ring);
        edges.extend(verticals);

        MockSolid {
            vertices,
            edges,
            faces,
        }
    }

    /// Closed loop of line edges over a vertex ring.
    fn ring_edges(&mut self, verts: &[MockVertex]) -> Vec<MockEdge> {
        let n = verts.len();
        (0..n)
            .map(|i| {
                let a = &verts[i];
                let b = &verts[(i + 1) % n];
                MockEdge {
                    id: self.alloc_id(),
                    start: a.id,
                    end: b.id,
                    length: dist(a.position, b.position),
                    midpoint: mid(a.position, b.position),
                    curve_type: "line".to_string(),
                }
            })
            .collect()
    }

    /// Copy a solid under fresh ids, preserving connectivity.
    fn reissue(&mut self, source: &MockSolid, out: &mut MockSolid) {
        let mut id_map: BTreeMap<EntityId, EntityId> = BTreeMap::new();
        for v in &source.vertices {
            let id = self.alloc_id();
            id_map.insert(v.id, id);
            out.vertices.push(MockVertex {
                id,
                position: v.position,
            });
        }
        for e in &source.edges {
            let id = self.alloc_id();
            id_map.insert(e.id, id);
            out.edges.push(MockEdge {
                id,
                start: id_map[&e.start],
                end: id_map[&e.end],
                length: e.length,
                midpoint: e.midpoint,
                curve_type: e.curve_type.clone(),
            });
        }
        for f in &source.faces {
            let id = self.alloc_id();
            out.faces.push(MockFace {
                id,
                edges: f.edges.iter().map(|e| id_map[e]).collect(),
                normal: f.normal,
                centroid: f.centroid,
                area: f.area,
                surface_type: f.surface_type.clone(),
            });
        }
    }

    /// Replace `edges` of a solid with blend faces: each listed edge is
    /// deleted, its adjacent faces are trimmed under fresh ids, and a new
    /// blend face joins the trim boundaries. Untouched entities keep ids.
    fn blend_edges(
        &mut self,
        solid: &SolidHandle,
        edges: &[EntityId],
        setback: f64,
        blend_surface: &str,
    ) -> Result<SolidHandle, KernelError> {
        let source = self.solid(solid)?.clone();

        let known: BTreeSet<EntityId> = source.edges.iter().map(|e| e.id).collect();
        for id in edges {
            if !known.contains(id) {
                return Err(KernelError::EntityNotFound { id: *id });
            }
        }

        let mut blend_set: Vec<EntityId> = edges.to_vec();
        blend_set.sort();
        blend_set.dedup();

        // Pass 1: one boundary edge per (blended edge, adjacent face) pair.
        let mut replacements: BTreeMap<EntityId, Vec<(EntityId, EntityId)>> = BTreeMap::new();
        let mut boundary_edges: Vec<MockEdge> = Vec::new();
        let mut blend_faces: Vec<(EntityId, Vec<EntityId>)> = Vec::new();
        for &edge_id in &blend_set {
            let edge = source.edges.iter().find(|e| e.id == edge_id).unwrap();
            let mut adjacent: Vec<&MockFace> = source
                .faces
                .iter()
                .filter(|f| f.edges.contains(&edge_id))
                .collect();
            adjacent.sort_by_key(|f| f.id);

            let mut bounds = Vec::new();
            for face in &adjacent {
                let toward = normalize(sub(face.centroid, edge.midpoint));
                let boundary = MockEdge {
                    id: self.alloc_id(),
                    start: edge.start,
                    end: edge.end,
                    length: edge.length,
                    midpoint: add(edge.midpoint, scale(toward, setback)),
                    curve_type: "line".to_string(),
                };
                replacements
                    .entry(face.id)
                    .or_default()
                    .push((edge_id, boundary.id));
                bounds.push(boundary.id);
                boundary_edges.push(boundary);
            }
            blend_faces.push((edge_id, bounds));
        }

        // Pass 2: rebuild faces. Trimmed ones get fresh ids and lose a sliver
        // of area along each replaced edge.
        let mut faces = Vec::with_capacity(source.faces.len() + blend_set.len());
        for f in &source.faces {
            match replacements.get(&f.id) {
                None => faces.push(f.clone()),
                Some(swaps) => {
                    let mut edge_list = f.edges.clone();
                    let mut area = f.area;
                    for (old, new) in swaps {
                        for slot in edge_list.iter_mut() {
                            if slot == old {
                                *slot = *new;
                            }
                        }
                        let trimmed = source.edges.iter().find(|e| e.id == *old).unwrap();
                        area -= setback * trimmed.length * 0.5;
                    }
                    faces.push(MockFace {
                        id: self.alloc_id(),
                        edges: edge_list,
                        normal: f.normal,
                        centroid: f.centroid,
                        area: area.max(f.area * 0.1),
                        surface_type: f.surface_type.clone(),
                    });
                }
            }
        }

        // Pass 3: the blend faces themselves.
        for (edge_id, bounds) in &blend_faces {
            let edge = source.edges.iter().find(|e| e.id == *edge_id).unwrap();
            let mut normal = [0.0, 0.0, 0.0];
            for f in source.faces.iter().filter(|f| f.edges.contains(edge_id)) {
                normal = add(normal, f.normal);
            }
            faces.push(MockFace {
                id: self.alloc_id(),
                edges: bounds.clone(),
                normal: normalize(normal),
                centroid: edge.midpoint,
                area: edge.length * setback * std::f64::consts::FRAC_PI_2,
                surface_type: blend_surface.to_string(),
            });
        }

        let edges_kept: Vec<MockEdge> = source
            .edges
            .iter()
            .filter(|e| !blend_set.contains(&e.id))
            .cloned()
            .chain(boundary_edges)
            .collect();

        let handle = self.alloc_handle();
        self.solids.insert(
            handle.id(),
            MockSolid {
                vertices: source.vertices,
                edges: edges_kept,
                faces,
            },
        );
        Ok(handle)
    }

    fn find_face(&self, id: EntityId) -> Option<(&MockSolid, &MockFace)> {
        for solid in self.solids.values() {
            if let Some(face) = solid.faces.iter().find(|f| f.id == id) {
                return Some((solid, face));
            }
        }
        None
    }

    fn find_edge(&self, id: EntityId) -> Option<(&MockSolid, &MockEdge)> {
        for solid in self.solids.values() {
            if let Some(edge) = solid.edges.iter().find(|e| e.id == id) {
                return Some((solid, edge));
            }
        }
        None
    }

    fn face_signature(solid: &MockSolid, face: &MockFace) -> TopoSignature {
        let mut lengths: Vec<i64> = face
            .edges
            .iter()
            .filter_map(|id| solid.edges.iter().find(|e| e.id == *id))
            .map(|e| quantize(e.length))
            .collect();
        lengths.sort();
        TopoSignature {
            surface_type: Some(face.surface_type.clone()),
            area: Some(face.area),
            length: None,
            centroid: Some(face.centroid),
            normal: Some(face.normal),
            bbox: None,
            adjacency: Some(fingerprint(face.edges.len() as u32, &lengths)),
        }
    }

    fn edge_signature(solid: &MockSolid, edge: &MockEdge) -> TopoSignature {
        let mut areas: Vec<i64> = solid
            .faces
            .iter()
            .filter(|f| f.edges.contains(&edge.id))
            .map(|f| quantize(f.area))
            .collect();
        areas.sort();
        TopoSignature {
            surface_type: Some(edge.curve_type.clone()),
            area: None,
            length: Some(edge.length),
            centroid: Some(edge.midpoint),
            normal: None,
            bbox: None,
            adjacency: Some(fingerprint(areas.len() as u32, &areas)),
        }
    }

    fn vertex_signature(solid: &MockSolid, vertex: &MockVertex) -> TopoSignature {
        let mut lengths: Vec<i64> = solid
            .edges
            .iter()
            .filter(|e| e.start == vertex.id || e.end == vertex.id)
            .map(|e| quantize(e.length))
            .collect();
        lengths.sort();
        TopoSignature {
            surface_type: None,
            area: None,
            length: None,
            centroid: Some(vertex.position),
            normal: None,
            bbox: None,
            adjacency: Some(fingerprint(lengths.len() as u32, &lengths)),
        }
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl GeomKernel for MockKernel {
    fn faces_from_profile(
        &mut self,
        profile: &SolvedProfileSet,
    ) -> Result<Vec<EntityId>, KernelError> {
        self.enter_op()?;

        let mut ids = Vec::new();
        for loop_ in profile.loops.iter().filter(|l| l.is_outer) {
            if loop_.points.len() < 3 {
                return Err(KernelError::DegenerateProfile {
                    reason: format!("loop has {} points, need at least 3", loop_.points.len()),
                });
            }
            let area = polygon_area(&loop_.points);
            if area < 1e-12 {
                return Err(KernelError::DegenerateProfile {
                    reason: "loop encloses zero area".to_string(),
                });
            }

            let plane = &profile.plane;
            let y_axis = cross(plane.normal, plane.x_axis);
            let points: Vec<[f64; 3]> = loop_
                .points
                .iter()
                .map(|&[u, v]| {
                    add(
                        plane.origin,
                        add(scale(plane.x_axis, u), scale(y_axis, v)),
                    )
                })
                .collect();
            let centroid = points
                .iter()
                .fold([0.0, 0.0, 0.0], |acc, &p| add(acc, p));
            let centroid = scale(centroid, 1.0 / points.len() as f64);

            let id = self.alloc_id();
            self.profile_faces.insert(
                id.0,
                ProfileFace {
                    points,
                    normal: normalize(plane.normal),
                    centroid,
                    area,
                },
            );
            ids.push(id);
        }

        if ids.is_empty() {
            return Err(KernelError::DegenerateProfile {
                reason: "profile has no outer loop".to_string(),
            });
        }
        Ok(ids)
    }

    fn extrude(
        &mut self,
        face: EntityId,
        direction: [f64; 3],
        depth: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.enter_op()?;
        let base = self
            .profile_faces
            .remove(&face.0)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let solid = self.sweep_prism(&base, direction, depth, "planar");
        let handle = self.alloc_handle();
        self.solids.insert(handle.id(), solid);
        Ok(handle)
    }

    fn revolve(
        &mut self,
        face: EntityId,
        axis_origin: [f64; 3],
        axis_direction: [f64; 3],
        angle: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.enter_op()?;
        let base = self
            .profile_faces
            .remove(&face.0)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        // Mock approximation: a revolve is a sweep along the axis with the
        // arc length as depth and cylindrical walls.
        let radius = dist(base.centroid, axis_origin).max(0.1);
        let solid = self.sweep_prism(&base, axis_direction, angle.abs() * radius, "cylindrical");
        let handle = self.alloc_handle();
        self.solids.insert(handle.id(), solid);
        Ok(handle)
    }

    fn boolean_union(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError> {
        self.enter_op()?;
        let solid_a = self.solid(a)?.clone();
        let solid_b = self.solid(b)?.clone();
        let mut merged = MockSolid {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
        };
        self.reissue(&solid_a, &mut merged);
        self.reissue(&solid_b, &mut merged);
        let handle = self.alloc_handle();
        self.solids.insert(handle.id(), merged);
        Ok(handle)
    }

    fn boolean_subtract(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError> {
        self.enter_op()?;
        let solid_a = self.solid(a)?.clone();
        self.solid(b)?;
        // The tool is consumed; the blank comes back re-identified.
        let mut result = MockSolid {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
        };
        self.reissue(&solid_a, &mut result);
        let handle = self.alloc_handle();
        self.solids.insert(handle.id(), result);
        Ok(handle)
    }

    fn boolean_intersect(
        &mut self,
        a: &SolidHandle,
        b: &SolidHandle,
    ) -> Result<SolidHandle, KernelError> {
        self.enter_op()?;
        self.solid(a)?;
        let solid_b = self.solid(b)?.clone();
        let mut result = MockSolid {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
        };
        self.reissue(&solid_b, &mut result);
        let handle = self.alloc_handle();
        self.solids.insert(handle.id(), result);
        Ok(handle)
    }

    fn fillet_edges(
        &mut self,
        solid: &SolidHandle,
        edges: &[EntityId],
        radius: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.enter_op()?;
        if radius <= 0.0 {
            return Err(KernelError::BlendFailed {
                reason: "radius must be positive".to_string(),
            });
        }
        self.blend_edges(solid, edges, radius, "cylindrical")
    }

    fn chamfer_edges(
        &mut self,
        solid: &SolidHandle,
        edges: &[EntityId],
        distance: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.enter_op()?;
        if distance <= 0.0 {
            return Err(KernelError::BlendFailed {
                reason: "distance must be positive".to_string(),
            });
        }
        self.blend_edges(solid, edges, distance, "planar")
    }

    fn shell(
        &mut self,
        solid: &SolidHandle,
        open_faces: &[EntityId],
        thickness: f64,
    ) -> Result<SolidHandle, KernelError> {
        self.enter_op()?;
        if thickness <= 0.0 {
            return Err(KernelError::ShellFailed {
                reason: "thickness must be positive".to_string(),
            });
        }
        let source = self.solid(solid)?.clone();
        let known: BTreeSet<EntityId> = source.faces.iter().map(|f| f.id).collect();
        for id in open_faces {
            if !known.contains(id) {
                return Err(KernelError::EntityNotFound { id: *id });
            }
        }

        let mut faces: Vec<MockFace> = source
            .faces
            .iter()
            .filter(|f| !open_faces.contains(&f.id))
            .cloned()
            .collect();
        // Inner offset counterpart for every kept face.
        let kept = faces.clone();
        for f in &kept {
            faces.push(MockFace {
                id: self.alloc_id(),
                edges: f.edges.clone(),
                normal: scale(f.normal, -1.0),
                centroid: sub(f.centroid, scale(f.normal, thickness)),
                area: f.area * 0.9,
                surface_type: f.surface_type.clone(),
            });
        }

        let handle = self.alloc_handle();
        self.solids.insert(
            handle.id(),
            MockSolid {
                vertices: source.vertices,
                edges: source.edges,
                faces,
            },
        );
        Ok(handle)
    }

    fn tessellate(
        &mut self,
        solid: &SolidHandle,
        _tolerance: f64,
    ) -> Result<TriMesh, KernelError> {
        self.enter_op()?;
        let source = self.solid(solid)?;
        let mut mesh = TriMesh {
            vertices: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            face_ranges: Vec::new(),
        };
        // One triangle per face, spanned in the face plane around the centroid.
        for face in &source.faces {
            let u = normalize(perpendicular(face.normal));
            let v = cross(face.normal, u);
            let r = face.area.sqrt().max(1e-3);
            let corners = [
                add(face.centroid, scale(u, r)),
                add(face.centroid, scale(v, r)),
                sub(face.centroid, scale(u, r)),
            ];
            let start = mesh.indices.len() as u32;
            for c in corners {
                let base = (mesh.vertices.len() / 3) as u32;
                mesh.vertices
                    .extend_from_slice(&[c[0] as f32, c[1] as f32, c[2] as f32]);
                mesh.normals.extend_from_slice(&[
                    face.normal[0] as f32,
                    face.normal[1] as f32,
                    face.normal[2] as f32,
                ]);
                mesh.indices.push(base);
            }
            mesh.face_ranges.push(FaceRange {
                face: face.id,
                start,
                end: mesh.indices.len() as u32,
            });
        }
        Ok(mesh)
    }
}

impl KernelProbe for MockKernel {
    fn entities(&self, solid: &SolidHandle, kind: TopoKind) -> Vec<EntityId> {
        let Some(s) = self.solids.get(&solid.id()) else {
            return Vec::new();
        };
        let mut ids: Vec<EntityId> = match kind {
            TopoKind::Vertex => s.vertices.iter().map(|v| v.id).collect(),
            TopoKind::Edge => s.edges.iter().map(|e| e.id).collect(),
            TopoKind::Face => s.faces.iter().map(|f| f.id).collect(),
            TopoKind::Shell | TopoKind::Solid => Vec::new(),
        };
        ids.sort();
        ids
    }

    fn face_edges(&self, face: EntityId) -> Vec<EntityId> {
        let Some((_, f)) = self.find_face(face) else {
            return Vec::new();
        };
        let mut ids = f.edges.clone();
        ids.sort();
        ids
    }

    fn edge_faces(&self, edge: EntityId) -> Vec<EntityId> {
        let Some((solid, _)) = self.find_edge(edge) else {
            return Vec::new();
        };
        let mut ids: Vec<EntityId> = solid
            .faces
            .iter()
            .filter(|f| f.edges.contains(&edge))
            .map(|f| f.id)
            .collect();
        ids.sort();
        ids
    }

    fn edge_vertices(&self, edge: EntityId) -> Option<(EntityId, EntityId)> {
        self.find_edge(edge).map(|(_, e)| (e.start, e.end))
    }

    fn face_neighbors(&self, face: EntityId) -> Vec<EntityId> {
        let Some((solid, f)) = self.find_face(face) else {
            return Vec::new();
        };
        let mut ids: Vec<EntityId> = solid
            .faces
            .iter()
            .filter(|other| other.id != face && other.edges.iter().any(|e| f.edges.contains(e)))
            .map(|other| other.id)
            .collect();
        ids.sort();
        ids
    }

    fn signature(&self, entity: EntityId, kind: TopoKind) -> TopoSignature {
        match kind {
            TopoKind::Face => self
                .find_face(entity)
                .map(|(s, f)| Self::face_signature(s, f))
                .unwrap_or_else(TopoSignature::empty),
            TopoKind::Edge => self
                .find_edge(entity)
                .map(|(s, e)| Self::edge_signature(s, e))
                .unwrap_or_else(TopoSignature::empty),
            TopoKind::Vertex => {
                for solid in self.solids.values() {
                    if let Some(v) = solid.vertices.iter().find(|v| v.id == entity) {
                        return Self::vertex_signature(solid, v);
                    }
                }
                TopoSignature::empty()
            }
            TopoKind::Shell | TopoKind::Solid => TopoSignature::empty(),
        }
    }

    fn signatures_of(
        &self,
        solid: &SolidHandle,
        kind: TopoKind,
    ) -> Vec<(EntityId, TopoSignature)> {
        let Some(s) = self.solids.get(&solid.id()) else {
            return Vec::new();
        };
        let mut out: Vec<(EntityId, TopoSignature)> = match kind {
            TopoKind::Vertex => s
                .vertices
                .iter()
                .map(|v| (v.id, Self::vertex_signature(s, v)))
                .collect(),
            TopoKind::Edge => s
                .edges
                .iter()
                .map(|e| (e.id, Self::edge_signature(s, e)))
                .collect(),
            TopoKind::Face => s
                .faces
                .iter()
                .map(|f| (f.id, Self::face_signature(s, f)))
                .collect(),
            TopoKind::Shell | TopoKind::Solid => Vec::new(),
        };
        out.sort_by_key(|(id, _)| *id);
        out
    }
}

fn fingerprint(degree: u32, neighbor_keys: &[i64]) -> AdjacencyFingerprint {
    let mut hasher = DefaultHasher::new();
    degree.hash(&mut hasher);
    neighbor_keys.hash(&mut hasher);
    AdjacencyFingerprint {
        degree,
        token: hasher.finish(),
    }
}

fn quantize(x: f64) -> i64 {
    (x * 1e6).round() as i64
}

fn polygon_area(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    let mut twice = 0.0;
    for i in 0..n {
        let [x0, y0] = points[i];
        let [x1, y1] = points[(i + 1) % n];
        twice += x0 * y1 - x1 * y0;
    }
    (twice / 2.0).abs()
}

fn add(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(a: [f64; 3], s: f64) -> [f64; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn mid(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    scale(add(a, b), 0.5)
}

fn dist(a: [f64; 3], b: [f64; 3]) -> f64 {
    let d = sub(a, b);
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(a: [f64; 3]) -> [f64; 3] {
    let len = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    if len < 1e-12 {
        return [0.0, 0.0, 1.0];
    }
    scale(a, 1.0 / len)
}

/// An arbitrary unit vector perpendicular to `n`.
fn perpendicular(n: [f64; 3]) -> [f64; 3] {
    let up = if n[0].abs() < 0.9 {
        [1.0, 0.0, 0.0]
    } else {
        [0.0, 1.0, 0.0]
    };
    cross(n, up)
}
