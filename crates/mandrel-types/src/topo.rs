use serde::{Deserialize, Serialize};

/// The kind of topological entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TopoKind {
    Vertex,
    Edge,
    Face,
    Shell,
    Solid,
}

/// Partial geometric fingerprint of one topological entity.
/// Any subset of fields may be present; fuzzy matching skips absent ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopoSignature {
    /// Surface or curve type (planar, cylindrical, conical, spherical, line, arc, ...).
    pub surface_type: Option<String>,
    /// Surface area (faces).
    pub area: Option<f64>,
    /// Curve length (edges).
    pub length: Option<f64>,
    /// Centroid position [x, y, z].
    pub centroid: Option<[f64; 3]>,
    /// Outward normal at the centroid (faces).
    pub normal: Option<[f64; 3]>,
    /// Axis-aligned bounding box [min_x, min_y, min_z, max_x, max_y, max_z].
    pub bbox: Option<[f64; 6]>,
    /// Summary of which other entities this one touches.
    pub adjacency: Option<AdjacencyFingerprint>,
}

impl TopoSignature {
    pub fn empty() -> Self {
        Self {
            surface_type: None,
            area: None,
            length: None,
            centroid: None,
            normal: None,
            bbox: None,
            adjacency: None,
        }
    }
}

/// Stable summary of an entity's neighborhood.
///
/// `degree` is the number of touching entities of the neighboring kind
/// (faces for an edge, edges for a face). `token` is an order-independent
/// hash over neighbor descriptors: equal tokens mean the neighborhoods are
/// indistinguishable. Stable across repeated computation on unchanged
/// topology; never compared across kernel sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyFingerprint {
    pub degree: u32,
    pub token: u64,
}

/// User-specified geometric query for selecting entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopoQuery {
    /// Filters applied in order to narrow the candidate set.
    pub filters: Vec<QueryFilter>,
    /// How to pick one entity if several survive the filters.
    pub tie_break: Option<TieBreak>,
}

/// Filter predicate for a TopoQuery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QueryFilter {
    /// Surface/curve type must match exactly.
    SurfaceType { surface_type: String },
    /// Normal must be within `tolerance` radians of `direction`.
    NormalWithin { direction: [f64; 3], tolerance: f64 },
    /// Centroid must be within `distance` of `point`.
    NearPoint { point: [f64; 3], distance: f64 },
    /// Area must lie in [min, max].
    AreaBetween { min: f64, max: f64 },
}

/// Tie-breaking rule when several entities survive a query's filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TieBreak {
    /// The survivor with the largest area.
    LargestArea,
    /// The survivor nearest to the given point.
    NearestTo { point: [f64; 3] },
    /// The survivor with the smallest entity id.
    SmallestId,
}
