use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mandrel_types::{GeomRef, SolvedProfileSet};

/// The ordered list of modeling features — the parametric recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTree {
    /// Index 0 is the first feature. Tree order is the sole dependency
    /// order: a feature may only reference strictly earlier features.
    pub features: Vec<Feature>,
    /// Rollback point. Features after this index stay in the tree but are
    /// not rebuilt. None means the whole tree is active.
    pub active_index: Option<usize>,
}

impl FeatureTree {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
            active_index: None,
        }
    }

    /// Index one past the last active feature.
    pub fn active_bound(&self) -> usize {
        match self.active_index {
            Some(idx) => (idx + 1).min(self.features.len()),
            None => self.features.len(),
        }
    }

    pub fn find_feature(&self, id: Uuid) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn feature_index(&self, id: Uuid) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }
}

impl Default for FeatureTree {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry in the parametric sequence. The id is minted at creation and
/// never changes for the life of the feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub name: String,
    pub operation: Operation,
    pub suppressed: bool,
}

/// The closed set of modeling operations. Dispatch is an exhaustive match
/// in the rebuild engine, so adding a kind here is a compile error until
/// its executor and role classifier exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// A solved sketch, passed through from the external constraint
    /// solver. Produces no geometry of its own.
    Sketch { profiles: SolvedProfileSet },
    Extrude { params: ExtrudeParams },
    Revolve { params: RevolveParams },
    Fillet { params: FilletParams },
    Chamfer { params: ChamferParams },
    Shell { params: ShellParams },
    BooleanCombine { params: BooleanParams },
}

impl Operation {
    /// Every GeomRef this operation consumes.
    pub fn geom_refs(&self) -> Vec<&GeomRef> {
        match self {
            Operation::Sketch { .. } | Operation::Revolve { .. } => Vec::new(),
            Operation::Extrude { params } => params.target.iter().collect(),
            Operation::Fillet { params } => params.edges.iter().collect(),
            Operation::Chamfer { params } => params.edges.iter().collect(),
            Operation::Shell { params } => params.open_faces.iter().collect(),
            Operation::BooleanCombine { params } => vec![&params.blank, &params.tool],
        }
    }

    /// Ids of the features this operation depends on: every GeomRef
    /// anchor plus the sketch a profile-consuming operation reads.
    pub fn referenced_features(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .geom_refs()
            .iter()
            .filter_map(|r| r.anchor.feature_id())
            .collect();
        match self {
            Operation::Extrude { params } => ids.push(params.sketch),
            Operation::Revolve { params } => ids.push(params.sketch),
            _ => {}
        }
        ids.sort();
        ids.dedup();
        ids
    }

    /// Short kind name for tree displays.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operation::Sketch { .. } => "Sketch",
            Operation::Extrude { .. } => "Extrude",
            Operation::Revolve { .. } => "Revolve",
            Operation::Fillet { .. } => "Fillet",
            Operation::Chamfer { .. } => "Chamfer",
            Operation::Shell { .. } => "Shell",
            Operation::BooleanCombine { .. } => "Boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrudeParams {
    /// The sketch feature whose profiles to sweep.
    pub sketch: Uuid,
    /// Which outer loop of the sketch to use.
    pub profile_index: usize,
    pub depth: f64,
    /// Sweep direction; defaults to the sketch plane normal.
    pub direction: Option<[f64; 3]>,
    /// Remove material instead of adding it.
    pub cut: bool,
    /// Body a cut subtracts from. None means the most recent solid
    /// upstream of this feature.
    pub target: Option<GeomRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevolveParams {
    pub sketch: Uuid,
    pub profile_index: usize,
    pub axis_origin: [f64; 3],
    pub axis_direction: [f64; 3],
    /// Sweep angle in radians.
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilletParams {
    pub edges: Vec<GeomRef>,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChamferParams {
    pub edges: Vec<GeomRef>,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellParams {
    pub open_faces: Vec<GeomRef>,
    pub thickness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanParams {
    pub blank: GeomRef,
    pub tool: GeomRef,
    pub kind: BooleanOpKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BooleanOpKind {
    Union,
    Subtract,
    Intersect,
}
