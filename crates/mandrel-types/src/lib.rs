pub mod geom_ref;
pub mod profile;
pub mod roles;
pub mod topo;

pub use geom_ref::{Anchor, GeomRef, OutputKey, ResolvePolicy, Selector};
pub use profile::{ProfileLoop, SketchPlane, SolvedProfileSet};
pub use roles::Role;
pub use topo::{AdjacencyFingerprint, QueryFilter, TieBreak, TopoKind, TopoQuery, TopoSignature};
