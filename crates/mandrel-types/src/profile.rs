use serde::{Deserialize, Serialize};

/// The plane a solved sketch lies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchPlane {
    pub origin: [f64; 3],
    pub normal: [f64; 3],
    /// In-plane X axis; Y is normal × x_axis.
    pub x_axis: [f64; 3],
}

/// One closed loop of a solved profile, in plane coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileLoop {
    /// Ordered loop vertices. The loop closes from the last point back to
    /// the first; consecutive duplicates are not allowed.
    pub points: Vec<[f64; 2]>,
    /// Outer boundary (true) or hole (false).
    pub is_outer: bool,
}

/// Output of the external constraint solver, passed through to
/// profile-consuming operations. The engine never inspects or re-solves
/// constraints; it only consumes these loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedProfileSet {
    pub plane: SketchPlane,
    pub loops: Vec<ProfileLoop>,
}

impl SolvedProfileSet {
    /// Indices of the outer loops, in declaration order.
    pub fn outer_loops(&self) -> Vec<usize> {
        self.loops
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_outer)
            .map(|(i, _)| i)
            .collect()
    }
}
