pub mod boolean;
pub mod chamfer;
pub mod diff;
pub mod extrude;
pub mod fillet;
pub mod result;
pub mod revolve;
pub mod session;
pub mod shell;
pub mod similarity;
pub mod snapshot;

pub use boolean::{execute_boolean, BooleanKind};
pub use chamfer::execute_chamfer;
pub use diff::{diff_snapshots, DiffOutcome};
pub use extrude::execute_extrude;
pub use fillet::execute_fillet;
pub use result::*;
pub use revolve::execute_revolve;
pub use session::KernelSession;
pub use shell::execute_shell;
pub use similarity::{signature_similarity, signatures_match, MOVE_EPSILON, ROLE_THRESHOLD};
pub use snapshot::{capture, TopoSnapshot};
