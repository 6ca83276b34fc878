//! Scenario test harness: profile builders, GeomRef constructors, a
//! cancellation-injecting kernel wrapper, and rich assertions.

pub mod assertions;
pub mod helpers;

pub use assertions::*;
pub use helpers::*;
