pub mod mock;
pub mod traits;
pub mod types;

pub use mock::MockKernel;
pub use traits::{GeomKernel, KernelProbe};
pub use types::{EntityId, FaceRange, KernelError, SolidHandle, TriMesh};
