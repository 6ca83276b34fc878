use mandrel_kernel::{GeomKernel, KernelProbe};

/// Combined trait for executors that need construction (&mut) and
/// introspection (&) on the same kernel object without fighting the
/// borrow checker.
pub trait KernelSession: GeomKernel + KernelProbe {
    fn probe(&self) -> &dyn KernelProbe;
}

impl<T: GeomKernel + KernelProbe> KernelSession for T {
    fn probe(&self) -> &dyn KernelProbe {
        self
    }
}
