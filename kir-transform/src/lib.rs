//! Transformation passes over the Loom kernel IR.

mod cse;

pub use self::cse::{WholeKernelCse, whole_kernel_cse};
