//! Dense numerical primitives for the plume engine.

pub mod cholesky;
pub mod dense;
pub mod lu;

pub use cholesky::Cholesky;
pub use lu::LuSolver;
