//! Concrete local parameterizations for gradient problems.
//!
//! This crate provides the parameterizations most problems need: the
//! identity on Euclidean space, homogeneous unit-norm vectors, and subsets of
//! coordinates held constant.

pub mod euclidean;
pub mod sphere;
pub mod subset;

// Re-export main parameterizations for convenience
pub use euclidean::Euclidean;
pub use sphere::Sphere;
pub use subset::Subset;
