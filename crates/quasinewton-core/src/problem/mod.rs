//! Objectives, local parameterizations and their composition into a
//! gradient problem.

pub mod gradient_problem;
pub mod objective;
pub mod parameterization;

pub use gradient_problem::GradientProblem;
pub use objective::{FirstOrderFunction, GradientNorms};
pub use parameterization::LocalParameterization;
