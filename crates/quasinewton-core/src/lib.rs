//! Core traits and types for gradient-based optimization.
//!
//! This crate provides the pieces a line-search minimizer needs to drive an
//! unconstrained problem with a limited-memory quasi-Newton method.
//!
//! # Key Concepts
//!
//! - **Objective**: a function that evaluates its cost and gradient
//! - **Local parameterization**: how parameters move on a manifold
//! - **Gradient problem**: the composition of the two
//! - **Evaluator**: the minimizer-facing view of a problem, with timing
//! - **Two-loop recursion**: the L-BFGS direction update over a caller-owned
//!   curvature history
//!
//! # Modules
//!
//! - [`direction`]: Direction-update engine and curvature history interface
//! - [`error`]: Error types for evaluations and direction updates
//! - [`evaluator`]: Evaluator trait and the gradient-problem adapter
//! - [`problem`]: Objective, parameterization and gradient problem
//! - [`profiling`]: Execution-time statistics
//! - [`types`]: Scalar trait and nalgebra aliases

pub mod direction;
pub mod error;
pub mod evaluator;
pub mod problem;
pub mod profiling;
pub mod types;

// Re-export commonly used items at the crate root
pub use error::{ProblemError, Result, SolverError, SolverResult};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use quasinewton_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::direction::{
        two_loop_direction, CurvatureHistory, DirectionRequest, PreviousIterate, ReadSlot,
        WriteSlot,
    };
    pub use crate::error::{ProblemError, Result, SolverError, SolverResult};
    pub use crate::evaluator::{
        default_gradient_norms, EvaluateOptions, Evaluator, GradientProblemEvaluator,
    };
    pub use crate::problem::{
        FirstOrderFunction, GradientNorms, GradientProblem, LocalParameterization,
    };
    pub use crate::profiling::{CallStatistics, ExecutionSummary, ScopedExecutionTimer};
    pub use crate::types::{DMatrix, DVector, Scalar};
}
