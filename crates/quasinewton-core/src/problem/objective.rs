//! First-order objective interface.
//!
//! A [`FirstOrderFunction`] evaluates a scalar objective and its gradient.
//! Two optional hooks let an objective provide faster paths for work that
//! otherwise has a generic implementation:
//! - [`FirstOrderFunction::evaluate_gradient_norms`], e.g. exploiting sparsity;
//! - [`FirstOrderFunction::next_direction`], e.g. running the two-loop
//!   recursion next to where the objective keeps its data.
//!
//! Both return `None` by default, meaning "not provided"; callers then fall
//! back to the generic algorithm.

use crate::{
    direction::{CurvatureHistory, DirectionRequest},
    error::{Result, SolverResult},
    types::{DVector, Scalar},
};
use std::fmt::Debug;

/// Squared L2 norm and max-abs norm of a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientNorms<T: Scalar> {
    /// `|g|²`
    pub squared_norm: T,
    /// `max_i |g_i|`
    pub max_norm: T,
}

impl<T: Scalar> GradientNorms<T> {
    /// Computes both norms of `gradient` directly.
    pub fn of(gradient: &DVector<T>) -> Self {
        Self {
            squared_norm: gradient.norm_squared(),
            max_norm: gradient.amax(),
        }
    }
}

/// An objective that can be evaluated together with its gradient.
///
/// # Example
///
/// Rosenbrock's function `f(x, y) = (1 - x)² + 100 (y - x²)²`:
///
/// ```rust
/// use quasinewton_core::prelude::*;
///
/// #[derive(Debug)]
/// struct Rosenbrock;
///
/// impl FirstOrderFunction<f64> for Rosenbrock {
///     fn evaluate(&self, p: &DVector<f64>, gradient: Option<&mut DVector<f64>>) -> Result<f64> {
///         let (x, y) = (p[0], p[1]);
///         if let Some(g) = gradient {
///             g[0] = -2.0 * (1.0 - x) - 400.0 * (y - x * x) * x;
///             g[1] = 200.0 * (y - x * x);
///         }
///         Ok((1.0 - x).powi(2) + 100.0 * (y - x * x).powi(2))
///     }
///
///     fn num_parameters(&self) -> usize {
///         2
///     }
/// }
///
/// let problem = GradientProblem::new(Box::new(Rosenbrock));
/// assert_eq!(problem.num_local_parameters(), 2);
/// ```
pub trait FirstOrderFunction<T: Scalar>: Debug {
    /// Evaluates the cost at `parameters` and, if `gradient` is given, writes
    /// the gradient into it.
    ///
    /// An `Err` means the objective is not defined (or not representable) at
    /// this point. Callers treat it as a reason to retry elsewhere, not as a
    /// fatal failure.
    fn evaluate(&self, parameters: &DVector<T>, gradient: Option<&mut DVector<T>>) -> Result<T>;

    /// Number of (ambient) parameters. Constant for the object's lifetime.
    fn num_parameters(&self) -> usize;

    /// Returns the squared L2 norm and max-abs norm of `gradient` at `x`.
    ///
    /// # Default Implementation
    ///
    /// Returns `None`; the caller computes the norms generically.
    fn evaluate_gradient_norms(
        &self,
        _x: &DVector<T>,
        _gradient: &DVector<T>,
    ) -> Option<GradientNorms<T>> {
        None
    }

    /// Computes the next search direction from the curvature history.
    ///
    /// On `Some(Ok(d))`, `search_direction` holds the new direction and `d`
    /// its dot product with the current gradient.
    ///
    /// # Default Implementation
    ///
    /// Returns `None`; the caller runs the generic two-loop recursion.
    fn next_direction(
        &self,
        _request: &DirectionRequest<'_, T>,
        _history: &mut dyn CurvatureHistory<T>,
        _approximate_eigenvalue_scale: &mut T,
        _search_direction: &mut DVector<T>,
    ) -> Option<SolverResult<T>> {
        None
    }
}
