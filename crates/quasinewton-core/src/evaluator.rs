//! Evaluator interface consumed by line-search minimizers.
//!
//! The minimizer never talks to a problem directly. It goes through an
//! [`Evaluator`], which exposes cost/gradient evaluation, the `Plus`
//! operation, the optional fast paths, dimension queries and timing
//! statistics. [`GradientProblemEvaluator`] adapts a [`GradientProblem`] to
//! this interface.

use crate::{
    direction::{two_loop_direction, CurvatureHistory, DirectionRequest},
    error::{ProblemError, Result, SolverResult},
    problem::{GradientNorms, GradientProblem},
    profiling::{CallStatistics, ExecutionSummary, ScopedExecutionTimer},
    types::{DMatrix, DVector, Scalar},
};
use std::collections::BTreeMap;

/// Timer category spanning a whole `evaluate` call.
pub const TOTAL_EVALUATION: &str = "Evaluator::Total";

/// Timer category for cost-only evaluations.
pub const RESIDUAL_EVALUATION: &str = "Evaluator::Residual";

/// Timer category for evaluations that also produce a gradient.
///
/// The name matches the least-squares evaluator, whose gradient evaluations
/// compute a Jacobian.
pub const JACOBIAN_EVALUATION: &str = "Evaluator::Jacobian";

/// Options for a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluateOptions {
    /// The point differs from the one of the previous call.
    pub new_evaluation_point: bool,
    /// Apply the robust loss (ignored by gradient problems).
    pub apply_loss_function: bool,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            new_evaluation_point: true,
            apply_loss_function: true,
        }
    }
}

/// Interface between a minimizer and the problem it minimizes.
pub trait Evaluator<T: Scalar> {
    /// Creates a Jacobian with the evaluator's sparsity, if it has one.
    fn create_jacobian(&self) -> Option<DMatrix<T>>;

    /// Evaluates the cost at `state`, optionally with residuals, gradient and
    /// Jacobian.
    ///
    /// The gradient lives in the tangent space at `state` and has
    /// [`num_effective_parameters`](Evaluator::num_effective_parameters)
    /// entries.
    fn evaluate(
        &self,
        options: &EvaluateOptions,
        state: &DVector<T>,
        residuals: Option<&mut DVector<T>>,
        gradient: Option<&mut DVector<T>>,
        jacobian: Option<&mut DMatrix<T>>,
    ) -> Result<T>;

    /// Writes `⊞(state, delta)` into `state_plus_delta`.
    fn plus(&self, state: &DVector<T>, delta: &DVector<T>, state_plus_delta: &mut DVector<T>) -> Result<()>;

    /// Squared and max norms of the projected gradient at `x`.
    ///
    /// `gradient` lives in the tangent space at `x`.
    fn evaluate_gradient_norms(&self, x: &DVector<T>, gradient: &DVector<T>) -> Result<GradientNorms<T>> {
        default_gradient_norms(self, x, gradient)
    }

    /// Computes the next search direction; see [`two_loop_direction`].
    fn next_direction(
        &self,
        request: &DirectionRequest<'_, T>,
        history: &mut dyn CurvatureHistory<T>,
        approximate_eigenvalue_scale: &mut T,
        search_direction: &mut DVector<T>,
    ) -> SolverResult<T> {
        two_loop_direction(request, history, approximate_eigenvalue_scale, search_direction)
    }

    /// Ambient size of the state.
    fn num_parameters(&self) -> usize;

    /// Size of the tangent space in which steps are taken.
    fn num_effective_parameters(&self) -> usize;

    /// Number of residuals.
    fn num_residuals(&self) -> usize;

    /// Time spent per call category.
    fn statistics(&self) -> BTreeMap<String, CallStatistics>;
}

/// Norms of the projected gradient `x - ⊞(x, -gradient)`.
///
/// This is the generic fallback for evaluators whose problem has no faster
/// way to compute gradient norms.
pub fn default_gradient_norms<T, E>(evaluator: &E, x: &DVector<T>, gradient: &DVector<T>) -> Result<GradientNorms<T>>
where
    T: Scalar,
    E: Evaluator<T> + ?Sized,
{
    let negative_gradient = -gradient;
    let mut projected_gradient_step = DVector::zeros(x.len());
    evaluator
        .plus(x, &negative_gradient, &mut projected_gradient_step)
        .map_err(|_| ProblemError::plus_failed("projected_gradient_step = Plus(x, -gradient) failed"))?;

    let projected_gradient = x - projected_gradient_step;
    Ok(GradientNorms::of(&projected_gradient))
}

/// [`Evaluator`] over a borrowed [`GradientProblem`].
///
/// A gradient problem has a single scalar residual (the cost) and no Jacobian.
#[derive(Debug)]
pub struct GradientProblemEvaluator<'a, T: Scalar> {
    problem: &'a GradientProblem<T>,
    execution_summary: ExecutionSummary,
}

impl<'a, T: Scalar> GradientProblemEvaluator<'a, T> {
    /// Creates an evaluator for `problem`.
    pub fn new(problem: &'a GradientProblem<T>) -> Self {
        Self {
            problem,
            execution_summary: ExecutionSummary::new(),
        }
    }

    /// The wrapped problem.
    pub fn problem(&self) -> &GradientProblem<T> {
        self.problem
    }
}

impl<T: Scalar> Evaluator<T> for GradientProblemEvaluator<'_, T> {
    fn create_jacobian(&self) -> Option<DMatrix<T>> {
        None
    }

    /// Evaluates cost and tangent-space gradient; `residuals` is left untouched.
    ///
    /// # Panics
    ///
    /// Panics if a Jacobian is requested, or if `gradient` does not have
    /// `num_effective_parameters()` entries.
    fn evaluate(
        &self,
        _options: &EvaluateOptions,
        state: &DVector<T>,
        _residuals: Option<&mut DVector<T>>,
        gradient: Option<&mut DVector<T>>,
        jacobian: Option<&mut DMatrix<T>>,
    ) -> Result<T> {
        assert!(jacobian.is_none(), "a gradient problem has no Jacobian");
        let _total_timer = ScopedExecutionTimer::new(TOTAL_EVALUATION, &self.execution_summary);
        let _call_type_timer = ScopedExecutionTimer::new(
            if gradient.is_none() {
                RESIDUAL_EVALUATION
            } else {
                JACOBIAN_EVALUATION
            },
            &self.execution_summary,
        );
        self.problem.evaluate_local(state, gradient)
    }

    fn plus(&self, state: &DVector<T>, delta: &DVector<T>, state_plus_delta: &mut DVector<T>) -> Result<()> {
        self.problem.plus(state, delta, state_plus_delta)
    }

    fn evaluate_gradient_norms(&self, x: &DVector<T>, gradient: &DVector<T>) -> Result<GradientNorms<T>> {
        match self.problem.evaluate_gradient_norms(x, gradient) {
            Some(norms) => Ok(norms),
            None => default_gradient_norms(self, x, gradient),
        }
    }

    fn next_direction(
        &self,
        request: &DirectionRequest<'_, T>,
        history: &mut dyn CurvatureHistory<T>,
        approximate_eigenvalue_scale: &mut T,
        search_direction: &mut DVector<T>,
    ) -> SolverResult<T> {
        match self
            .problem
            .next_direction(request, history, approximate_eigenvalue_scale, search_direction)
        {
            Some(result) => result,
            None => two_loop_direction(request, history, approximate_eigenvalue_scale, search_direction),
        }
    }

    fn num_parameters(&self) -> usize {
        self.problem.num_parameters()
    }

    fn num_effective_parameters(&self) -> usize {
        self.problem.num_local_parameters()
    }

    fn num_residuals(&self) -> usize {
        1
    }

    fn statistics(&self) -> BTreeMap<String, CallStatistics> {
        self.execution_summary.statistics()
    }
}
