//! L-BFGS search directions for line-search minimizers.
//!
//! [`Lbfgs`] is the state a line-search minimizer carries between iterations
//! to produce quasi-Newton directions: a ring-buffer [`LbfgsHistory`], the
//! approximate eigenvalue scale of the inverse Hessian, and the previous
//! direction and gradient. Each call folds the last accepted step into the
//! history and asks the evaluator for the next direction, so problems that
//! compute directions themselves (for example on a GPU) are honored.
//!
//! ## Two-Loop Recursion Algorithm
//!
//! ```text
//! q = g_k
//! for i = k-1, k-2, ..., k-m:
//!     α_i = <s_i, q> / <s_i, y_i>
//!     q = q - α_i * y_i
//!
//! r = γ_k * q  // γ_k = <s_{k-1}, y_{k-1}> / <y_{k-1}, y_{k-1}> when scaling
//!
//! for i = k-m, k-m+1, ..., k-1:
//!     β = <y_i, r> / <s_i, y_i>
//!     r = r + (α_i - β) * s_i
//!
//! return -r  // Search direction
//! ```
//!
//! When the update breaks down the history is dropped and the minimizer gets
//! a steepest-descent direction instead.
//!
//! # References
//!
//! - Nocedal & Wright, "Numerical Optimization" (2006)

use crate::history::LbfgsHistory;
use num_traits::Float;
use quasinewton_core::{
    direction::{DirectionRequest, PreviousIterate},
    error::{SolverError, SolverResult},
    evaluator::Evaluator,
    types::{DVector, Scalar},
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the L-BFGS direction driver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LbfgsConfig<T: Scalar> {
    /// Number of curvature pairs to store (the rank of the approximation)
    pub memory_size: usize,
    /// Scale the initial inverse Hessian by `<s, y> / <y, y>` of the newest pair
    pub use_approximate_eigenvalue_scaling: bool,
    /// Pairs with `<s, y>` at or below this value are skipped
    pub secant_tolerance: T,
}

impl<T: Scalar> Default for LbfgsConfig<T> {
    fn default() -> Self {
        Self {
            memory_size: 20,
            use_approximate_eigenvalue_scaling: false,
            secant_tolerance: T::SECANT_TOLERANCE,
        }
    }
}

impl<T: Scalar> LbfgsConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the memory size (number of curvature pairs to store).
    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    /// Enables or disables approximate eigenvalue scaling.
    pub fn with_approximate_eigenvalue_scaling(mut self, enabled: bool) -> Self {
        self.use_approximate_eigenvalue_scaling = enabled;
        self
    }

    /// Sets the secant tolerance.
    pub fn with_secant_tolerance(mut self, tolerance: T) -> Self {
        self.secant_tolerance = tolerance;
        self
    }

    /// Checks the configuration.
    pub fn validate(&self) -> SolverResult<()> {
        if self.memory_size == 0 {
            return Err(SolverError::invalid_configuration(
                "memory size must be at least 1",
                "memory_size",
                self.memory_size.to_string(),
            ));
        }
        if !<T as Float>::is_finite(self.secant_tolerance) || self.secant_tolerance < T::zero() {
            return Err(SolverError::invalid_configuration(
                "secant tolerance must be finite and non-negative",
                "secant_tolerance",
                self.secant_tolerance.to_string(),
            ));
        }
        Ok(())
    }
}

/// L-BFGS direction driver.
///
/// # Examples
///
/// ```rust
/// use quasinewton_core::prelude::*;
/// use quasinewton_optim::{Lbfgs, LbfgsConfig};
///
/// #[derive(Debug)]
/// struct Paraboloid;
///
/// impl FirstOrderFunction<f64> for Paraboloid {
///     fn evaluate(&self, x: &DVector<f64>, gradient: Option<&mut DVector<f64>>) -> Result<f64> {
///         if let Some(g) = gradient {
///             g.copy_from(&(x * 2.0));
///         }
///         Ok(x.norm_squared())
///     }
///
///     fn num_parameters(&self) -> usize {
///         2
///     }
/// }
///
/// let problem = GradientProblem::new(Box::new(Paraboloid));
/// let evaluator = GradientProblemEvaluator::new(&problem);
/// let mut lbfgs = Lbfgs::new(LbfgsConfig::new().with_memory_size(5), 2).unwrap();
///
/// let x = DVector::from_vec(vec![3.0, 4.0]);
/// let mut gradient = DVector::zeros(2);
/// evaluator.evaluate(&EvaluateOptions::default(), &x, None, Some(&mut gradient), None).unwrap();
///
/// let mut direction = DVector::zeros(2);
/// let dot = lbfgs.next_direction(&evaluator, &gradient, None, &mut direction).unwrap();
/// assert_eq!(dot, -100.0);
/// ```
#[derive(Debug, Clone)]
pub struct Lbfgs<T: Scalar> {
    config: LbfgsConfig<T>,
    history: LbfgsHistory<T>,
    approximate_eigenvalue_scale: T,
    previous_direction: Option<DVector<T>>,
    previous_gradient: Option<DVector<T>>,
}

impl<T: Scalar> Lbfgs<T> {
    /// Creates a driver for tangent vectors of size `dim`.
    ///
    /// # Errors
    /// Returns [`SolverError::InvalidConfiguration`] if `config` is invalid.
    pub fn new(config: LbfgsConfig<T>, dim: usize) -> SolverResult<Self> {
        config.validate()?;
        let history = LbfgsHistory::new(dim, config.memory_size, config.secant_tolerance);
        Ok(Self {
            config,
            history,
            approximate_eigenvalue_scale: T::one(),
            previous_direction: None,
            previous_gradient: None,
        })
    }

    /// Creates a driver sized for the evaluator's tangent space.
    pub fn for_evaluator<E>(config: LbfgsConfig<T>, evaluator: &E) -> SolverResult<Self>
    where
        E: Evaluator<T> + ?Sized,
    {
        Self::new(config, evaluator.num_effective_parameters())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LbfgsConfig<T> {
        &self.config
    }

    /// Returns the curvature history.
    pub fn history(&self) -> &LbfgsHistory<T> {
        &self.history
    }

    /// Current estimate of the inverse Hessian scale.
    pub fn approximate_eigenvalue_scale(&self) -> T {
        self.approximate_eigenvalue_scale
    }

    /// Forgets the history and the previous iterate.
    pub fn reset(&mut self) {
        self.history.clear();
        self.approximate_eigenvalue_scale = T::one();
        self.previous_direction = None;
        self.previous_gradient = None;
    }

    /// Computes the search direction at the current point.
    ///
    /// `previous_step_size` is the step accepted along the previously returned
    /// direction, or `None` to skip the curvature update (first iteration,
    /// rejected step). Returns `search_direction · current_gradient`.
    ///
    /// If the update breaks down, the history is reset and the steepest-descent
    /// direction is returned instead.
    ///
    /// # Errors
    /// Fails only when even steepest descent is not a descent direction, which
    /// happens at a stationary point or for a non-finite gradient.
    ///
    /// # Panics
    /// Panics if `current_gradient` or `search_direction` does not have the
    /// history's dimension.
    pub fn next_direction<E>(
        &mut self,
        evaluator: &E,
        current_gradient: &DVector<T>,
        previous_step_size: Option<T>,
        search_direction: &mut DVector<T>,
    ) -> SolverResult<T>
    where
        E: Evaluator<T> + ?Sized,
    {
        assert_eq!(
            current_gradient.len(),
            self.history.dim(),
            "gradient and L-BFGS history dimensions differ"
        );

        let previous = match (
            previous_step_size,
            self.previous_direction.as_ref(),
            self.previous_gradient.as_ref(),
        ) {
            (Some(step_size), Some(direction), Some(gradient)) => Some(PreviousIterate {
                search_direction: direction,
                step_size,
                gradient,
            }),
            _ => None,
        };
        let request = DirectionRequest {
            previous,
            current_gradient,
            use_approximate_eigenvalue_scaling: self.config.use_approximate_eigenvalue_scaling,
        };

        let result = evaluator.next_direction(
            &request,
            &mut self.history,
            &mut self.approximate_eigenvalue_scale,
            search_direction,
        );

        let directional_derivative = match result {
            Ok(directional_derivative) => directional_derivative,
            Err(err) => {
                log::warn!(
                    "L-BFGS direction update failed ({}), restarting from steepest descent",
                    err
                );
                self.reset();
                search_direction.copy_from(current_gradient);
                search_direction.neg_mut();
                let directional_derivative = -current_gradient.norm_squared();
                if !<T as Float>::is_finite(directional_derivative)
                    || directional_derivative >= T::zero()
                {
                    return Err(err);
                }
                directional_derivative
            }
        };

        self.remember(search_direction, current_gradient);
        Ok(directional_derivative)
    }

    fn remember(&mut self, search_direction: &DVector<T>, gradient: &DVector<T>) {
        match &mut self.previous_direction {
            Some(previous) => previous.copy_from(search_direction),
            None => self.previous_direction = Some(search_direction.clone()),
        }
        match &mut self.previous_gradient {
            Some(previous) => previous.copy_from(gradient),
            None => self.previous_gradient = Some(gradient.clone()),
        }
    }
}
