//! Limited-memory quasi-Newton direction update.
//!
//! The two-loop recursion applies an implicit L-BFGS inverse Hessian
//! approximation to the current gradient without ever forming a matrix. The
//! recursion does not own its curvature history: it reaches the stored pairs
//! through a [`CurvatureHistory`], so the caller decides how the pairs are laid
//! out (ring buffer, compacted columns, device memory).
//!
//! ```text
//! s = step * previous_direction, y = g - previous_g
//! if s·y > 0: store (s, y, s·y)
//!
//! q = g
//! for i = newest .. oldest:
//!     α_i = <s_i, q> / <s_i, y_i>
//!     q = q - α_i * y_i
//!
//! q = γ * q                         // γ = <s, y> / <y, y> of the newest pair
//!
//! for i = oldest .. newest:
//!     β = <y_i, q> / <s_i, y_i>
//!     q = q + (α_i - β) * s_i
//!
//! direction = -q
//! ```

use crate::{
    error::{SolverError, SolverResult},
    types::{all_finite, ColumnView, ColumnViewMut, DVector, Scalar},
};
use num_traits::Float;

/// Destinations for a newly accepted curvature pair.
///
/// Obtaining a slot commits the insertion: the history counts the pair as
/// stored, and the recursion must fill every field before it returns.
#[derive(Debug)]
pub struct WriteSlot<'a, T: Scalar> {
    /// Column receiving `delta_x`.
    pub delta_x: ColumnViewMut<'a, T>,
    /// Column receiving `delta_gradient`.
    pub delta_gradient: ColumnViewMut<'a, T>,
    /// Cell receiving `delta_x · delta_gradient`.
    pub delta_x_dot_delta_gradient: &'a mut T,
}

/// Read-only access to one stored curvature pair.
#[derive(Debug)]
pub struct ReadSlot<'a, T: Scalar> {
    /// Stored position difference.
    pub delta_x: ColumnView<'a, T>,
    /// Stored gradient difference.
    pub delta_gradient: ColumnView<'a, T>,
    /// Precomputed `delta_x · delta_gradient`.
    pub delta_x_dot_delta_gradient: T,
}

/// Caller-owned storage of curvature pairs.
///
/// Pairs are indexed chronologically: `0` is the oldest valid pair and
/// `len() - 1` the newest.
pub trait CurvatureHistory<T: Scalar> {
    /// Number of valid pairs currently stored.
    fn len(&self) -> usize;

    /// Returns `true` if no pair is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserves storage for a new pair with the given curvature
    /// `delta_x · delta_gradient`.
    ///
    /// Returns `None` when the pair must not be stored. Implementations reject
    /// every non-positive curvature; a full history evicts its oldest pair.
    fn acquire_write_slot(&mut self, delta_x_dot_delta_gradient: T) -> Option<WriteSlot<'_, T>>;

    /// Returns the pair at chronological position `index`, or `None` if no
    /// valid pair lives there.
    fn acquire_read_slot(&self, index: usize) -> Option<ReadSlot<'_, T>>;

    /// Storage for the per-pair coefficients of the recursion, kept between
    /// calls.
    ///
    /// The recursion takes the buffer for one call and puts it back before
    /// returning. Without one, every call allocates its own.
    fn coefficient_buffer(&mut self) -> Option<&mut Vec<T>> {
        None
    }
}

/// The iterate that produced the current point.
#[derive(Debug, Clone, Copy)]
pub struct PreviousIterate<'a, T: Scalar> {
    /// Search direction taken from the previous point.
    pub search_direction: &'a DVector<T>,
    /// Step size accepted along `search_direction`.
    pub step_size: T,
    /// Gradient at the previous point.
    pub gradient: &'a DVector<T>,
}

/// Inputs of one direction update.
#[derive(Debug, Clone, Copy)]
pub struct DirectionRequest<'a, T: Scalar> {
    /// Previous iterate, `None` on the first iteration or after a restart.
    pub previous: Option<PreviousIterate<'a, T>>,
    /// Gradient at the current point.
    pub current_gradient: &'a DVector<T>,
    /// Precondition the recursion with `<s, y> / <y, y>` of the newest pair.
    pub use_approximate_eigenvalue_scaling: bool,
}

impl<'a, T: Scalar> DirectionRequest<'a, T> {
    /// Request for a first iteration (no curvature update).
    pub fn first(current_gradient: &'a DVector<T>, use_approximate_eigenvalue_scaling: bool) -> Self {
        Self {
            previous: None,
            current_gradient,
            use_approximate_eigenvalue_scaling,
        }
    }

    /// Request that folds the step from `previous` into the history first.
    pub fn after_step(
        previous: PreviousIterate<'a, T>,
        current_gradient: &'a DVector<T>,
        use_approximate_eigenvalue_scaling: bool,
    ) -> Self {
        Self {
            previous: Some(previous),
            current_gradient,
            use_approximate_eigenvalue_scaling,
        }
    }
}

/// Computes the next L-BFGS search direction.
///
/// Writes the direction into `search_direction` and returns
/// `search_direction · current_gradient`, which is strictly negative on
/// success. `approximate_eigenvalue_scale` is read when scaling is enabled and
/// refreshed whenever a pair is stored.
///
/// # Errors
///
/// * [`SolverError::NumericalBreakdown`] if a non-finite value is produced.
///   `search_direction` is left in an unspecified state.
/// * [`SolverError::InvalidSearchDirection`] if the result is not a descent
///   direction.
/// * [`SolverError::MissingHistoryPair`] if the history cannot serve an index
///   below its own length.
///
/// # Panics
///
/// Panics if the gradient, the previous iterate and `search_direction` do not
/// share one dimension.
pub fn two_loop_direction<T: Scalar>(
    request: &DirectionRequest<'_, T>,
    history: &mut dyn CurvatureHistory<T>,
    approximate_eigenvalue_scale: &mut T,
    search_direction: &mut DVector<T>,
) -> SolverResult<T> {
    let gradient = request.current_gradient;
    assert_eq!(
        gradient.len(),
        search_direction.len(),
        "search direction and gradient dimensions differ"
    );

    if let Some(previous) = request.previous {
        update_history(
            &previous,
            gradient,
            history,
            approximate_eigenvalue_scale,
            request.use_approximate_eigenvalue_scaling,
        )?;
    }

    let mut alpha = history
        .coefficient_buffer()
        .map(std::mem::take)
        .unwrap_or_default();
    let result = apply_inverse_hessian(
        request,
        &*history,
        *approximate_eigenvalue_scale,
        search_direction,
        &mut alpha,
    );
    if let Some(buffer) = history.coefficient_buffer() {
        *buffer = alpha;
    }
    result
}

/// Runs both passes of the recursion over the stored pairs and writes the
/// negated result.
fn apply_inverse_hessian<T: Scalar>(
    request: &DirectionRequest<'_, T>,
    history: &dyn CurvatureHistory<T>,
    approximate_eigenvalue_scale: T,
    search_direction: &mut DVector<T>,
    alpha: &mut Vec<T>,
) -> SolverResult<T> {
    let gradient = request.current_gradient;
    search_direction.copy_from(gradient);

    let num_corrections = history.len();
    alpha.clear();
    alpha.resize(num_corrections, T::zero());

    for i in (0..num_corrections).rev() {
        let pair = read_pair(history, i, num_corrections)?;
        alpha[i] = pair.delta_x.dot(&*search_direction) / pair.delta_x_dot_delta_gradient;
        search_direction.axpy(-alpha[i], &pair.delta_gradient, T::one());
    }

    if !all_finite(search_direction.as_slice()) {
        return Err(SolverError::numerical_breakdown("backward pass"));
    }

    if request.use_approximate_eigenvalue_scaling {
        *search_direction *= approximate_eigenvalue_scale;
    }

    for (i, alpha_i) in alpha.iter().enumerate() {
        let pair = read_pair(history, i, num_corrections)?;
        let beta = pair.delta_gradient.dot(&*search_direction) / pair.delta_x_dot_delta_gradient;
        search_direction.axpy(*alpha_i - beta, &pair.delta_x, T::one());
    }

    search_direction.neg_mut();

    if !all_finite(search_direction.as_slice()) {
        return Err(SolverError::numerical_breakdown("forward pass"));
    }

    let directional_derivative = search_direction.dot(gradient);
    if !<T as Float>::is_finite(directional_derivative) {
        return Err(SolverError::numerical_breakdown("directional derivative"));
    }
    if directional_derivative >= T::zero() {
        return Err(SolverError::invalid_search_direction(Scalar::to_f64(
            directional_derivative,
        )));
    }

    log::trace!(
        "L-BFGS direction from {} corrections, direction . gradient = {}",
        num_corrections,
        directional_derivative
    );

    Ok(directional_derivative)
}

/// Folds the step that led to the current point into the history.
fn update_history<T: Scalar>(
    previous: &PreviousIterate<'_, T>,
    current_gradient: &DVector<T>,
    history: &mut dyn CurvatureHistory<T>,
    approximate_eigenvalue_scale: &mut T,
    use_approximate_eigenvalue_scaling: bool,
) -> SolverResult<()> {
    assert_eq!(
        previous.search_direction.len(),
        current_gradient.len(),
        "previous search direction and gradient dimensions differ"
    );
    assert_eq!(
        previous.gradient.len(),
        current_gradient.len(),
        "previous and current gradient dimensions differ"
    );

    let delta_x = previous.search_direction * previous.step_size;
    let delta_gradient = current_gradient - previous.gradient;
    let delta_x_dot_delta_gradient = delta_x.dot(&delta_gradient);

    if !<T as Float>::is_finite(delta_x_dot_delta_gradient) {
        return Err(SolverError::numerical_breakdown("curvature pair"));
    }

    // Non-positive curvature would make the implied Hessian indefinite.
    if delta_x_dot_delta_gradient <= T::zero() {
        log::debug!(
            "Skipping L-BFGS update, delta_x . delta_gradient = {} is not positive",
            delta_x_dot_delta_gradient
        );
        return Ok(());
    }

    let Some(slot) = history.acquire_write_slot(delta_x_dot_delta_gradient) else {
        log::debug!(
            "Skipping L-BFGS update, history rejected delta_x . delta_gradient = {}",
            delta_x_dot_delta_gradient
        );
        return Ok(());
    };

    let WriteSlot {
        delta_x: mut delta_x_col,
        delta_gradient: mut delta_gradient_col,
        delta_x_dot_delta_gradient: dot_cell,
    } = slot;
    delta_x_col.copy_from(&delta_x);
    delta_gradient_col.copy_from(&delta_gradient);
    *dot_cell = delta_x_dot_delta_gradient;

    if use_approximate_eigenvalue_scaling {
        *approximate_eigenvalue_scale =
            delta_x_dot_delta_gradient / delta_gradient.norm_squared();
    }

    Ok(())
}

fn read_pair<'h, T: Scalar>(
    history: &'h dyn CurvatureHistory<T>,
    index: usize,
    len: usize,
) -> SolverResult<ReadSlot<'h, T>> {
    history
        .acquire_read_slot(index)
        .ok_or(SolverError::MissingHistoryPair { index, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DMatrix;
    use approx::assert_relative_eq;

    /// Unbounded history that keeps every accepted pair in its own column.
    #[derive(Debug)]
    struct GrowingHistory {
        delta_x: DMatrix<f64>,
        delta_gradient: DMatrix<f64>,
        dots: Vec<f64>,
    }

    impl GrowingHistory {
        fn new(dim: usize, capacity: usize) -> Self {
            Self {
                delta_x: DMatrix::zeros(dim, capacity),
                delta_gradient: DMatrix::zeros(dim, capacity),
                dots: Vec::new(),
            }
        }
    }

    impl CurvatureHistory<f64> for GrowingHistory {
        fn len(&self) -> usize {
            self.dots.len()
        }

        fn acquire_write_slot(&mut self, dot: f64) -> Option<WriteSlot<'_, f64>> {
            if dot <= 0.0 || self.dots.len() == self.delta_x.ncols() {
                return None;
            }
            let col = self.dots.len();
            self.dots.push(0.0);
            Some(WriteSlot {
                delta_x: self.delta_x.column_mut(col),
                delta_gradient: self.delta_gradient.column_mut(col),
                delta_x_dot_delta_gradient: &mut self.dots[col],
            })
        }

        fn acquire_read_slot(&self, index: usize) -> Option<ReadSlot<'_, f64>> {
            let dot = *self.dots.get(index)?;
            Some(ReadSlot {
                delta_x: self.delta_x.column(index),
                delta_gradient: self.delta_gradient.column(index),
                delta_x_dot_delta_gradient: dot,
            })
        }
    }

    /// History that claims a pair it cannot serve.
    #[derive(Default)]
    struct LyingHistory {
        coefficients: Vec<f64>,
    }

    impl CurvatureHistory<f64> for LyingHistory {
        fn len(&self) -> usize {
            1
        }

        fn acquire_write_slot(&mut self, _dot: f64) -> Option<WriteSlot<'_, f64>> {
            None
        }

        fn acquire_read_slot(&self, _index: usize) -> Option<ReadSlot<'_, f64>> {
            None
        }

        fn coefficient_buffer(&mut self) -> Option<&mut Vec<f64>> {
            Some(&mut self.coefficients)
        }
    }

    #[test]
    fn test_empty_history_is_steepest_descent() {
        let gradient = DVector::from_vec(vec![6.0, 8.0]);
        let mut history = GrowingHistory::new(2, 5);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(2);

        let dot = two_loop_direction(
            &DirectionRequest::first(&gradient, true),
            &mut history,
            &mut scale,
            &mut direction,
        )
        .unwrap();

        assert_eq!(direction, DVector::from_vec(vec![-6.0, -8.0]));
        assert_eq!(dot, -100.0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_empty_history_applies_existing_scale() {
        let gradient = DVector::from_vec(vec![1.0, -2.0]);
        let mut history = GrowingHistory::new(2, 5);
        let mut scale = 0.25;
        let mut direction = DVector::zeros(2);

        two_loop_direction(
            &DirectionRequest::first(&gradient, true),
            &mut history,
            &mut scale,
            &mut direction,
        )
        .unwrap();
        assert_relative_eq!(direction, DVector::from_vec(vec![-0.25, 0.5]));

        two_loop_direction(
            &DirectionRequest::first(&gradient, false),
            &mut history,
            &mut scale,
            &mut direction,
        )
        .unwrap();
        assert_relative_eq!(direction, -&gradient);
    }

    #[test]
    fn test_negative_curvature_is_not_stored() {
        // A step along +g where the gradient grows: s . y < 0.
        let previous_direction = DVector::from_vec(vec![1.0, 0.0]);
        let previous_gradient = DVector::from_vec(vec![1.0, 1.0]);
        let gradient = DVector::from_vec(vec![0.0, 1.0]);
        let mut history = GrowingHistory::new(2, 5);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(2);

        let request = DirectionRequest::after_step(
            PreviousIterate {
                search_direction: &previous_direction,
                step_size: 1.0,
                gradient: &previous_gradient,
            },
            &gradient,
            true,
        );
        let dot = two_loop_direction(&request, &mut history, &mut scale, &mut direction).unwrap();

        assert!(history.is_empty());
        assert_eq!(scale, 1.0);
        assert_eq!(dot, -1.0);
    }

    #[test]
    fn test_single_pair_recovers_newton_step_on_isotropic_quadratic() {
        // f(x) = x0^2 + x1^2, Hessian 2I.
        let x0 = DVector::from_vec(vec![3.0, 4.0]);
        let g0 = &x0 * 2.0;
        let d0 = -&g0;
        let step = 0.25;
        let x1 = &x0 + &d0 * step;
        let g1 = &x1 * 2.0;

        let mut history = GrowingHistory::new(2, 5);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(2);
        let request = DirectionRequest::after_step(
            PreviousIterate {
                search_direction: &d0,
                step_size: step,
                gradient: &g0,
            },
            &g1,
            true,
        );
        let dot = two_loop_direction(&request, &mut history, &mut scale, &mut direction).unwrap();

        assert_eq!(history.len(), 1);
        assert_relative_eq!(scale, 0.5, epsilon = 1e-12);
        assert_relative_eq!(direction, -&x1, epsilon = 1e-12);
        assert_relative_eq!(dot, -g1.dot(&x1), epsilon = 1e-12);
    }

    #[test]
    fn test_stored_pair_matches_inputs() {
        let d0 = DVector::from_vec(vec![-1.0, -2.0, 0.5]);
        let g0 = DVector::from_vec(vec![1.0, 2.0, -0.5]);
        let g1 = DVector::from_vec(vec![0.5, 1.0, -0.25]);
        let mut history = GrowingHistory::new(3, 5);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(3);

        let request = DirectionRequest::after_step(
            PreviousIterate {
                search_direction: &d0,
                step_size: 0.5,
                gradient: &g0,
            },
            &g1,
            false,
        );
        two_loop_direction(&request, &mut history, &mut scale, &mut direction).unwrap();

        let pair = history.acquire_read_slot(0).unwrap();
        let expected_dx = &d0 * 0.5;
        let expected_dg = &g1 - &g0;
        assert_relative_eq!(pair.delta_x.clone_owned(), expected_dx);
        assert_relative_eq!(pair.delta_gradient.clone_owned(), expected_dg);
        assert_relative_eq!(pair.delta_x_dot_delta_gradient, expected_dx.dot(&expected_dg));
        // Scaling disabled leaves the estimate untouched.
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn test_non_finite_gradient_reports_breakdown() {
        let gradient = DVector::from_vec(vec![f64::NAN, 1.0]);
        let mut history = GrowingHistory::new(2, 5);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(2);

        let result = two_loop_direction(
            &DirectionRequest::first(&gradient, false),
            &mut history,
            &mut scale,
            &mut direction,
        );
        assert!(matches!(result, Err(SolverError::NumericalBreakdown { .. })));
    }

    #[test]
    fn test_zero_gradient_is_not_a_descent_direction() {
        let gradient = DVector::zeros(2);
        let mut history = GrowingHistory::new(2, 5);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(2);

        let result = two_loop_direction(
            &DirectionRequest::first(&gradient, false),
            &mut history,
            &mut scale,
            &mut direction,
        );
        assert!(matches!(
            result,
            Err(SolverError::InvalidSearchDirection { .. })
        ));
    }

    #[test]
    fn test_missing_pair_is_reported() {
        let gradient = DVector::from_vec(vec![1.0]);
        let mut history = LyingHistory::default();
        let mut scale = 1.0;
        let mut direction = DVector::zeros(1);

        let result = two_loop_direction(
            &DirectionRequest::first(&gradient, false),
            &mut history,
            &mut scale,
            &mut direction,
        );
        assert!(matches!(
            result,
            Err(SolverError::MissingHistoryPair { index: 0, len: 1 })
        ));

        // The coefficient buffer comes back even when the recursion fails.
        assert_eq!(history.coefficients.len(), 1);
    }

    #[test]
    #[should_panic(expected = "dimensions differ")]
    fn test_dimension_mismatch_panics() {
        let gradient = DVector::from_vec(vec![1.0, 2.0]);
        let mut history = GrowingHistory::new(2, 5);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(3);

        let _ = two_loop_direction(
            &DirectionRequest::first(&gradient, false),
            &mut history,
            &mut scale,
            &mut direction,
        );
    }
}
