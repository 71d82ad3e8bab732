//! Gradient problems.
//!
//! A [`GradientProblem`] is a general non-linear optimization problem that is
//! solved using only the value of the objective and its gradient. Unlike a
//! least-squares problem, the objective is not restricted in form.
//!
//! Structurally it is the composition of a [`FirstOrderFunction`], which
//! evaluates cost and gradient, and optionally a [`LocalParameterization`],
//! which moves between the ambient space and the tangent space where steps
//! are taken. Without a parameterization the tangent space coincides with the
//! ambient Euclidean space of the gradient.

use crate::{
    direction::{CurvatureHistory, DirectionRequest},
    error::{ProblemError, Result, SolverResult},
    problem::{objective::GradientNorms, FirstOrderFunction, LocalParameterization},
    types::{DMatrix, DVector, Scalar},
};
use std::cell::RefCell;

/// An objective together with an optional local parameterization.
///
/// The problem owns both parts; dropping it drops them. It keeps a scratch
/// buffer for intermediate gradients and is therefore not `Sync`: calls on one
/// instance must be serialized by the caller.
#[derive(Debug)]
pub struct GradientProblem<T: Scalar> {
    function: Box<dyn FirstOrderFunction<T>>,
    parameterization: Option<Box<dyn LocalParameterization<T>>>,
    scratch: RefCell<DVector<T>>,
}

impl<T: Scalar> GradientProblem<T> {
    /// Creates a Euclidean problem; takes ownership of the function.
    pub fn new(function: Box<dyn FirstOrderFunction<T>>) -> Self {
        let n = function.num_parameters();
        Self {
            function,
            parameterization: None,
            scratch: RefCell::new(DVector::zeros(n)),
        }
    }

    /// Creates a problem on a manifold; takes ownership of both parts.
    ///
    /// # Panics
    ///
    /// Panics if the parameterization's ambient size differs from the
    /// function's parameter count.
    pub fn with_parameterization(
        function: Box<dyn FirstOrderFunction<T>>,
        parameterization: Box<dyn LocalParameterization<T>>,
    ) -> Self {
        let n = function.num_parameters();
        assert_eq!(
            parameterization.num_parameters(),
            n,
            "parameterization ambient size must match the function's parameter count"
        );
        assert!(
            parameterization.num_local_parameters() <= n,
            "tangent size cannot exceed ambient size"
        );
        Self {
            function,
            parameterization: Some(parameterization),
            scratch: RefCell::new(DVector::zeros(n)),
        }
    }

    /// Ambient size `n`.
    pub fn num_parameters(&self) -> usize {
        self.function.num_parameters()
    }

    /// Tangent size `m`; equals `n` without a parameterization.
    pub fn num_local_parameters(&self) -> usize {
        self.parameterization
            .as_ref()
            .map_or_else(|| self.num_parameters(), |p| p.num_local_parameters())
    }

    /// Evaluates cost and (ambient) gradient. Delegates to the function.
    pub fn evaluate(&self, parameters: &DVector<T>, gradient: Option<&mut DVector<T>>) -> Result<T> {
        assert_eq!(parameters.len(), self.num_parameters(), "parameter vector has wrong size");
        self.function.evaluate(parameters, gradient)
    }

    /// Evaluates cost and the gradient in the tangent space at `parameters`.
    pub fn evaluate_local(
        &self,
        parameters: &DVector<T>,
        local_gradient: Option<&mut DVector<T>>,
    ) -> Result<T> {
        let Some(local_gradient) = local_gradient else {
            return self.evaluate(parameters, None);
        };
        if self.parameterization.is_none() {
            return self.evaluate(parameters, Some(local_gradient));
        }

        let mut scratch = self.scratch.borrow_mut();
        let cost = self.evaluate(parameters, Some(&mut *scratch))?;
        self.local_gradient(parameters, &scratch, local_gradient)?;
        Ok(cost)
    }

    /// Maps an ambient gradient at `x` into the tangent space (`Jᵀ g`).
    ///
    /// The gradient goes through
    /// [`LocalParameterization::multiply_by_jacobian`] as a `1 × n` row, so
    /// parameterizations with a structured Jacobian never build it densely.
    pub fn local_gradient(
        &self,
        x: &DVector<T>,
        gradient: &DVector<T>,
        local_gradient: &mut DVector<T>,
    ) -> Result<()> {
        assert_eq!(local_gradient.len(), self.num_local_parameters(), "local gradient has wrong size");
        match &self.parameterization {
            None => local_gradient.copy_from(gradient),
            Some(parameterization) => {
                let gradient_row = DMatrix::from_row_slice(1, gradient.len(), gradient.as_slice());
                let local_row = parameterization.multiply_by_jacobian(x, &gradient_row)?;
                if local_row.len() != local_gradient.len() {
                    return Err(ProblemError::dimension_mismatch(local_gradient.len(), local_row.len()));
                }
                local_gradient.copy_from_slice(local_row.as_slice());
            }
        }
        Ok(())
    }

    /// Writes `⊞(x, delta)`; plain addition without a parameterization.
    pub fn plus(&self, x: &DVector<T>, delta: &DVector<T>, x_plus_delta: &mut DVector<T>) -> Result<()> {
        assert_eq!(delta.len(), self.num_local_parameters(), "delta has wrong size");
        match &self.parameterization {
            Some(parameterization) => parameterization.plus(x, delta, x_plus_delta),
            None => {
                x_plus_delta.copy_from(x);
                *x_plus_delta += delta;
                Ok(())
            }
        }
    }

    /// Forwards to [`FirstOrderFunction::evaluate_gradient_norms`].
    pub fn evaluate_gradient_norms(
        &self,
        x: &DVector<T>,
        gradient: &DVector<T>,
    ) -> Option<GradientNorms<T>> {
        self.function.evaluate_gradient_norms(x, gradient)
    }

    /// Forwards to [`FirstOrderFunction::next_direction`].
    pub fn next_direction(
        &self,
        request: &DirectionRequest<'_, T>,
        history: &mut dyn CurvatureHistory<T>,
        approximate_eigenvalue_scale: &mut T,
        search_direction: &mut DVector<T>,
    ) -> Option<SolverResult<T>> {
        self.function
            .next_direction(request, history, approximate_eigenvalue_scale, search_direction)
    }

    /// The objective.
    pub fn function(&self) -> &dyn FirstOrderFunction<T> {
        self.function.as_ref()
    }

    /// Mutable access to the objective.
    pub fn function_mut(&mut self) -> &mut (dyn FirstOrderFunction<T> + 'static) {
        self.function.as_mut()
    }

    /// The parameterization, if any.
    pub fn parameterization(&self) -> Option<&dyn LocalParameterization<T>> {
        self.parameterization.as_deref()
    }

    /// Mutable access to the parameterization, if any.
    pub fn parameterization_mut(&mut self) -> Option<&mut (dyn LocalParameterization<T> + 'static)> {
        self.parameterization.as_deref_mut()
    }
}
