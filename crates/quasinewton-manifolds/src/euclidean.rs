//! Identity parameterization of R^n.

use quasinewton_core::{
    error::{ProblemError, Result},
    problem::LocalParameterization,
    types::{DMatrix, DVector, Scalar},
};

/// Euclidean space R^n, where `⊞(x, δ) = x + δ`.
///
/// A problem built with [`GradientProblem::new`] behaves the same way; this
/// type exists for callers that want every problem to carry an explicit
/// parameterization.
///
/// [`GradientProblem::new`]: quasinewton_core::problem::GradientProblem::new
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Euclidean {
    dim: usize,
}

impl Euclidean {
    /// Creates the identity parameterization of R^`dim`.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl<T: Scalar> LocalParameterization<T> for Euclidean {
    fn plus(&self, x: &DVector<T>, delta: &DVector<T>, x_plus_delta: &mut DVector<T>) -> Result<()> {
        if delta.len() != self.dim {
            return Err(ProblemError::dimension_mismatch(self.dim, delta.len()));
        }
        x_plus_delta.copy_from(x);
        *x_plus_delta += delta;
        Ok(())
    }

    fn compute_jacobian(&self, _x: &DVector<T>) -> Result<DMatrix<T>> {
        Ok(DMatrix::identity(self.dim, self.dim))
    }

    fn num_parameters(&self) -> usize {
        self.dim
    }

    fn num_local_parameters(&self) -> usize {
        self.dim
    }

    fn multiply_by_jacobian(&self, _x: &DVector<T>, global_matrix: &DMatrix<T>) -> Result<DMatrix<T>> {
        Ok(global_matrix.clone())
    }
}
