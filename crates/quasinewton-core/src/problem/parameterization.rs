//! Local parameterizations.
//!
//! A [`LocalParameterization`] describes how a parameter block living in an
//! ambient space of size `n` moves along a manifold whose tangent space has
//! size `m ≤ n`. Optimization steps are taken in the tangent space and mapped
//! back onto the manifold with [`LocalParameterization::plus`].
//!
//! # Mathematical Background
//!
//! - **Plus**: `⊞(x, δ)` with `⊞(x, 0) = x`
//! - **Jacobian**: `J(x) = ∂⊞(x, δ)/∂δ` at `δ = 0`, an `n × m` matrix
//! - **Local gradient**: `Jᵀ ∇f(x)`, the gradient of `δ ↦ f(⊞(x, δ))` at zero

use crate::{
    error::Result,
    types::{DMatrix, DVector, Scalar},
};
use std::fmt::Debug;

/// Trait for local parameterizations of a parameter block.
pub trait LocalParameterization<T: Scalar>: Debug + Send + Sync {
    /// Writes `⊞(x, delta)` into `x_plus_delta`.
    ///
    /// `x` and `x_plus_delta` have ambient size, `delta` has tangent size.
    /// Fails only on numerical breakdown.
    fn plus(&self, x: &DVector<T>, delta: &DVector<T>, x_plus_delta: &mut DVector<T>)
        -> Result<()>;

    /// Returns the `n × m` Jacobian of `plus(x, ·)` at zero.
    fn compute_jacobian(&self, x: &DVector<T>) -> Result<DMatrix<T>>;

    /// Ambient size `n`.
    fn num_parameters(&self) -> usize;

    /// Tangent size `m`.
    fn num_local_parameters(&self) -> usize;

    /// Returns `global_matrix * J(x)`.
    ///
    /// `global_matrix` has `n` columns; the result has `m`.
    fn multiply_by_jacobian(&self, x: &DVector<T>, global_matrix: &DMatrix<T>) -> Result<DMatrix<T>> {
        let jacobian = self.compute_jacobian(x)?;
        Ok(global_matrix * jacobian)
    }
}
