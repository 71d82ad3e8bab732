//! Homogeneous vectors: points of R^n identified up to their norm.
//!
//! Steps are taken in the (n-1)-dimensional tangent space orthogonal to `x`
//! and mapped back by renormalizing to the norm of `x`. The parameterization
//! therefore keeps a point on the sphere of radius `|x|`, which for unit
//! vectors is the usual unit sphere S^{n-1}.
//!
//! # Mathematical Background
//!
//! The tangent basis `B` is taken from the Householder reflection
//! `H = I - 2 v vᵀ / vᵀv` with `v = x/|x| + sign(x_n) e_n`, which maps
//! `x/|x|` to `∓e_n`. The first `n - 1` columns of `H` are orthonormal and
//! orthogonal to `x`.
//!
//! - **Plus**: `⊞(x, δ) = |x| (x + B δ) / |x + B δ|`
//! - **Jacobian**: `B`

use num_traits::Float;
use quasinewton_core::{
    error::{ProblemError, Result},
    problem::LocalParameterization,
    types::{all_finite, DMatrix, DVector, Scalar},
};

/// Homogeneous vectors in R^n with an (n-1)-dimensional tangent space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sphere {
    /// Ambient dimension (n)
    ambient_dim: usize,
}

impl Sphere {
    /// Creates the parameterization for vectors of R^`ambient_dim`.
    ///
    /// # Errors
    /// Returns an error if `ambient_dim` < 2
    pub fn new(ambient_dim: usize) -> Result<Self> {
        if ambient_dim < 2 {
            return Err(ProblemError::invalid_parameter(
                "Sphere requires ambient dimension >= 2",
            ));
        }
        Ok(Self { ambient_dim })
    }

    /// Returns the ambient dimension (n)
    pub fn ambient_dimension(&self) -> usize {
        self.ambient_dim
    }

    /// Orthonormal basis of the tangent space at `x`, as an `n × (n-1)` matrix.
    ///
    /// # Errors
    /// Fails if `x` is zero or not finite.
    pub fn tangent_basis<T: Scalar>(&self, x: &DVector<T>) -> Result<DMatrix<T>> {
        let n = self.ambient_dim;
        if x.len() != n {
            return Err(ProblemError::dimension_mismatch(n, x.len()));
        }
        let norm = x.norm();
        if !all_finite(x.as_slice()) || norm <= T::zero() {
            return Err(ProblemError::numerical_error(
                "tangent basis requires a finite, non-zero point",
            ));
        }

        let mut v = x / norm;
        // sign(0) = +1 keeps v away from zero.
        if v[n - 1] >= T::zero() {
            v[n - 1] += T::one();
        } else {
            v[n - 1] -= T::one();
        }

        let two = <T as Scalar>::from_f64(2.0);
        let beta = two / v.norm_squared();
        let householder = DMatrix::identity(n, n) - (&v * v.transpose()) * beta;
        Ok(householder.columns(0, n - 1).into_owned())
    }
}

impl<T: Scalar> LocalParameterization<T> for Sphere {
    fn plus(&self, x: &DVector<T>, delta: &DVector<T>, x_plus_delta: &mut DVector<T>) -> Result<()> {
        if delta.len() != self.ambient_dim - 1 {
            return Err(ProblemError::dimension_mismatch(self.ambient_dim - 1, delta.len()));
        }

        if delta.norm_squared() == T::zero() {
            x_plus_delta.copy_from(x);
            return Ok(());
        }

        let basis = self.tangent_basis(x)?;
        let mut y = &basis * delta;
        y += x;

        let y_norm = y.norm();
        if !<T as Float>::is_finite(y_norm) || y_norm <= T::zero() {
            return Err(ProblemError::plus_failed("x + B * delta has no finite, non-zero norm"));
        }

        x_plus_delta.copy_from(&(y * (x.norm() / y_norm)));
        Ok(())
    }

    fn compute_jacobian(&self, x: &DVector<T>) -> Result<DMatrix<T>> {
        self.tangent_basis(x)
    }

    fn num_parameters(&self) -> usize {
        self.ambient_dim
    }

    fn num_local_parameters(&self) -> usize {
        self.ambient_dim - 1
    }
}
