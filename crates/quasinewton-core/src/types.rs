//! Type definitions and aliases for gradient-based optimization.
//!
//! This module provides the scalar trait shared by every crate in the
//! workspace, nalgebra aliases for the vectors and column views that flow
//! through the evaluator, and the numerical constants used by the
//! limited-memory direction update.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar, U1};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the necessary numeric traits required by the
/// objective, the parameterizations and the two-loop recursion.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Smallest curvature `delta_x · delta_gradient` accepted into an
    /// L-BFGS history. Pairs at or below this value are skipped.
    const SECANT_TOLERANCE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_to_f64` for a non-panicking version.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Try to convert to f64.
    fn try_to_f64(self) -> Option<f64> {
        num_traits::cast(self)
    }
}

impl Scalar for f32 {
    const SECANT_TOLERANCE: Self = 1e-7;
}

impl Scalar for f64 {
    const SECANT_TOLERANCE: Self = 1e-14;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Read-only view of one column of a [`DMatrix`].
pub type ColumnView<'a, T> = nalgebra::DVectorView<'a, T, U1, Dyn>;

/// Mutable view of one column of a [`DMatrix`].
pub type ColumnViewMut<'a, T> = nalgebra::DVectorViewMut<'a, T, U1, Dyn>;

/// Returns `true` when every entry of `values` is finite.
pub fn all_finite<T: Scalar>(values: &[T]) -> bool {
    values.iter().all(|v| <T as Float>::is_finite(*v))
}
