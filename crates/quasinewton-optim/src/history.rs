//! Ring buffer of L-BFGS curvature pairs.
//!
//! Pairs live in the columns of two `dim × memory_size` matrices and a dot
//! product vector. Column `start` holds the oldest pair; inserting into a full
//! buffer overwrites it and advances `start`, so no data is ever shifted.

use num_traits::Float;
#[cfg(feature = "serde")]
use quasinewton_core::error::{SolverError, SolverResult};
use quasinewton_core::{
    direction::{CurvatureHistory, ReadSlot, WriteSlot},
    types::{DMatrix, DVector, Scalar},
};

/// Fixed-capacity curvature history for the two-loop recursion.
///
/// Deserialization checks the buffer layout and rejects inconsistent data.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LbfgsHistory<T: Scalar> {
    /// Position differences, one per column.
    delta_x: DMatrix<T>,
    /// Gradient differences, one per column.
    delta_gradient: DMatrix<T>,
    /// `delta_x · delta_gradient` per column.
    delta_x_dot_delta_gradient: DVector<T>,
    /// Physical column of the oldest pair.
    start: usize,
    /// Number of valid pairs.
    len: usize,
    /// Pairs with curvature at or below this value are rejected.
    secant_tolerance: T,
    /// Two-loop coefficients, reserved for `capacity` pairs.
    #[cfg_attr(feature = "serde", serde(skip))]
    coefficients: Vec<T>,
}

impl<T: Scalar> LbfgsHistory<T> {
    /// Creates an empty history for tangent vectors of size `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `memory_size` is zero.
    pub fn new(dim: usize, memory_size: usize, secant_tolerance: T) -> Self {
        assert!(memory_size > 0, "L-BFGS memory size must be positive");
        Self {
            delta_x: DMatrix::zeros(dim, memory_size),
            delta_gradient: DMatrix::zeros(dim, memory_size),
            delta_x_dot_delta_gradient: DVector::zeros(memory_size),
            start: 0,
            len: 0,
            secant_tolerance,
            coefficients: Vec::with_capacity(memory_size),
        }
    }

    /// Rebuilds a history from its stored parts.
    #[cfg(feature = "serde")]
    fn from_parts(
        delta_x: DMatrix<T>,
        delta_gradient: DMatrix<T>,
        delta_x_dot_delta_gradient: DVector<T>,
        start: usize,
        len: usize,
        secant_tolerance: T,
    ) -> SolverResult<Self> {
        let capacity = delta_x.ncols();
        if capacity == 0 {
            return Err(SolverError::invalid_configuration(
                "history must hold at least one pair",
                "delta_x",
                format!("{} x {}", delta_x.nrows(), capacity),
            ));
        }
        if delta_gradient.shape() != delta_x.shape() {
            return Err(SolverError::invalid_configuration(
                "delta_x and delta_gradient shapes differ",
                "delta_gradient",
                format!("{} x {}", delta_gradient.nrows(), delta_gradient.ncols()),
            ));
        }
        if delta_x_dot_delta_gradient.len() != capacity {
            return Err(SolverError::invalid_configuration(
                "one curvature value per column is required",
                "delta_x_dot_delta_gradient",
                delta_x_dot_delta_gradient.len().to_string(),
            ));
        }
        if start >= capacity {
            return Err(SolverError::invalid_configuration(
                "start must index a column",
                "start",
                start.to_string(),
            ));
        }
        if len > capacity {
            return Err(SolverError::invalid_configuration(
                "more pairs than columns",
                "len",
                len.to_string(),
            ));
        }
        if !<T as Float>::is_finite(secant_tolerance) || secant_tolerance < T::zero() {
            return Err(SolverError::invalid_configuration(
                "secant tolerance must be finite and non-negative",
                "secant_tolerance",
                secant_tolerance.to_string(),
            ));
        }

        let history = Self {
            delta_x,
            delta_gradient,
            delta_x_dot_delta_gradient,
            start,
            len,
            secant_tolerance,
            coefficients: Vec::with_capacity(capacity),
        };
        if let Some(pair) = history.pairs().find(|pair| {
            <T as Float>::is_nan(pair.delta_x_dot_delta_gradient)
                || pair.delta_x_dot_delta_gradient <= secant_tolerance
        }) {
            return Err(SolverError::invalid_configuration(
                "stored curvature must exceed the secant tolerance",
                "delta_x_dot_delta_gradient",
                pair.delta_x_dot_delta_gradient.to_string(),
            ));
        }
        Ok(history)
    }

    /// Maximum number of pairs.
    pub fn capacity(&self) -> usize {
        self.delta_x.ncols()
    }

    /// Size of the stored vectors.
    pub fn dim(&self) -> usize {
        self.delta_x.nrows()
    }

    /// Smallest curvature that is still rejected.
    pub fn secant_tolerance(&self) -> T {
        self.secant_tolerance
    }

    /// Forgets every pair. Storage is kept.
    pub fn clear(&mut self) {
        self.start = 0;
        self.len = 0;
    }

    /// Stored pairs, oldest first.
    pub fn pairs(&self) -> impl Iterator<Item = ReadSlot<'_, T>> + '_ {
        (0..self.len).filter_map(move |index| self.acquire_read_slot(index))
    }

    fn column(&self, index: usize) -> usize {
        (self.start + index) % self.capacity()
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for LbfgsHistory<T>
where
    T: Scalar + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct Parts<T: Scalar> {
            delta_x: DMatrix<T>,
            delta_gradient: DMatrix<T>,
            delta_x_dot_delta_gradient: DVector<T>,
            start: usize,
            len: usize,
            secant_tolerance: T,
        }

        let parts = <Parts<T> as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_parts(
            parts.delta_x,
            parts.delta_gradient,
            parts.delta_x_dot_delta_gradient,
            parts.start,
            parts.len,
            parts.secant_tolerance,
        )
        .map_err(serde::de::Error::custom)
    }
}

impl<T: Scalar> CurvatureHistory<T> for LbfgsHistory<T> {
    fn len(&self) -> usize {
        self.len
    }

    fn acquire_write_slot(&mut self, delta_x_dot_delta_gradient: T) -> Option<WriteSlot<'_, T>> {
        if <T as Float>::is_nan(delta_x_dot_delta_gradient)
            || delta_x_dot_delta_gradient <= self.secant_tolerance
        {
            return None;
        }

        let col = if self.len == self.capacity() {
            let oldest = self.start;
            self.start = (self.start + 1) % self.capacity();
            oldest
        } else {
            self.len += 1;
            self.column(self.len - 1)
        };

        Some(WriteSlot {
            delta_x: self.delta_x.column_mut(col),
            delta_gradient: self.delta_gradient.column_mut(col),
            delta_x_dot_delta_gradient: &mut self.delta_x_dot_delta_gradient[col],
        })
    }

    fn acquire_read_slot(&self, index: usize) -> Option<ReadSlot<'_, T>> {
        if index >= self.len {
            return None;
        }
        let col = self.column(index);
        Some(ReadSlot {
            delta_x: self.delta_x.column(col),
            delta_gradient: self.delta_gradient.column(col),
            delta_x_dot_delta_gradient: self.delta_x_dot_delta_gradient[col],
        })
    }

    fn coefficient_buffer(&mut self) -> Option<&mut Vec<T>> {
        Some(&mut self.coefficients)
    }
}
