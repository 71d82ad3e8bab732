//! Parameterization holding a subset of coordinates constant.

use quasinewton_core::{
    error::{ProblemError, Result},
    problem::LocalParameterization,
    types::{DMatrix, DVector, Scalar},
};

/// R^n with some coordinates frozen.
///
/// The tangent space consists of the free coordinates, in increasing index
/// order. `plus` adds `delta` to those and copies the constant ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    ambient_dim: usize,
    /// Indices of the free coordinates, sorted.
    free: Vec<usize>,
}

impl Subset {
    /// Creates a subset parameterization of R^`ambient_dim` with the given
    /// coordinates held constant.
    ///
    /// # Errors
    /// Fails on an out-of-range or repeated index, or when no coordinate
    /// remains free.
    pub fn new(ambient_dim: usize, constant_parameters: &[usize]) -> Result<Self> {
        let mut is_constant = vec![false; ambient_dim];
        for &index in constant_parameters {
            if index >= ambient_dim {
                return Err(ProblemError::invalid_parameter(format!(
                    "constant index {} out of range for dimension {}",
                    index, ambient_dim
                )));
            }
            if is_constant[index] {
                return Err(ProblemError::invalid_parameter(format!(
                    "constant index {} given twice",
                    index
                )));
            }
            is_constant[index] = true;
        }

        let free: Vec<usize> = (0..ambient_dim).filter(|&i| !is_constant[i]).collect();
        if free.is_empty() {
            return Err(ProblemError::invalid_parameter(
                "Subset requires at least one free coordinate",
            ));
        }

        Ok(Self { ambient_dim, free })
    }

    /// Indices of the coordinates that move, in tangent order.
    pub fn free_parameters(&self) -> &[usize] {
        &self.free
    }
}

impl<T: Scalar> LocalParameterization<T> for Subset {
    fn plus(&self, x: &DVector<T>, delta: &DVector<T>, x_plus_delta: &mut DVector<T>) -> Result<()> {
        if delta.len() != self.free.len() {
            return Err(ProblemError::dimension_mismatch(self.free.len(), delta.len()));
        }
        x_plus_delta.copy_from(x);
        for (k, &i) in self.free.iter().enumerate() {
            x_plus_delta[i] += delta[k];
        }
        Ok(())
    }

    fn compute_jacobian(&self, _x: &DVector<T>) -> Result<DMatrix<T>> {
        let mut jacobian = DMatrix::zeros(self.ambient_dim, self.free.len());
        for (k, &i) in self.free.iter().enumerate() {
            jacobian[(i, k)] = T::one();
        }
        Ok(jacobian)
    }

    fn num_parameters(&self) -> usize {
        self.ambient_dim
    }

    fn num_local_parameters(&self) -> usize {
        self.free.len()
    }

    fn multiply_by_jacobian(&self, _x: &DVector<T>, global_matrix: &DMatrix<T>) -> Result<DMatrix<T>> {
        Ok(global_matrix.select_columns(self.free.iter()))
    }
}
