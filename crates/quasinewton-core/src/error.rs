//! Error types for gradient problems and direction updates.
//!
//! Errors here are recoverable: an objective that cannot be evaluated at a
//! point, a parameterization that breaks down, or a direction update that
//! produced non-finite values. Caller misuse (mismatched dimensions handed to
//! an evaluator, a Jacobian requested from a gradient problem) is reported by
//! panicking instead.

use thiserror::Error;

/// Errors raised while evaluating an objective or applying a parameterization.
#[derive(Debug, Clone, Error)]
pub enum ProblemError {
    /// The objective could not be evaluated at the requested point.
    ///
    /// This is a retryable condition (domain violation, overflow); the
    /// minimizer typically shrinks the step and tries again.
    #[error("Objective evaluation failed: {reason}")]
    EvaluationFailed {
        /// Description of why the evaluation failed
        reason: String,
    },

    /// `Plus(x, delta)` could not be computed.
    #[error("Plus operation failed: {reason}")]
    PlusFailed {
        /// Description of why the step could not be applied
        reason: String,
    },

    /// Dimension mismatch between vectors.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Numerical instability detected.
    #[error("Numerical instability detected: {reason}")]
    NumericalError {
        /// Description of the numerical issue
        reason: String,
    },

    /// Invalid construction parameter.
    #[error("Invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of the invalid parameter
        reason: String,
    },
}

impl ProblemError {
    /// Create an EvaluationFailed error with a custom reason.
    pub fn evaluation_failed<S: Into<String>>(reason: S) -> Self {
        Self::EvaluationFailed {
            reason: reason.into(),
        }
    }

    /// Create a PlusFailed error with a custom reason.
    pub fn plus_failed<S: Into<String>>(reason: S) -> Self {
        Self::PlusFailed {
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a NumericalError with a custom reason.
    pub fn numerical_error<S: Into<String>>(reason: S) -> Self {
        Self::NumericalError {
            reason: reason.into(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter<S: Into<String>>(reason: S) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }
}

/// Errors raised while computing a search direction.
#[derive(Debug, Clone, Error)]
pub enum SolverError {
    /// A non-finite value appeared during the direction update.
    ///
    /// The caller should drop its curvature history and take a
    /// steepest-descent step.
    #[error("Numerical breakdown during {stage}")]
    NumericalBreakdown {
        /// Stage of the update that produced the non-finite value
        stage: String,
    },

    /// The computed direction is not a descent direction.
    #[error("Invalid search direction: not a descent direction (direction . gradient = {directional_derivative})")]
    InvalidSearchDirection {
        /// The offending value of `search_direction · current_gradient`
        directional_derivative: f64,
    },

    /// A curvature history reported fewer pairs than it claims to hold.
    #[error("Curvature history has no pair at index {index} (length {len})")]
    MissingHistoryPair {
        /// Index that was requested
        index: usize,
        /// Length reported by the history
        len: usize,
    },

    /// Invalid solver configuration.
    #[error("Invalid solver configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },
}

impl SolverError {
    /// Create a NumericalBreakdown error for the named stage.
    pub fn numerical_breakdown<S: Into<String>>(stage: S) -> Self {
        Self::NumericalBreakdown {
            stage: stage.into(),
        }
    }

    /// Create an InvalidSearchDirection error.
    pub fn invalid_search_direction(directional_derivative: f64) -> Self {
        Self::InvalidSearchDirection {
            directional_derivative,
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}

/// Result type alias for operations that can produce ProblemError.
pub type Result<T> = std::result::Result<T, ProblemError>;

/// Result type alias for direction updates.
pub type SolverResult<T> = std::result::Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ProblemError::evaluation_failed("log of negative number");
        assert!(matches!(err, ProblemError::EvaluationFailed { .. }));
        assert_eq!(
            err.to_string(),
            "Objective evaluation failed: log of negative number"
        );

        let err = ProblemError::dimension_mismatch(3, 4);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            ProblemError::plus_failed("zero norm"),
            ProblemError::numerical_error("singular"),
            ProblemError::invalid_parameter("empty subset"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_solver_error_creation() {
        let err = SolverError::numerical_breakdown("backward pass");
        assert_eq!(err.to_string(), "Numerical breakdown during backward pass");

        let err = SolverError::invalid_search_direction(0.5);
        assert!(err.to_string().contains("not a descent direction"));

        let err = SolverError::invalid_configuration("must be positive", "memory_size", "0");
        if let SolverError::InvalidConfiguration {
            reason,
            parameter,
            value,
        } = err
        {
            assert_eq!(reason, "must be positive");
            assert_eq!(parameter, "memory_size");
            assert_eq!(value, "0");
        } else {
            panic!("Expected InvalidConfiguration variant");
        }
    }
}
