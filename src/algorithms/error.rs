//! Estimation error types

use thiserror::Error;

/// Failures of a single estimation call. None of these are fatal; the
/// caller is expected to skip the tick and try again later.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    /// Fewer distance constraints than a 2D fix needs
    #[error("insufficient samples: {available} available, {required} required")]
    InsufficientSamples { available: usize, required: usize },
    /// A sample carried a NaN or infinite coordinate or distance
    #[error("sample {index} is not finite")]
    NonFiniteInput { index: usize },
    /// The damped normal equations could not be solved to a finite step
    #[error("singular system at iteration {iteration}")]
    SingularSystem { iteration: usize },
    /// Iteration budget exhausted before any stopping criterion held
    #[error("solver did not converge within {iterations} iterations")]
    NotConverged { iterations: usize },
    /// The solver terminated on a NaN or infinite point
    #[error("solver produced a non-finite point")]
    NonFiniteResult,
}

pub type EstimationResult<T> = Result<T, EstimationError>;
