//! Position estimation algorithms

pub mod error;
pub mod objective;
pub mod minimizer;
pub mod levenberg_marquardt;
pub mod nelder_mead;
pub mod estimator;

pub use error::{EstimationError, EstimationResult};
pub use objective::{LeastSquaresObjective, RangeObjective};
pub use minimizer::{Minimizer, SolverConfig, SolverMethod};
pub use levenberg_marquardt::LevenbergMarquardt;
pub use nelder_mead::NelderMead;
pub use estimator::PositionEstimator;
