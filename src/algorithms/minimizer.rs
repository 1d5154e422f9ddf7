//! Solver seam and solver selection

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use super::error::EstimationResult;
use super::levenberg_marquardt::LevenbergMarquardt;
use super::nelder_mead::NelderMead;
use super::objective::LeastSquaresObjective;

/// Local unconstrained minimizer for a 2D least-squares objective.
///
/// Implementations must terminate within a bounded number of iterations and
/// report failure instead of returning a point of unknown quality.
pub trait Minimizer: Send + Sync {
    fn minimize(
        &self,
        objective: &dyn LeastSquaresObjective,
        initial_guess: Vector2<f64>,
    ) -> EstimationResult<Vector2<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolverMethod {
    #[default]
    LevenbergMarquardt,
    NelderMead,
}

/// Solver selection and termination settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub method: SolverMethod,
    /// Iteration budget; `None` uses the method's own default
    pub max_iterations: Option<usize>,
    pub levenberg_marquardt: LevenbergMarquardt,
    pub nelder_mead: NelderMead,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolverMethod::default(),
            max_iterations: None,
            levenberg_marquardt: LevenbergMarquardt::default(),
            nelder_mead: NelderMead::default(),
        }
    }
}

impl SolverConfig {
    pub fn build(&self) -> Box<dyn Minimizer> {
        match self.method {
            SolverMethod::LevenbergMarquardt => {
                let mut solver = self.levenberg_marquardt.clone();
                if let Some(max_iterations) = self.max_iterations {
                    solver.max_iterations = max_iterations;
                }
                Box::new(solver)
            }
            SolverMethod::NelderMead => {
                let mut solver = self.nelder_mead.clone();
                if let Some(max_iterations) = self.max_iterations {
                    solver.max_iterations = max_iterations;
                }
                Box::new(solver)
            }
        }
    }

    pub fn effective_max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or(match self.method {
            SolverMethod::LevenbergMarquardt => self.levenberg_marquardt.max_iterations,
            SolverMethod::NelderMead => self.nelder_mead.max_iterations,
        })
    }
}
