//! Levenberg-Marquardt minimizer for 2D range residuals

use nalgebra::{DMatrix, Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::{EstimationError, EstimationResult};
use super::minimizer::Minimizer;
use super::objective::LeastSquaresObjective;

const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e10;

/// Damped Newton iteration with Marquardt diagonal scaling.
///
/// The model Hessian is `JᵀJ` plus the objective's curvature term, so large
/// residuals (noisy ranges) still converge quadratically near the minimum.
/// All stopping tests are relative to the current cost or estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevenbergMarquardt {
    /// Maximum number of iterations before giving up
    pub max_iterations: usize,
    /// Stop when `‖Jᵀr‖ ≤ gradient_tolerance · (1 + √cost)`
    pub gradient_tolerance: f64,
    /// Stop when an accepted step is this small relative to the estimate
    pub step_tolerance: f64,
    /// Stop when an accepted step lowers the cost by less than this fraction
    pub cost_tolerance: f64,
    /// Starting damping factor
    pub initial_damping: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            gradient_tolerance: 1e-8,
            step_tolerance: 1e-10,
            cost_tolerance: 1e-12,
            initial_damping: 1e-3,
        }
    }
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    fn model_hessian(
        objective: &dyn LeastSquaresObjective,
        point: &Vector2<f64>,
        jacobian: &DMatrix<f64>,
    ) -> Matrix2<f64> {
        let jt_j = jacobian.transpose() * jacobian;
        Matrix2::new(jt_j[(0, 0)], jt_j[(0, 1)], jt_j[(1, 0)], jt_j[(1, 1)])
            + objective.curvature(point)
    }
}

impl Minimizer for LevenbergMarquardt {
    fn minimize(
        &self,
        objective: &dyn LeastSquaresObjective,
        initial_guess: Vector2<f64>,
    ) -> EstimationResult<Vector2<f64>> {
        let mut estimate = initial_guess;
        let mut cost = objective.cost(&estimate);
        let mut damping = self.initial_damping;
        let mut nu = 2.0;

        for iteration in 0..self.max_iterations {
            let residuals = objective.residuals(&estimate);
            let jacobian = objective.jacobian(&estimate);

            let jt_r = jacobian.transpose() * &residuals;
            let gradient = Vector2::new(jt_r[0], jt_r[1]);
            if gradient.norm() <= self.gradient_tolerance * (1.0 + cost.sqrt()) {
                debug!(iterations = iteration, cost, "levenberg-marquardt converged on gradient");
                return Ok(estimate);
            }

            let hessian = Self::model_hessian(objective, &estimate, &jacobian);
            let mut damped = hessian;
            for i in 0..2 {
                damped[(i, i)] += damping * (1.0 + hessian[(i, i)].abs());
            }

            let step = damped
                .try_inverse()
                .map(|inverse| inverse * gradient)
                .filter(|step| step.iter().all(|v| v.is_finite()))
                .ok_or(EstimationError::SingularSystem { iteration })?;

            let candidate = estimate - step;
            let candidate_cost = objective.cost(&candidate);
            trace!(iteration, cost, candidate_cost, damping, "levenberg-marquardt step");

            if candidate_cost < cost {
                let improvement = cost - candidate_cost;
                estimate = candidate;
                cost = candidate_cost;
                damping = (damping / 3.0).max(MIN_DAMPING);
                nu = 2.0;

                let small_step =
                    step.norm() <= self.step_tolerance * (estimate.norm() + self.step_tolerance);
                let small_gain = improvement <= self.cost_tolerance * (cost + self.cost_tolerance);
                if small_step || small_gain {
                    debug!(iterations = iteration + 1, cost, "levenberg-marquardt converged");
                    return Ok(estimate);
                }
            } else {
                damping *= nu;
                nu *= 2.0;
                // No descent even along a near-gradient step: numerically at a minimum.
                if damping > MAX_DAMPING {
                    debug!(iterations = iteration + 1, cost, "levenberg-marquardt stalled at minimum");
                    return Ok(estimate);
                }
            }
        }

        Err(EstimationError::NotConverged {
            iterations: self.max_iterations,
        })
    }
}
