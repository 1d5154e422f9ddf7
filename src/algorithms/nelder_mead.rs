//! Derivative-free simplex minimizer
//!
//! Only evaluates the objective's cost, so it tolerates the kinks the range
//! residuals have on top of each beacon.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{EstimationError, EstimationResult};
use super::minimizer::Minimizer;
use super::objective::LeastSquaresObjective;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMead {
    pub max_iterations: usize,
    /// Edge length of the starting simplex, in metres
    pub initial_step: f64,
    /// Stop once every vertex is this close to the best one
    pub x_tolerance: f64,
    /// ...and the value spread is below this, relative to the best value
    pub f_tolerance: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            initial_step: 0.5,
            x_tolerance: 1e-9,
            f_tolerance: 1e-12,
        }
    }
}

impl NelderMead {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy)]
struct Vertex {
    point: Vector2<f64>,
    value: f64,
}

impl Minimizer for NelderMead {
    fn minimize(
        &self,
        objective: &dyn LeastSquaresObjective,
        initial_guess: Vector2<f64>,
    ) -> EstimationResult<Vector2<f64>> {
        let vertex = |point: Vector2<f64>| Vertex {
            point,
            value: objective.cost(&point),
        };

        let mut simplex = [
            vertex(initial_guess),
            vertex(initial_guess + Vector2::new(self.initial_step, 0.0)),
            vertex(initial_guess + Vector2::new(0.0, self.initial_step)),
        ];

        for iteration in 0..self.max_iterations {
            simplex.sort_by(|a, b| a.value.total_cmp(&b.value));
            let [best, middle, worst] = simplex;

            let spread = worst.value - best.value;
            let diameter = (middle.point - best.point)
                .norm()
                .max((worst.point - best.point).norm());
            if spread <= self.f_tolerance * (1.0 + best.value.abs()) && diameter <= self.x_tolerance {
                debug!(iterations = iteration, cost = best.value, "nelder-mead converged");
                return Ok(best.point);
            }

            let centroid = (best.point + middle.point) / 2.0;
            let reflected = vertex(centroid + REFLECTION * (centroid - worst.point));

            if reflected.value < best.value {
                let expanded = vertex(centroid + EXPANSION * (reflected.point - centroid));
                simplex[2] = if expanded.value < reflected.value { expanded } else { reflected };
            } else if reflected.value < middle.value {
                simplex[2] = reflected;
            } else {
                let contracted = if reflected.value < worst.value {
                    let outside = vertex(centroid + CONTRACTION * (reflected.point - centroid));
                    (outside.value <= reflected.value).then_some(outside)
                } else {
                    let inside = vertex(centroid + CONTRACTION * (worst.point - centroid));
                    (inside.value < worst.value).then_some(inside)
                };

                match contracted {
                    Some(contracted) => simplex[2] = contracted,
                    None => {
                        for v in simplex.iter_mut().skip(1) {
                            *v = vertex(best.point + SHRINK * (v.point - best.point));
                        }
                    }
                }
            }
        }

        Err(EstimationError::NotConverged {
            iterations: self.max_iterations,
        })
    }
}
