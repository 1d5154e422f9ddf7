//! Multilateration: 2D point from beacon ranges
//!
//! Minimizes `f(p) = Σ (‖p − c_i‖ − d_i)²` starting from the origin of the
//! floor plan. The starting point is fixed on purpose: every call solves from
//! scratch, so identical samples always give an identical answer. Geometries
//! far from the origin can settle in a local minimum; colinear or coincident
//! beacons are not detected and yield whatever compromise the objective
//! favours.

use nalgebra::Vector2;
use tracing::debug;

use super::error::{EstimationError, EstimationResult};
use super::minimizer::{Minimizer, SolverConfig};
use super::objective::RangeObjective;
use crate::core::{PositionEstimate, Sample, MIN_SAMPLES};

pub struct PositionEstimator {
    minimizer: Box<dyn Minimizer>,
}

impl Default for PositionEstimator {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl PositionEstimator {
    /// Estimator with the default Levenberg-Marquardt solver
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_minimizer(minimizer: Box<dyn Minimizer>) -> Self {
        Self { minimizer }
    }

    /// Estimator with the solver selected by `config`
    pub fn from_config(config: &SolverConfig) -> Self {
        Self::with_minimizer(config.build())
    }

    /// Starting point of every solve: the floor-plan origin
    pub fn initial_guess() -> Vector2<f64> {
        Vector2::zeros()
    }

    /// Solve for the point that best fits every sample's range.
    ///
    /// Needs at least three finite samples.
    pub fn estimate(&self, samples: &[Sample]) -> EstimationResult<PositionEstimate> {
        if samples.len() < MIN_SAMPLES {
            return Err(EstimationError::InsufficientSamples {
                available: samples.len(),
                required: MIN_SAMPLES,
            });
        }

        if let Some(index) = samples
            .iter()
            .position(|s| !s.coordinate.is_finite() || !s.distance.is_finite())
        {
            return Err(EstimationError::NonFiniteInput { index });
        }

        let objective = RangeObjective::new(samples);
        let point = self.minimizer.minimize(&objective, Self::initial_guess())?;

        if !(point.x.is_finite() && point.y.is_finite()) {
            return Err(EstimationError::NonFiniteResult);
        }

        debug!(samples = samples.len(), x = point.x, y = point.y, "estimated position");
        Ok(PositionEstimate::from(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{LeastSquaresObjective, NelderMead, SolverMethod};
    use crate::core::Coordinate;

    const TOLERANCE: f64 = 1e-3;

    fn three_beacons() -> Vec<Sample> {
        vec![
            Sample::new(Coordinate::new(0.0, 0.0), 5f64.sqrt()),
            Sample::new(Coordinate::new(4.0, 0.0), 5f64.sqrt()),
            Sample::new(Coordinate::new(0.0, 4.0), 13f64.sqrt()),
        ]
    }

    fn assert_near(point: Coordinate, x: f64, y: f64) {
        assert!(
            (point.x - x).abs() < TOLERANCE && (point.y - y).abs() < TOLERANCE,
            "expected ({}, {}), got ({}, {})",
            x, y, point.x, point.y
        );
    }

    #[test]
    fn test_rejects_fewer_than_three_samples() {
        let estimator = PositionEstimator::new();
        let samples = &three_beacons()[..2];

        assert_eq!(
            estimator.estimate(samples),
            Err(EstimationError::InsufficientSamples { available: 2, required: 3 })
        );
        assert!(estimator.estimate(&[]).is_err());
    }

    #[test]
    fn test_three_exact_ranges() {
        let estimator = PositionEstimator::new();
        assert_near(estimator.estimate(&three_beacons()).unwrap(), 2.0, 1.0);
    }

    #[test]
    fn test_redundant_fourth_beacon_keeps_solution() {
        let estimator = PositionEstimator::new();
        let three = estimator.estimate(&three_beacons()).unwrap();

        let mut four = three_beacons();
        four.push(Sample::new(Coordinate::new(4.0, 4.0), 13f64.sqrt()));
        let with_fourth = estimator.estimate(&four).unwrap();

        assert!(three.distance_to(&with_fourth) < TOLERANCE);
        assert_near(with_fourth, 2.0, 1.0);
    }

    #[test]
    fn test_both_solvers_agree_on_exact_ranges() {
        let config = SolverConfig {
            method: SolverMethod::NelderMead,
            ..Default::default()
        };
        let simplex = PositionEstimator::from_config(&config);
        assert_near(simplex.estimate(&three_beacons()).unwrap(), 2.0, 1.0);
    }

    #[test]
    fn test_coincident_beacons_at_origin_give_trivial_fit() {
        let estimator = PositionEstimator::new();
        let samples = vec![Sample::new(Coordinate::ORIGIN, 0.0); 3];

        assert_eq!(estimator.estimate(&samples), Ok(Coordinate::ORIGIN));
    }

    #[test]
    fn test_coincident_beacons_are_deterministic() {
        let samples = vec![Sample::new(Coordinate::new(1.0, 1.0), 1.0); 3];

        for estimator in [
            PositionEstimator::new(),
            PositionEstimator::with_minimizer(Box::new(NelderMead::new())),
        ] {
            let first = estimator.estimate(&samples).unwrap();
            for _ in 0..5 {
                assert_eq!(estimator.estimate(&samples).unwrap(), first);
            }
            // Any point on the unit circle around the beacon is an exact fit.
            assert!((first.distance_to(&Coordinate::new(1.0, 1.0)) - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_non_finite_distance_is_rejected() {
        let mut samples = three_beacons();
        samples[1].distance = f64::NAN;

        assert_eq!(
            PositionEstimator::new().estimate(&samples),
            Err(EstimationError::NonFiniteInput { index: 1 })
        );
    }

    #[test]
    fn test_noisy_room_matches_simplex_solution() {
        let samples: Vec<Sample> = [
            (0.0, 0.0, 0.911),
            (2.0, 0.0, 1.466),
            (4.0, 0.0, 1.510),
            (0.0, 2.0, 1.837),
            (4.0, 2.0, 2.094),
            (0.0, 4.0, 4.825),
            (2.0, 4.0, 5.554),
            (4.0, 4.0, 3.117),
        ]
        .iter()
        .map(|&(x, y, d)| Sample::new(Coordinate::new(x, y), d))
        .collect();

        let damped = PositionEstimator::new().estimate(&samples).unwrap();
        let simplex = PositionEstimator::with_minimizer(Box::new(NelderMead::new()))
            .estimate(&samples)
            .unwrap();

        assert!(damped.distance_to(&simplex) < 1e-5);
    }

    struct DivergingMinimizer;

    impl Minimizer for DivergingMinimizer {
        fn minimize(
            &self,
            _objective: &dyn LeastSquaresObjective,
            _initial_guess: Vector2<f64>,
        ) -> EstimationResult<Vector2<f64>> {
            Ok(Vector2::new(f64::NAN, 1.0))
        }
    }

    #[test]
    fn test_non_finite_solver_output_is_rejected() {
        let estimator = PositionEstimator::with_minimizer(Box::new(DivergingMinimizer));
        assert_eq!(estimator.estimate(&three_beacons()), Err(EstimationError::NonFiniteResult));
    }
}
