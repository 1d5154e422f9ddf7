//! Least-squares objectives handed to a [`Minimizer`](super::Minimizer)

use nalgebra::{DMatrix, DVector, Matrix2, Vector2};

use crate::core::Sample;

/// Ranges closer than this are treated as "on the beacon" and get a zero
/// Jacobian row and no curvature.
const MIN_RANGE: f64 = 1e-12;

/// A sum-of-squares objective `f(p) = Σ r_i(p)²` over a 2D point.
pub trait LeastSquaresObjective {
    fn residuals(&self, point: &Vector2<f64>) -> DVector<f64>;

    /// `n x 2` matrix of `∂r_i/∂p`
    fn jacobian(&self, point: &Vector2<f64>) -> DMatrix<f64>;

    /// Second-order part of the Hessian, `Σ r_i ∇²r_i`. Zero gives plain
    /// Gauss-Newton.
    fn curvature(&self, _point: &Vector2<f64>) -> Matrix2<f64> {
        Matrix2::zeros()
    }

    fn cost(&self, point: &Vector2<f64>) -> f64 {
        let residuals = self.residuals(point);
        residuals.dot(&residuals)
    }
}

/// Range residuals `‖p − c_i‖ − d_i` for a set of beacon samples
pub struct RangeObjective<'a> {
    samples: &'a [Sample],
}

impl<'a> RangeObjective<'a> {
    pub fn new(samples: &'a [Sample]) -> Self {
        Self { samples }
    }
}

impl LeastSquaresObjective for RangeObjective<'_> {
    fn residuals(&self, point: &Vector2<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.samples.len(),
            self.samples
                .iter()
                .map(|s| (point - s.coordinate.to_vector2()).norm() - s.distance),
        )
    }

    fn jacobian(&self, point: &Vector2<f64>) -> DMatrix<f64> {
        let mut jacobian = DMatrix::zeros(self.samples.len(), 2);

        for (i, sample) in self.samples.iter().enumerate() {
            let diff = point - sample.coordinate.to_vector2();
            let range = diff.norm();
            if range > MIN_RANGE {
                jacobian[(i, 0)] = diff.x / range;
                jacobian[(i, 1)] = diff.y / range;
            }
        }

        jacobian
    }

    /// `∇²‖p − c‖ = (I − u uᵀ) / ‖p − c‖` with `u` the unit direction
    fn curvature(&self, point: &Vector2<f64>) -> Matrix2<f64> {
        let mut curvature = Matrix2::zeros();

        for sample in self.samples {
            let diff = point - sample.coordinate.to_vector2();
            let range = diff.norm();
            if range > MIN_RANGE {
                let unit = diff / range;
                let residual = range - sample.distance;
                curvature += (Matrix2::identity() - unit * unit.transpose()) * (residual / range);
            }
        }

        curvature
    }
}
