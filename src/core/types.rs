//! Core data types for the positioning system

use chrono::{DateTime, Utc};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Point on the local floor plan, in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_vector2(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        (self.to_vector2() - other.to_vector2()).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Vector2<f64>> for Coordinate {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Latest report from a single beacon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconReading {
    /// Last raw signal metric, diagnostic only
    pub signal_strength: i32,
    /// Estimated beacon-to-tag distance in metres
    pub distance: f64,
    /// When the reading was stored
    pub observed_at: DateTime<Utc>,
}

/// A beacon coordinate joined with its observed distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub coordinate: Coordinate,
    pub distance: f64,
}

impl Sample {
    pub fn new(coordinate: Coordinate, distance: f64) -> Self {
        Self { coordinate, distance }
    }
}

/// Result of one estimation call
pub type PositionEstimate = Coordinate;
