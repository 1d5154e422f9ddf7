//! Beacon Positioning System
//!
//! Estimates the 2D position of a mobile tag from signal-strength-derived
//! distances to fixed beacons, using whatever beacons have reported most
//! recently and a nonlinear least-squares multilateration solve.

pub mod core;
pub mod storage;
pub mod algorithms;
pub mod positioning;
pub mod processing;
pub mod recorder;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{BeaconGeometry, BeaconReading, Coordinate, PositionEstimate, Sample, MIN_SAMPLES};
pub use storage::BeaconStore;
pub use algorithms::{
    EstimationError, LeastSquaresObjective, LevenbergMarquardt, Minimizer, NelderMead,
    PositionEstimator, SolverConfig, SolverMethod,
};
pub use positioning::{PositionService, PositioningError, PositioningResult};
pub use processing::{
    IngestError, MqttSettings, PathLossModel, TelemetryHandler, TelemetryMessage, TelemetrySource,
};
pub use recorder::{Recorder, RecorderError, SamplerConfig};
pub use utils::{init_logging, ConfigError, LogConfig, ServiceConfig};
