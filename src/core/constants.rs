//! Positioning constants and calibration defaults

/// Minimum number of distance constraints for a 2D fix
pub const MIN_SAMPLES: usize = 3;

/// Received signal strength at one metre for the reference deployment (dBm)
pub const DEFAULT_MEASURED_POWER_DBM: f64 = -43.4;

/// Indoor path-loss exponent for the reference deployment
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 2.4;
