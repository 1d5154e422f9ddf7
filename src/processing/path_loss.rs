//! Log-distance path-loss model

use serde::{Deserialize, Serialize};

use crate::core::{DEFAULT_MEASURED_POWER_DBM, DEFAULT_PATH_LOSS_EXPONENT};

/// Converts received signal strength to an estimated distance:
/// `d = 10^((P₁ − rssi) / (10·n))`, with `P₁` the power measured at one metre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathLossModel {
    pub measured_power_dbm: f64,
    pub exponent: f64,
}

impl Default for PathLossModel {
    fn default() -> Self {
        Self {
            measured_power_dbm: DEFAULT_MEASURED_POWER_DBM,
            exponent: DEFAULT_PATH_LOSS_EXPONENT,
        }
    }
}

impl PathLossModel {
    pub fn new(measured_power_dbm: f64, exponent: f64) -> Self {
        Self {
            measured_power_dbm,
            exponent,
        }
    }

    pub fn distance(&self, rssi_dbm: f64) -> f64 {
        10f64.powf((self.measured_power_dbm - rssi_dbm) / (10.0 * self.exponent))
    }
}
