use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::algorithms::SolverConfig;
use crate::core::{BeaconGeometry, Coordinate};
use crate::processing::{PathLossModel, TelemetrySource};
use crate::recorder::SamplerConfig;
use crate::utils::logging::LogConfig;

/// Fixed position of one beacon on the floor plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconConfig {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl BeaconConfig {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self { id: id.into(), x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IngestConfig {
    pub source: TelemetrySource,
}

/// Complete service configuration, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub beacons: Vec<BeaconConfig>,
    pub path_loss: PathLossModel,
    pub solver: SolverConfig,
    pub sampler: SamplerConfig,
    pub ingest: IngestConfig,
    pub logging: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            beacons: default_beacons(),
            path_loss: PathLossModel::default(),
            solver: SolverConfig::default(),
            sampler: SamplerConfig::default(),
            ingest: IngestConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Reference deployment: a 4 m x 4 m room with beacons on a 2 m grid
/// around the perimeter.
fn default_beacons() -> Vec<BeaconConfig> {
    [
        (0.0, 0.0),
        (2.0, 0.0),
        (4.0, 0.0),
        (0.0, 2.0),
        (4.0, 2.0),
        (0.0, 4.0),
        (2.0, 4.0),
        (4.0, 4.0),
    ]
    .iter()
    .enumerate()
    .map(|(i, &(x, y))| BeaconConfig::new(format!("beacon_{}", i + 1), x, y))
    .collect()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("beacon '{id}' is configured more than once")]
    DuplicateBeacon { id: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConfigError {
    fn invalid(parameter: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ServiceConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = %path.as_ref().display(), beacons = config.beacons.len(), "loaded configuration");
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for beacon in &self.beacons {
            if beacon.id.trim().is_empty() {
                return Err(ConfigError::invalid("beacons.id", &beacon.id, "beacon id must not be empty"));
            }
            if !Coordinate::new(beacon.x, beacon.y).is_finite() {
                return Err(ConfigError::invalid(
                    &format!("beacons.{}", beacon.id),
                    format!("({}, {})", beacon.x, beacon.y),
                    "coordinates must be finite",
                ));
            }
            if !seen.insert(beacon.id.as_str()) {
                return Err(ConfigError::DuplicateBeacon { id: beacon.id.clone() });
            }
        }

        if !(self.path_loss.exponent.is_finite() && self.path_loss.exponent > 0.0) {
            return Err(ConfigError::invalid(
                "path_loss.exponent",
                self.path_loss.exponent,
                "path-loss exponent must be positive",
            ));
        }
        if !self.path_loss.measured_power_dbm.is_finite() {
            return Err(ConfigError::invalid(
                "path_loss.measured_power_dbm",
                self.path_loss.measured_power_dbm,
                "measured power must be finite",
            ));
        }

        if self.solver.effective_max_iterations() == 0 {
            return Err(ConfigError::invalid(
                "solver.max_iterations",
                0,
                "solver needs at least one iteration",
            ));
        }

        if self.sampler.interval_ms == 0 {
            return Err(ConfigError::invalid(
                "sampler.interval_ms",
                0,
                "sampling interval must be positive",
            ));
        }

        if let TelemetrySource::Mqtt(mqtt) = &self.ingest.source {
            if let Err(e) = mqtt.endpoint() {
                return Err(ConfigError::invalid("ingest.mqtt.broker", &mqtt.broker, &e.to_string()));
            }
            if mqtt.topics.iter().all(|t| t.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    "ingest.mqtt.topics",
                    format!("{:?}", mqtt.topics),
                    "at least one topic is required",
                ));
            }
        }

        Ok(())
    }

    pub fn geometry(&self) -> BeaconGeometry {
        self.beacons
            .iter()
            .map(|b| (b.id.clone(), Coordinate::new(b.x, b.y)))
            .collect()
    }
}
