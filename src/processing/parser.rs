use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Telemetry published by a scanner for one beacon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    /// Advertised transmit power; diagnostic only
    #[serde(default)]
    pub tx_power: i32,
    pub beacon_name: String,
    /// Averaged received signal strength (dBm)
    pub avg_rssi: f64,
}

/// Errors that can occur while turning a raw payload into a reading
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed telemetry: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("telemetry carries an empty beacon name")]
    EmptyBeaconName,
    #[error("non-finite rssi {rssi} for beacon {beacon}")]
    InvalidRssi { beacon: String, rssi: f64 },
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Decodes and validates telemetry payloads
#[derive(Debug, Clone, Default)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, payload: &[u8]) -> IngestResult<TelemetryMessage> {
        let message: TelemetryMessage = serde_json::from_slice(payload)?;

        let beacon_name = message.beacon_name.trim().to_owned();
        if beacon_name.is_empty() {
            return Err(IngestError::EmptyBeaconName);
        }
        if !message.avg_rssi.is_finite() {
            return Err(IngestError::InvalidRssi {
                beacon: beacon_name,
                rssi: message.avg_rssi,
            });
        }

        Ok(TelemetryMessage {
            beacon_name,
            ..message
        })
    }
}
