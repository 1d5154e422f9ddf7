//! Telemetry decoding and signal-to-distance conversion

pub mod parser;
pub mod path_loss;
pub mod ingest;
pub mod mqtt;

pub use parser::{IngestError, IngestResult, MessageParser, TelemetryMessage};
pub use path_loss::PathLossModel;
pub use ingest::{IngestStats, TelemetryHandler, TelemetrySource};
pub use mqtt::MqttSettings;
