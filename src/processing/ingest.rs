//! Telemetry ingest: payload → distance → store
//!
//! Every decoded message is written straight into the store. There is no
//! queue and no rate limit; a bad payload is logged and skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::mqtt::MqttSettings;
use super::parser::{IngestResult, MessageParser};
use super::path_loss::PathLossModel;
use crate::storage::BeaconStore;

const UDP_POLL_INTERVAL: Duration = Duration::from_millis(250);
const MAX_DATAGRAM: usize = 2048;

/// Where telemetry payloads come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TelemetrySource {
    /// Newline-delimited JSON on standard input
    #[default]
    Stdin,
    /// Newline-delimited JSON from a file
    File(PathBuf),
    /// One JSON message per datagram on the given bind address
    Udp(String),
    /// One JSON message per publish on the subscribed broker topics
    Mqtt(MqttSettings),
}

/// Counters for one ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub stored: u64,
    pub rejected: u64,
}

pub struct TelemetryHandler {
    parser: MessageParser,
    model: PathLossModel,
    store: Arc<BeaconStore>,
}

impl TelemetryHandler {
    /// Handler writing converted readings into `store`
    pub fn new(store: Arc<BeaconStore>, model: PathLossModel) -> Self {
        Self {
            parser: MessageParser::new(),
            model,
            store,
        }
    }

    /// Decode one payload and store the resulting reading
    pub fn handle(&self, payload: &[u8]) -> IngestResult<()> {
        let message = self.parser.parse(payload)?;
        let distance = self.model.distance(message.avg_rssi);

        self.store
            .set(&message.beacon_name, message.avg_rssi as i32, distance);
        debug!(
            beacon = %message.beacon_name,
            rssi = message.avg_rssi,
            tx_power = message.tx_power,
            distance,
            "stored beacon data"
        );
        Ok(())
    }

    pub(crate) fn handle_logged(&self, payload: &[u8], stats: &mut IngestStats) {
        match self.handle(payload) {
            Ok(()) => stats.stored += 1,
            Err(e) => {
                stats.rejected += 1;
                warn!(error = %e, "dropping telemetry payload");
            }
        }
    }

    /// Consume newline-delimited payloads until EOF or shutdown
    pub fn run_lines<R: BufRead>(&self, reader: R, shutdown: &AtomicBool) -> io::Result<IngestStats> {
        let mut stats = IngestStats::default();
        for line in reader.lines() {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            let line = line?;
            let payload = line.trim();
            if payload.is_empty() {
                continue;
            }
            self.handle_logged(payload.as_bytes(), &mut stats);
        }
        Ok(stats)
    }

    /// Receive datagrams until shutdown
    pub fn run_udp(&self, socket: &UdpSocket, shutdown: &AtomicBool) -> io::Result<IngestStats> {
        socket.set_read_timeout(Some(UDP_POLL_INTERVAL))?;
        let mut stats = IngestStats::default();
        let mut buf = [0u8; MAX_DATAGRAM];

        while !shutdown.load(Ordering::Relaxed) {
            match socket.recv_from(&mut buf) {
                Ok((n, _src)) => self.handle_logged(&buf[..n], &mut stats),
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(stats)
    }

    /// Run the configured source to completion or shutdown
    pub fn run(&self, source: &TelemetrySource, shutdown: &AtomicBool) -> io::Result<IngestStats> {
        info!(?source, "starting telemetry ingest");
        let stats = match source {
            TelemetrySource::Stdin => self.run_lines(io::stdin().lock(), shutdown)?,
            TelemetrySource::File(path) => self.run_lines(BufReader::new(File::open(path)?), shutdown)?,
            TelemetrySource::Udp(bind) => {
                let socket = UdpSocket::bind(bind)?;
                let addr = socket.local_addr()?;
                info!(%addr, "listening for telemetry");
                self.run_udp(&socket, shutdown)?
            }
            TelemetrySource::Mqtt(settings) => self.run_mqtt(settings, shutdown)?,
        };
        info!(stored = stats.stored, rejected = stats.rejected, "telemetry ingest finished");
        Ok(stats)
    }
}
