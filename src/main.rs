//! Beacon positioning service
//!
//! Reads beacon telemetry (stdin, a file, UDP, or an MQTT broker), keeps the latest distance
//! per beacon, and records a position estimate to CSV on a fixed interval.
//!
//! Usage:
//!   beacon-positioning --config service.json
//!   beacon-positioning --udp 0.0.0.0:5005 --output data/positions.csv
//!   MOSQUITTO_INTERNAL_PORT=1883 MOSQUITTO_TOPIC=beacons beacon-positioning --mqtt

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use beacon_positioning::{
    init_logging, BeaconStore, PositionEstimator, PositionService, Recorder, ServiceConfig,
    MqttSettings, SolverMethod, TelemetryHandler, TelemetrySource,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SolverArg {
    LevenbergMarquardt,
    NelderMead,
}

impl From<SolverArg> for SolverMethod {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::LevenbergMarquardt => SolverMethod::LevenbergMarquardt,
            SolverArg::NelderMead => SolverMethod::NelderMead,
        }
    }
}

#[derive(Parser)]
#[command(name = "beacon-positioning", about = "Estimate tag position from beacon signal strength")]
struct Cli {
    /// JSON configuration file; built-in defaults are used when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Read newline-delimited telemetry from this file instead of stdin
    #[arg(long, conflicts_with_all = ["udp", "mqtt"])]
    input: Option<PathBuf>,

    /// Receive telemetry datagrams on this address
    #[arg(long, conflicts_with = "mqtt")]
    udp: Option<String>,

    /// Subscribe to an MQTT broker configured by the MOSQUITTO_* environment
    #[arg(long)]
    mqtt: bool,

    /// CSV file for recorded positions
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Sampling interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    #[arg(long, value_enum)]
    solver: Option<SolverArg>,
}

impl Cli {
    fn load_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => ServiceConfig::default(),
        };

        if let Some(path) = &self.input {
            config.ingest.source = TelemetrySource::File(path.clone());
        }
        if let Some(bind) = &self.udp {
            config.ingest.source = TelemetrySource::Udp(bind.clone());
        }
        if self.mqtt {
            config.ingest.source = TelemetrySource::Mqtt(MqttSettings::from_env());
        }
        if let Some(path) = &self.output {
            config.sampler.output_path = path.clone();
        }
        if let Some(interval_ms) = self.interval_ms {
            config.sampler.interval_ms = interval_ms;
        }
        if let Some(solver) = self.solver {
            config.solver.method = solver.into();
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_logging(&config.logging);

    let store = Arc::new(BeaconStore::new());
    let geometry = Arc::new(config.geometry());
    let estimator = PositionEstimator::from_config(&config.solver);
    let service = Arc::new(PositionService::with_estimator(Arc::clone(&store), geometry, estimator));
    info!(
        beacons = config.beacons.len(),
        solver = ?config.solver.method,
        interval_ms = config.sampler.interval_ms,
        "position service ready"
    );

    let mut recorder = Recorder::create(Arc::clone(&service), &config.sampler.output_path)
        .with_context(|| format!("creating {}", config.sampler.output_path.display()))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let ingest = {
        let handler = TelemetryHandler::new(Arc::clone(&store), config.path_loss);
        let source = config.ingest.source.clone();
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("ingest".into())
            .spawn(move || {
                if let Err(e) = handler.run(&source, &shutdown) {
                    error!(error = %e, "telemetry ingest failed");
                }
                // Input exhausted: let the sampler finish.
                shutdown.store(true, Ordering::Relaxed);
            })
            .context("spawning ingest thread")?
    };

    recorder.run(config.sampler.interval(), &shutdown);

    if let Err(e) = recorder.tick() {
        warn!(error = %e, "no final sample");
    }

    if ingest.join().is_err() {
        error!("ingest thread panicked");
    }

    info!(rows = recorder.rows_written(), "shutting down");
    Ok(())
}
