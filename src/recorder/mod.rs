//! Periodic sampler that records position estimates as CSV rows

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::PositionEstimate;
use crate::positioning::{PositionService, PositioningError};

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Time between two estimates (milliseconds)
    pub interval_ms: u64,
    /// CSV file receiving one `x,y` row per estimate
    pub output_path: PathBuf,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            output_path: PathBuf::from("data/positions.csv"),
        }
    }
}

impl SamplerConfig {
    /// Sampling interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("position unavailable: {0}")]
    Positioning(#[from] PositioningError),
    #[error("failed to write record: {0}")]
    Io(#[from] io::Error),
}

/// CSV row formatting for position estimates
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    /// Column header row
    pub fn header(&self) -> &'static str {
        "x,y"
    }

    pub fn format_row(&self, position: &PositionEstimate) -> String {
        format!("{:.6},{:.6}", position.x, position.y)
    }
}

pub struct Recorder<W: Write> {
    service: Arc<PositionService>,
    writer: W,
    formatter: CsvFormatter,
    rows_written: u64,
}

impl Recorder<BufWriter<File>> {
    /// Create (or truncate) the CSV file, creating parent directories as needed
    pub fn create<P: AsRef<Path>>(service: Arc<PositionService>, path: P) -> Result<Self, RecorderError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        info!(path = %path.display(), "recording positions");
        Self::new(service, BufWriter::new(file))
    }
}

impl<W: Write> Recorder<W> {
    /// Wrap `writer` and emit the header row
    pub fn new(service: Arc<PositionService>, mut writer: W) -> Result<Self, RecorderError> {
        let formatter = CsvFormatter;
        writeln!(writer, "{}", formatter.header())?;
        writer.flush()?;

        Ok(Self {
            service,
            writer,
            formatter,
            rows_written: 0,
        })
    }

    /// Data rows written so far, header excluded
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Consume the recorder and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Take one estimate and append it. Nothing is written on failure.
    pub fn tick(&mut self) -> Result<PositionEstimate, RecorderError> {
        let position = self.service.current_position()?;

        writeln!(self.writer, "{}", self.formatter.format_row(&position))?;
        self.writer.flush()?;
        self.rows_written += 1;

        debug!(x = position.x, y = position.y, rows = self.rows_written, "recorded position");
        Ok(position)
    }

    /// Tick every `interval` until `shutdown` is raised.
    ///
    /// Failed ticks are logged and skipped; the next tick retries.
    pub fn run(&mut self, interval: Duration, shutdown: &AtomicBool) {
        let mut next_tick = Instant::now() + interval;

        while !shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now < next_tick {
                thread::sleep((next_tick - now).min(SHUTDOWN_POLL));
                continue;
            }
            next_tick += interval;

            match self.tick() {
                Ok(_) => {}
                Err(RecorderError::Positioning(e)) => {
                    warn!(error = %e, "skipping sample");
                }
                Err(e) => {
                    warn!(error = %e, "failed to write record");
                }
            }
        }

        info!(rows = self.rows_written, "recorder stopped");
    }
}
