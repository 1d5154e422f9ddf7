//! Structured logging setup on top of `tracing-subscriber`

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    /// One line per event
    #[default]
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Directive string such as `beacon_positioning::algorithms=trace`;
    /// takes precedence over `level`
    pub filter: Option<String>,
}

impl LogConfig {
    /// The filter to install, plus the rejected directive when `filter`
    /// does not parse and `level` is used instead
    fn env_filter(&self) -> (EnvFilter, Option<String>) {
        let fallback = || EnvFilter::new(self.level.to_string());
        match &self.filter {
            Some(custom) => match EnvFilter::try_new(custom) {
                Ok(filter) => (filter, None),
                Err(e) => (fallback(), Some(format!("{:?}: {}", custom, e))),
            },
            None => (EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()), None),
        }
    }
}

/// Install the global subscriber. Returns `false` if one was already set,
/// in which case the existing subscriber stays in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let (filter, rejected) = config.env_filter();

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_thread_names(true))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_thread_names(true))
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_thread_names(true))
            .try_init(),
    };

    match result {
        Ok(()) => {
            if let Some(rejected) = rejected {
                warn!(directive = %rejected, level = %config.level, "invalid log filter, using level");
            }
            true
        }
        Err(e) => {
            debug!(error = %e, "logging already initialised");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_config_from_json() {
        let config: LogConfig = serde_json::from_str(r#"{ "level": "debug", "format": "json" }"#).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(&LogConfig::default());
        assert!(!init_logging(&LogConfig::default()));
    }

    #[test]
    fn test_bad_filter_directive_is_reported() {
        let config = LogConfig {
            filter: Some("beacon_positioning=loud".to_string()),
            ..Default::default()
        };
        let (_, rejected) = config.env_filter();
        assert!(rejected.unwrap().contains("beacon_positioning=loud"));

        let config = LogConfig {
            filter: Some("beacon_positioning::algorithms=trace".to_string()),
            ..Default::default()
        };
        assert!(config.env_filter().1.is_none());
    }
}
