//! MQTT broker subscription feeding the telemetry handler

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rumqttc::{Client, Event, MqttOptions, Packet, QoS, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ingest::{IngestStats, TelemetryHandler};

const DEFAULT_PORT: u16 = 1883;
const POLL_INTERVAL: Duration = Duration::from_millis(250);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CAPACITY: usize = 16;

/// Broker connection and subscription parameters
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    /// `host` or `host:port`; port defaults to 1883
    pub broker: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topics: Vec<String>,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker: format!("mosquitto:{}", DEFAULT_PORT),
            client_id: "beacon-positioning".to_string(),
            username: None,
            password: None,
            topics: vec!["beacons".to_string()],
        }
    }
}

impl fmt::Debug for MqttSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MqttSettings")
            .field("broker", &self.broker)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("topics", &self.topics)
            .finish()
    }
}

impl MqttSettings {
    /// Settings from the `MOSQUITTO_*` environment variables, falling back
    /// to defaults for anything unset
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `MOSQUITTO_HOST`, `MOSQUITTO_INTERNAL_PORT`, `MOSQUITTO_CLIENT_ID`,
    /// `MOSQUITTO_USER`, `MOSQUITTO_PASSWORD` and `MOSQUITTO_TOPIC`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = non_empty("MOSQUITTO_HOST").unwrap_or_else(|| "mosquitto".to_string());
        let port = non_empty("MOSQUITTO_INTERNAL_PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());

        Self {
            broker: format!("{}:{}", host, port),
            client_id: non_empty("MOSQUITTO_CLIENT_ID").unwrap_or(defaults.client_id),
            username: non_empty("MOSQUITTO_USER"),
            password: non_empty("MOSQUITTO_PASSWORD"),
            topics: non_empty("MOSQUITTO_TOPIC")
                .map(|topic| vec![topic])
                .unwrap_or(defaults.topics),
        }
    }

    /// Split `broker` into host and port
    pub fn endpoint(&self) -> io::Result<(String, u16)> {
        let broker = self.broker.trim();
        let invalid = || io::Error::new(io::ErrorKind::InvalidInput, format!("invalid broker address {:?}", broker));

        let (host, port) = match broker.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid())?),
            None => (broker, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(invalid());
        }
        Ok((host.to_string(), port))
    }

    fn options(&self) -> io::Result<MqttOptions> {
        let (host, port) = self.endpoint()?;
        let mut options = MqttOptions::new(self.client_id.clone(), host, port);
        options.set_keep_alive(KEEP_ALIVE);
        if let Some(username) = &self.username {
            options.set_credentials(username.clone(), self.password.clone().unwrap_or_default());
        }
        Ok(options)
    }
}

impl TelemetryHandler {
    /// Handle one event from the broker connection; only publishes carry telemetry
    pub fn handle_event(&self, event: &Event, stats: &mut IngestStats) {
        match event {
            Event::Incoming(Packet::Publish(publish)) => {
                debug!(topic = %publish.topic, bytes = publish.payload.len(), "telemetry publish");
                self.handle_logged(&publish.payload, stats);
            }
            Event::Incoming(Packet::ConnAck(_)) => info!("connected to broker"),
            _ => {}
        }
    }

    /// Subscribe to the configured topics and consume publishes until shutdown.
    ///
    /// Connection failures are logged and retried; the client reconnects and
    /// resubscribes on its own.
    pub fn run_mqtt(&self, settings: &MqttSettings, shutdown: &AtomicBool) -> io::Result<IngestStats> {
        if settings.topics.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "no MQTT topics configured"));
        }

        let (client, mut connection) = Client::new(settings.options()?, REQUEST_CAPACITY);
        for topic in &settings.topics {
            client
                .subscribe(topic.as_str(), QoS::AtMostOnce)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        }
        info!(broker = %settings.broker, topics = ?settings.topics, "subscribed to telemetry");

        let mut stats = IngestStats::default();
        while !shutdown.load(Ordering::Relaxed) {
            match connection.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => self.handle_event(&event, &mut stats),
                Ok(Err(e)) => {
                    warn!(error = %e, "broker connection error, retrying");
                    thread::sleep(RECONNECT_DELAY);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if let Err(e) = client.disconnect() {
            debug!(error = %e, "disconnect request not sent");
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::PathLossModel;
    use crate::storage::BeaconStore;
    use rumqttc::Publish;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_settings_from_broker_environment() {
        let settings = MqttSettings::from_lookup(env(&[
            ("MOSQUITTO_INTERNAL_PORT", "1884"),
            ("MOSQUITTO_USER", "scanner"),
            ("MOSQUITTO_PASSWORD", "secret"),
            ("MOSQUITTO_TOPIC", "ble/rssi"),
        ]));

        assert_eq!(settings.broker, "mosquitto:1884");
        assert_eq!(settings.username.as_deref(), Some("scanner"));
        assert_eq!(settings.password.as_deref(), Some("secret"));
        assert_eq!(settings.topics, vec!["ble/rssi".to_string()]);
        assert_eq!(settings.endpoint().unwrap(), ("mosquitto".to_string(), 1884));
    }

    #[test]
    fn test_unset_environment_gives_defaults() {
        let settings = MqttSettings::from_lookup(env(&[("MOSQUITTO_USER", "  ")]));
        assert_eq!(settings, MqttSettings::default());
    }

    #[test]
    fn test_endpoint_parsing() {
        let mut settings = MqttSettings {
            broker: "broker.local".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.endpoint().unwrap(), ("broker.local".to_string(), 1883));

        settings.broker = "broker.local:notaport".to_string();
        assert!(settings.endpoint().is_err());

        settings.broker = ":1883".to_string();
        assert!(settings.endpoint().is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = MqttSettings {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }

    #[test]
    fn test_source_config_form() {
        let source: crate::processing::TelemetrySource = serde_json::from_str(
            r#"{ "mqtt": { "broker": "localhost:1883", "topics": ["a", "b"] } }"#,
        )
        .unwrap();

        match source {
            crate::processing::TelemetrySource::Mqtt(settings) => {
                assert_eq!(settings.broker, "localhost:1883");
                assert_eq!(settings.topics, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(settings.client_id, "beacon-positioning");
                assert!(settings.username.is_none());
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_published_telemetry_reaches_store() {
        let store = Arc::new(BeaconStore::new());
        let handler = TelemetryHandler::new(Arc::clone(&store), PathLossModel::new(-40.0, 2.0));
        let mut stats = IngestStats::default();

        let good = Publish::new(
            "beacons",
            QoS::AtMostOnce,
            br#"{"beacon_name": "beacon_4", "avg_rssi": -40}"#.to_vec(),
        );
        let bad = Publish::new("beacons", QoS::AtMostOnce, b"not json".to_vec());
        handler.handle_event(&Event::Incoming(Packet::Publish(good)), &mut stats);
        handler.handle_event(&Event::Incoming(Packet::Publish(bad)), &mut stats);
        handler.handle_event(&Event::Incoming(Packet::PingResp), &mut stats);

        assert_eq!(stats, IngestStats { stored: 1, rejected: 1 });
        assert!((store.get("beacon_4").unwrap().distance - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_run_without_topics_is_rejected() {
        let store = Arc::new(BeaconStore::new());
        let handler = TelemetryHandler::new(store, PathLossModel::default());
        let settings = MqttSettings {
            topics: Vec::new(),
            ..Default::default()
        };

        let error = handler.run_mqtt(&settings, &AtomicBool::new(false)).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
    }
}
