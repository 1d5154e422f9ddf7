//! Concurrent store holding one reading per beacon
//!
//! Writers take the lock exclusively and replace the whole entry, so a reader
//! either sees the previous reading or the new one, never a mix of both.
//! `get` and `snapshot` share the lock with each other. `parking_lot`'s lock
//! is eventually fair, which keeps a steady stream of writers from starving
//! the sampler's snapshot.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::trace;

use crate::core::BeaconReading;

#[derive(Debug, Default)]
pub struct BeaconStore {
    readings: RwLock<HashMap<String, BeaconReading>>,
}

impl BeaconStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the reading for `id`, stamped with the current time.
    ///
    /// No validation is applied; zero or negative distances are stored as-is.
    pub fn set(&self, id: &str, signal_strength: i32, distance: f64) {
        let reading = BeaconReading {
            signal_strength,
            distance,
            observed_at: Utc::now(),
        };

        let mut readings = self.readings.write();
        match readings.get_mut(id) {
            Some(entry) => *entry = reading,
            None => {
                readings.insert(id.to_owned(), reading);
            }
        }
        drop(readings);

        trace!(beacon = id, signal_strength, distance, "stored beacon reading");
    }

    /// Current reading for `id`, if that beacon has ever reported
    pub fn get(&self, id: &str) -> Option<BeaconReading> {
        self.readings.read().get(id).cloned()
    }

    /// Independent copy of every reading, taken under a single read lock
    pub fn snapshot(&self) -> HashMap<String, BeaconReading> {
        self.readings.read().clone()
    }

    /// Number of beacons that have reported at least once
    pub fn len(&self) -> usize {
        self.readings.read().len()
    }

    /// True until the first `set`
    pub fn is_empty(&self) -> bool {
        self.readings.read().is_empty()
    }
}
