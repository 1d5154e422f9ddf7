//! Static beacon-to-coordinate table

use std::collections::HashMap;

use super::types::Coordinate;

/// Fixed floor-plan coordinates of every known beacon.
///
/// Built once from configuration and shared read-only for the lifetime of
/// the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeaconGeometry {
    coordinates: HashMap<String, Coordinate>,
}

impl BeaconGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a beacon's coordinate
    pub fn with_beacon(mut self, id: impl Into<String>, x: f64, y: f64) -> Self {
        self.coordinates.insert(id.into(), Coordinate::new(x, y));
        self
    }

    /// Coordinate of a known beacon
    pub fn coordinate(&self, id: &str) -> Option<Coordinate> {
        self.coordinates.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.coordinates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.coordinates.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Coordinate)> for BeaconGeometry {
    fn from_iter<I: IntoIterator<Item = (String, Coordinate)>>(iter: I) -> Self {
        Self {
            coordinates: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        let geometry = BeaconGeometry::new()
            .with_beacon("beacon_1", 0.0, 0.0)
            .with_beacon("beacon_2", 4.0, 0.0);

        assert_eq!(geometry.len(), 2);
        assert_eq!(geometry.coordinate("beacon_2"), Some(Coordinate::new(4.0, 0.0)));
        assert!(geometry.coordinate("beacon_9").is_none());
    }

    #[test]
    fn test_later_entry_replaces_earlier() {
        let geometry = BeaconGeometry::new()
            .with_beacon("a", 1.0, 1.0)
            .with_beacon("a", 2.0, 3.0);

        assert_eq!(geometry.len(), 1);
        assert_eq!(geometry.coordinate("a"), Some(Coordinate::new(2.0, 3.0)));
    }
}
