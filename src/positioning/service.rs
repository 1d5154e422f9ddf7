use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::algorithms::{EstimationError, PositionEstimator};
use crate::core::{BeaconGeometry, PositionEstimate, Sample, MIN_SAMPLES};
use crate::storage::BeaconStore;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositioningError {
    /// Fewer than three reporting beacons have a known coordinate
    #[error("insufficient beacons: {available} mapped, {required} required")]
    InsufficientBeacons { available: usize, required: usize },
    #[error(transparent)]
    Estimation(#[from] EstimationError),
}

pub type PositioningResult<T> = Result<T, PositioningError>;

/// Answers "where is the tag now" from the latest reading of every beacon.
///
/// Each call takes a fresh snapshot and solves from scratch. Readings never
/// expire, so a beacon that went quiet keeps contributing its last distance.
pub struct PositionService {
    store: Arc<BeaconStore>,
    geometry: Arc<BeaconGeometry>,
    estimator: PositionEstimator,
}

impl PositionService {
    /// Service using the default Levenberg-Marquardt estimator
    pub fn new(store: Arc<BeaconStore>, geometry: Arc<BeaconGeometry>) -> Self {
        Self::with_estimator(store, geometry, PositionEstimator::new())
    }

    pub fn with_estimator(
        store: Arc<BeaconStore>,
        geometry: Arc<BeaconGeometry>,
        estimator: PositionEstimator,
    ) -> Self {
        Self {
            store,
            geometry,
            estimator,
        }
    }

    /// Shared store the ingest side writes into
    pub fn store(&self) -> &Arc<BeaconStore> {
        &self.store
    }

    /// Static beacon coordinates
    pub fn geometry(&self) -> &BeaconGeometry {
        &self.geometry
    }

    /// Samples for every stored beacon that has a known coordinate.
    ///
    /// Sorted by beacon id so the solver sees the same order for the same
    /// snapshot.
    pub fn collect_samples(&self) -> Vec<Sample> {
        let snapshot = self.store.snapshot();
        let mut mapped: Vec<_> = snapshot
            .into_iter()
            .filter_map(|(id, reading)| {
                let coordinate = self.geometry.coordinate(&id)?;
                Some((id, Sample::new(coordinate, reading.distance)))
            })
            .collect();
        mapped.sort_by(|a, b| a.0.cmp(&b.0));
        mapped.into_iter().map(|(_, sample)| sample).collect()
    }

    /// Estimate the tag position from the current snapshot
    #[instrument(level = "debug", skip(self))]
    pub fn current_position(&self) -> PositioningResult<PositionEstimate> {
        let samples = self.collect_samples();
        if samples.len() < MIN_SAMPLES {
            debug!(mapped = samples.len(), "not enough mapped beacons");
            return Err(PositioningError::InsufficientBeacons {
                available: samples.len(),
                required: MIN_SAMPLES,
            });
        }

        Ok(self.estimator.estimate(&samples)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Coordinate;

    fn geometry() -> Arc<BeaconGeometry> {
        Arc::new(
            BeaconGeometry::new()
                .with_beacon("beacon_1", 0.0, 0.0)
                .with_beacon("beacon_2", 4.0, 0.0)
                .with_beacon("beacon_3", 0.0, 4.0)
                .with_beacon("beacon_4", 4.0, 4.0),
        )
    }

    fn service() -> PositionService {
        PositionService::new(Arc::new(BeaconStore::new()), geometry())
    }

    #[test]
    fn test_empty_store_is_insufficient() {
        assert_eq!(
            service().current_position(),
            Err(PositioningError::InsufficientBeacons { available: 0, required: 3 })
        );
    }

    #[test]
    fn test_unmapped_beacons_are_ignored() {
        let service = service();
        service.store().set("beacon_1", -50, 5f64.sqrt());
        service.store().set("beacon_2", -50, 5f64.sqrt());
        service.store().set("stranger", -50, 1.0);
        service.store().set("another_stranger", -50, 1.0);

        assert_eq!(
            service.current_position(),
            Err(PositioningError::InsufficientBeacons { available: 2, required: 3 })
        );
    }

    #[test]
    fn test_estimates_from_mapped_beacons() {
        let service = service();
        service.store().set("beacon_1", -50, 5f64.sqrt());
        service.store().set("beacon_2", -50, 5f64.sqrt());
        service.store().set("beacon_3", -55, 13f64.sqrt());
        service.store().set("stranger", -90, 100.0);

        let position = service.current_position().unwrap();
        assert!(position.distance_to(&Coordinate::new(2.0, 1.0)) < 1e-3);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let service = service();
        service.store().set("beacon_1", -50, 2.5);
        service.store().set("beacon_2", -50, 2.0);
        service.store().set("beacon_3", -55, 3.4);
        service.store().set("beacon_4", -60, 3.9);

        let first = service.current_position().unwrap();
        let second = service.current_position().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_estimator_errors_are_forwarded() {
        use crate::algorithms::LevenbergMarquardt;

        let estimator = PositionEstimator::with_minimizer(Box::new(LevenbergMarquardt {
            max_iterations: 1,
            ..Default::default()
        }));
        let service = PositionService::with_estimator(Arc::new(BeaconStore::new()), geometry(), estimator);
        service.store().set("beacon_1", -50, 5f64.sqrt());
        service.store().set("beacon_2", -50, 5f64.sqrt());
        service.store().set("beacon_3", -55, 13f64.sqrt());

        let error = service.current_position().unwrap_err();
        assert_eq!(
            error,
            PositioningError::Estimation(EstimationError::NotConverged { iterations: 1 })
        );
    }

    #[test]
    fn test_samples_follow_beacon_id_order() {
        let service = service();
        service.store().set("beacon_3", -50, 3.0);
        service.store().set("beacon_1", -50, 1.0);
        service.store().set("beacon_2", -50, 2.0);

        let distances: Vec<f64> = service.collect_samples().iter().map(|s| s.distance).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
    }
}
