//! Latest-value storage for beacon readings

pub mod beacon_store;

pub use beacon_store::BeaconStore;
