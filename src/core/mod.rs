//! Core types and constants for the beacon positioning system

pub mod types;
pub mod constants;
pub mod geometry;

pub use types::*;
pub use constants::*;
pub use geometry::BeaconGeometry;
