//! Position service: store snapshot joined with beacon geometry

pub mod service;

pub use service::{PositionService, PositioningError, PositioningResult};
