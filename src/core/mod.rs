//! Core data types for the anchor pipeline

pub mod constants;
pub mod types;

pub use constants::{
    DEFAULT_HOST_TTL_SECONDS, EARTH_RADIUS_KM, MAX_HOST_TTL_SECONDS, METERS_TO_DEGREES,
    MIN_HOST_TTL_SECONDS,
};
pub use types::{AnchorId, CloudAnchorState, EarthState, GeospatialPose, Pose, TrackingState};
