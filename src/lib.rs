//! Geospatial cloud-anchor management for AR sessions
//!
//! Places a virtual object on a detected surface, converts its pose into an
//! absolute geodetic coordinate, and persists the placement as a cloud
//! anchor that other sessions can resolve by short code. The AR tracking
//! and cloud-anchor engine is consumed through the [`engine::ArSession`]
//! trait; everything above it — the geodetic offset math, the request
//! coordinator, and the session state machine — lives here.

pub mod cloud;
pub mod core;
pub mod engine;
pub mod geodesy;
pub mod scene;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use crate::cloud::{
    CloudAnchorCoordinator, CloudRequestError, CoordinatorConfig, RequestId,
};
pub use crate::core::{
    AnchorId, CloudAnchorState, EarthState, GeospatialPose, Pose, TrackingState,
};
pub use crate::engine::{ArSession, EngineError, Frame, HitResult, MockArSession, TrackableHit};
pub use crate::geodesy::{GeoPoint, GeodesyError};
pub use crate::scene::AnchorRegistry;
pub use crate::session::{
    AnchorSessionController, SessionError, Severity, SlotState, StatusMessage,
};
pub use crate::utils::{ConfigError, SessionConfig};
