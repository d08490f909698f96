//! AR engine abstraction layer
//!
//! The tracking/cloud-anchor engine is an external capability. This module
//! defines the session trait the rest of the crate programs against, the
//! per-frame data it yields, and a mock implementation for testing and
//! development.

pub mod error;
pub mod mock;
pub mod session;

pub use error::EngineError;
pub use mock::MockArSession;
pub use session::{ArSession, Frame, HitResult, PointOrientationMode, TrackableHit};
