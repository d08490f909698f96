//! Engine error types

use crate::core::types::{AnchorId, EarthState, TrackingState};
use std::fmt;

/// Errors surfaced by the AR engine boundary
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The camera feed is not available to the session
    CameraNotAvailable,
    /// The session is paused and cannot produce frames
    SessionPaused,
    /// An operation required tracking that is not currently available
    NotTracking { state: TrackingState },
    /// The earth subsystem cannot produce geodetic poses
    EarthNotReady { state: EarthState },
    /// The handle does not refer to a live anchor
    UnknownAnchor { anchor: AnchorId },
    /// The cloud-anchor service rejected a submission
    CloudSubmission { reason: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::CameraNotAvailable => write!(f, "camera not available"),
            EngineError::SessionPaused => write!(f, "session is paused"),
            EngineError::NotTracking { state } => {
                write!(f, "not tracking (state: {:?})", state)
            }
            EngineError::EarthNotReady { state } => {
                write!(f, "earth tracking not ready (state: {:?})", state)
            }
            EngineError::UnknownAnchor { anchor } => {
                write!(f, "unknown or detached anchor: {}", anchor)
            }
            EngineError::CloudSubmission { reason } => {
                write!(f, "cloud submission rejected: {}", reason)
            }
        }
    }
}

impl std::error::Error for EngineError {}
