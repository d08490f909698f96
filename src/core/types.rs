//! Core data types shared across the anchor pipeline

use nalgebra::{UnitQuaternion, Vector3};
use std::fmt;

/// Camera- or anchor-relative pose in the local tracking frame
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Position in meters
    pub position: Vector3<f32>,
    /// Orientation as a unit quaternion
    pub rotation: UnitQuaternion<f32>,
}

impl Pose {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    /// Pose at the tracking-frame origin with identity orientation
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose at the given translation with identity orientation
    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            rotation: UnitQuaternion::identity(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Absolute geodetic pose produced by the earth-tracking subsystem
#[derive(Debug, Clone, PartialEq)]
pub struct GeospatialPose {
    /// Latitude in degrees (-90..90)
    pub latitude: f64,
    /// Longitude in degrees (-180..180)
    pub longitude: f64,
    /// Altitude in meters above the WGS84 ellipsoid
    pub altitude: f64,
    /// Heading in the east-up-south frame
    pub east_up_south_quaternion: UnitQuaternion<f32>,
}

impl GeospatialPose {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            east_up_south_quaternion: UnitQuaternion::identity(),
        }
    }
}

/// Stable handle to an engine-owned anchor
///
/// Anchors are mutated asynchronously by tracking and by cloud hosting, so
/// the engine keeps the object and the rest of the crate holds this handle,
/// reading derived state (tracking state, cloud state, pose) through the
/// session each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(u64);

impl AnchorId {
    pub fn new(id: u64) -> Self {
        AnchorId(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

/// Engine-reported validity of a pose estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// Tracking is temporarily degraded; poses may be stale
    Paused,
    /// Poses are current and usable
    Tracking,
    /// Tracking was lost permanently for this target
    Stopped,
}

/// Availability of the earth-tracking subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarthState {
    /// Geodetic poses are available
    Enabled,
    ErrorInternal,
    ErrorGeospatialModeDisabled,
    ErrorNotAuthorized,
    ErrorResourcesExhausted,
}

/// Terminal and in-flight states of a cloud-anchor host or resolve task
///
/// These mirror the cloud service's native result codes; `ErrorTimeout` is
/// the one local addition, produced when a request outlives the configured
/// watchdog without the service reporting a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudAnchorState {
    /// The anchor has never been submitted to the cloud service
    None,
    /// A host or resolve task is in flight
    TaskInProgress,
    Success,
    ErrorInternal,
    ErrorNotAuthorized,
    ErrorServiceUnavailable,
    ErrorResourceExhausted,
    ErrorHostingDatasetProcessingFailed,
    ErrorCloudIdNotFound,
    ErrorResolvingSdkVersionTooOld,
    ErrorResolvingSdkVersionTooNew,
    ErrorHostingServiceUnavailable,
    /// Local watchdog expired before the service delivered a result
    ErrorTimeout,
}

impl CloudAnchorState {
    /// True once the task can no longer change state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CloudAnchorState::None | CloudAnchorState::TaskInProgress)
    }

    pub fn is_error(&self) -> bool {
        self.is_terminal() && *self != CloudAnchorState::Success
    }
}

impl fmt::Display for CloudAnchorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CloudAnchorState::None => "not submitted",
            CloudAnchorState::TaskInProgress => "in progress",
            CloudAnchorState::Success => "success",
            CloudAnchorState::ErrorInternal => "internal error",
            CloudAnchorState::ErrorNotAuthorized => "not authorized",
            CloudAnchorState::ErrorServiceUnavailable => "service unavailable",
            CloudAnchorState::ErrorResourceExhausted => "resource exhausted",
            CloudAnchorState::ErrorHostingDatasetProcessingFailed => {
                "hosting dataset processing failed"
            }
            CloudAnchorState::ErrorCloudIdNotFound => "cloud anchor id not found",
            CloudAnchorState::ErrorResolvingSdkVersionTooOld => "sdk version too old",
            CloudAnchorState::ErrorResolvingSdkVersionTooNew => "sdk version too new",
            CloudAnchorState::ErrorHostingServiceUnavailable => "hosting service unavailable",
            CloudAnchorState::ErrorTimeout => "request timed out",
        };
        write!(f, "{}", text)
    }
}
