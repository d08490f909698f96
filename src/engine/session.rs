//! Session trait and per-frame data

use crate::core::types::{
    AnchorId, CloudAnchorState, EarthState, GeospatialPose, Pose, TrackingState,
};
use crate::engine::error::EngineError;
use nalgebra::{UnitQuaternion, Vector3};

/// Abstraction over the AR tracking and cloud-anchor engine
///
/// Anchors are engine-owned; callers hold [`AnchorId`] handles and read the
/// derived state back through this trait each frame. Cloud calls are
/// asynchronous: `host_cloud_anchor` and `resolve_cloud_anchor` return
/// immediately and progress is observed by polling `cloud_anchor_state`.
pub trait ArSession {
    /// Advance the session by one frame and return its snapshot
    fn update(&mut self) -> Result<Frame, EngineError>;

    /// Create an anchor tracking the given pose
    fn create_anchor(&mut self, pose: &Pose) -> Result<AnchorId, EngineError>;

    /// Pose of an anchor, if the engine still tracks it
    fn anchor_pose(&self, anchor: AnchorId) -> Option<Pose>;

    /// Tracking state of an anchor; `Stopped` for unknown handles
    fn anchor_tracking_state(&self, anchor: AnchorId) -> TrackingState;

    /// Stop tracking an anchor and release its engine resources
    fn detach_anchor(&mut self, anchor: AnchorId);

    /// Availability of the earth-tracking subsystem
    fn earth_state(&self) -> EarthState;

    /// Tracking state of the earth-relative localization
    fn earth_tracking_state(&self) -> TrackingState;

    /// Geodetic pose of the camera
    fn camera_geospatial_pose(&self) -> Result<GeospatialPose, EngineError>;

    /// Geodetic pose corresponding to a local tracking-frame pose
    fn geospatial_pose_of(&self, pose: &Pose) -> Result<GeospatialPose, EngineError>;

    /// Create an anchor fixed to an absolute geodetic position
    fn create_earth_anchor(
        &mut self,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        east_up_south_quaternion: UnitQuaternion<f32>,
    ) -> Result<AnchorId, EngineError>;

    /// Begin hosting an anchor with the cloud service (non-blocking)
    fn host_cloud_anchor(&mut self, anchor: AnchorId, ttl_seconds: u32)
        -> Result<(), EngineError>;

    /// Begin resolving a cloud anchor id, returning the anchor being
    /// populated (non-blocking)
    fn resolve_cloud_anchor(&mut self, cloud_anchor_id: &str) -> Result<AnchorId, EngineError>;

    /// Current cloud task state of an anchor
    fn cloud_anchor_state(&self, anchor: AnchorId) -> CloudAnchorState;

    /// Cloud id assigned by the service once hosting succeeded
    fn cloud_anchor_id(&self, anchor: AnchorId) -> Option<String>;
}

/// Per-frame snapshot from the engine
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic frame counter
    pub frame_index: u64,
    pub camera_pose: Pose,
    pub camera_tracking_state: TrackingState,
    /// Hit-test results against detected surfaces, ordered nearest first
    pub hits: Vec<HitResult>,
    /// Feature points observed this frame
    pub point_cloud: Vec<Vector3<f32>>,
    /// Average pixel intensity in gamma space
    pub light_estimate: f32,
}

impl Frame {
    /// Frame with a tracking camera at the given pose and no hits
    pub fn tracking(frame_index: u64, camera_pose: Pose) -> Self {
        Self {
            frame_index,
            camera_pose,
            camera_tracking_state: TrackingState::Tracking,
            hits: Vec::new(),
            point_cloud: Vec::new(),
            light_estimate: 1.0,
        }
    }
}

/// One hit-test result against a detected surface
#[derive(Debug, Clone)]
pub struct HitResult {
    /// Pose of the hit on the surface
    pub hit_pose: Pose,
    /// Distance from the camera to the hit, in meters
    pub distance: f32,
    /// What was hit
    pub trackable: TrackableHit,
}

/// Surface kinds a hit test can intersect
#[derive(Debug, Clone, PartialEq)]
pub enum TrackableHit {
    /// A detected plane
    Plane {
        /// Whether the hit lies inside the plane's detected polygon
        in_polygon: bool,
        /// Signed distance from the camera to the plane along its normal
        distance_to_plane: f32,
    },
    /// A feature point
    Point { orientation_mode: PointOrientationMode },
}

/// How a feature point's orientation was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointOrientationMode {
    /// The engine estimated a surface normal at the point
    EstimatedSurfaceNormal,
    /// No surface information; orientation is identity
    InitializedToIdentity,
}

impl HitResult {
    /// Whether this hit is a stable place to attach an anchor: a hit inside
    /// a plane polygon with the camera in front of the plane, or a point
    /// with an estimated surface normal.
    pub fn supports_anchor(&self) -> bool {
        match &self.trackable {
            TrackableHit::Plane {
                in_polygon,
                distance_to_plane,
            } => *in_polygon && *distance_to_plane > 0.0,
            TrackableHit::Point { orientation_mode } => {
                *orientation_mode == PointOrientationMode::EstimatedSurfaceNormal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_hit_supports_anchor() {
        let hit = HitResult {
            hit_pose: Pose::identity(),
            distance: 1.0,
            trackable: TrackableHit::Plane {
                in_polygon: true,
                distance_to_plane: 0.5,
            },
        };
        assert!(hit.supports_anchor());
    }

    #[test]
    fn test_plane_hit_behind_camera_rejected() {
        let hit = HitResult {
            hit_pose: Pose::identity(),
            distance: 1.0,
            trackable: TrackableHit::Plane {
                in_polygon: true,
                distance_to_plane: -0.25,
            },
        };
        assert!(!hit.supports_anchor());
    }

    #[test]
    fn test_point_hit_requires_surface_normal() {
        let oriented = HitResult {
            hit_pose: Pose::identity(),
            distance: 2.0,
            trackable: TrackableHit::Point {
                orientation_mode: PointOrientationMode::EstimatedSurfaceNormal,
            },
        };
        let bare = HitResult {
            hit_pose: Pose::identity(),
            distance: 2.0,
            trackable: TrackableHit::Point {
                orientation_mode: PointOrientationMode::InitializedToIdentity,
            },
        };
        assert!(oriented.supports_anchor());
        assert!(!bare.supports_anchor());
    }
}
