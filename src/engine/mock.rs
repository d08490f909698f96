//! Mock AR session for testing and development

use crate::core::types::{
    AnchorId, CloudAnchorState, EarthState, GeospatialPose, Pose, TrackingState,
};
use crate::engine::error::EngineError;
use crate::engine::session::{ArSession, Frame};
use nalgebra::UnitQuaternion;
use std::collections::{HashMap, VecDeque};

/// Engine-side state the mock keeps per anchor
#[derive(Debug, Clone)]
struct MockAnchor {
    pose: Pose,
    tracking_state: TrackingState,
    cloud_state: CloudAnchorState,
    cloud_id: Option<String>,
}

/// Scriptable in-memory session
///
/// Frames are either queued explicitly with [`push_frame`](Self::push_frame)
/// or synthesized from the configured camera pose. Cloud tasks stay
/// `TaskInProgress` until the test finishes them with
/// [`finish_cloud_task`](Self::finish_cloud_task), which is how the
/// asynchronous service is simulated.
pub struct MockArSession {
    next_anchor: u64,
    frame_index: u64,
    anchors: HashMap<AnchorId, MockAnchor>,
    queued_frames: VecDeque<Frame>,
    camera_pose: Pose,
    camera_tracking_state: TrackingState,
    earth_state: EarthState,
    earth_tracking_state: TrackingState,
    camera_geospatial: GeospatialPose,
    anchor_geospatial: Option<GeospatialPose>,
    fail_updates: bool,
    reject_cloud: Option<String>,
    host_requests: Vec<(AnchorId, u32)>,
    resolve_requests: Vec<String>,
    detached: Vec<AnchorId>,
}

impl MockArSession {
    /// Create a session with a tracking camera at the origin and earth
    /// tracking enabled
    pub fn new() -> Self {
        Self {
            next_anchor: 0,
            frame_index: 0,
            anchors: HashMap::new(),
            queued_frames: VecDeque::new(),
            camera_pose: Pose::identity(),
            camera_tracking_state: TrackingState::Tracking,
            earth_state: EarthState::Enabled,
            earth_tracking_state: TrackingState::Tracking,
            camera_geospatial: GeospatialPose::new(0.0, 0.0, 0.0),
            anchor_geospatial: None,
            fail_updates: false,
            reject_cloud: None,
            host_requests: Vec::new(),
            resolve_requests: Vec::new(),
            detached: Vec::new(),
        }
    }

    /// Queue a frame to be returned by the next `update()` call
    pub fn push_frame(&mut self, frame: Frame) {
        self.queued_frames.push_back(frame);
    }

    pub fn set_camera_pose(&mut self, pose: Pose) {
        self.camera_pose = pose;
    }

    pub fn set_camera_tracking_state(&mut self, state: TrackingState) {
        self.camera_tracking_state = state;
    }

    pub fn set_earth_state(&mut self, state: EarthState) {
        self.earth_state = state;
    }

    pub fn set_earth_tracking_state(&mut self, state: TrackingState) {
        self.earth_tracking_state = state;
    }

    pub fn set_camera_geospatial_pose(&mut self, pose: GeospatialPose) {
        self.camera_geospatial = pose;
    }

    /// Override the geodetic pose reported for arbitrary local poses
    pub fn set_anchor_geospatial_pose(&mut self, pose: GeospatialPose) {
        self.anchor_geospatial = Some(pose);
    }

    pub fn set_anchor_tracking_state(&mut self, anchor: AnchorId, state: TrackingState) {
        if let Some(entry) = self.anchors.get_mut(&anchor) {
            entry.tracking_state = state;
        }
    }

    /// Drive an in-flight cloud task to a terminal state
    pub fn finish_cloud_task(
        &mut self,
        anchor: AnchorId,
        state: CloudAnchorState,
        cloud_id: Option<&str>,
    ) {
        if let Some(entry) = self.anchors.get_mut(&anchor) {
            entry.cloud_state = state;
            if let Some(id) = cloud_id {
                entry.cloud_id = Some(id.to_string());
            }
        }
    }

    /// Make every subsequent `update()` fail
    pub fn fail_updates(&mut self, fail: bool) {
        self.fail_updates = fail;
    }

    /// Make the cloud service reject host/resolve submissions
    pub fn reject_cloud_submissions(&mut self, reason: Option<&str>) {
        self.reject_cloud = reason.map(str::to_string);
    }

    /// Host submissions received so far, as (anchor, ttl) pairs
    pub fn host_requests(&self) -> &[(AnchorId, u32)] {
        &self.host_requests
    }

    /// Cloud anchor ids submitted for resolution so far
    pub fn resolve_requests(&self) -> &[String] {
        &self.resolve_requests
    }

    /// Anchors that have been detached
    pub fn detached_anchors(&self) -> &[AnchorId] {
        &self.detached
    }

    pub fn live_anchor_count(&self) -> usize {
        self.anchors.len()
    }

    fn insert_anchor(&mut self, pose: Pose, cloud_state: CloudAnchorState) -> AnchorId {
        self.next_anchor += 1;
        let id = AnchorId::new(self.next_anchor);
        self.anchors.insert(
            id,
            MockAnchor {
                pose,
                tracking_state: TrackingState::Tracking,
                cloud_state,
                cloud_id: None,
            },
        );
        id
    }
}

impl Default for MockArSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ArSession for MockArSession {
    fn update(&mut self) -> Result<Frame, EngineError> {
        if self.fail_updates {
            return Err(EngineError::CameraNotAvailable);
        }

        self.frame_index += 1;
        if let Some(mut frame) = self.queued_frames.pop_front() {
            frame.frame_index = self.frame_index;
            return Ok(frame);
        }

        let mut frame = Frame::tracking(self.frame_index, self.camera_pose.clone());
        frame.camera_tracking_state = self.camera_tracking_state;
        Ok(frame)
    }

    fn create_anchor(&mut self, pose: &Pose) -> Result<AnchorId, EngineError> {
        Ok(self.insert_anchor(pose.clone(), CloudAnchorState::None))
    }

    fn anchor_pose(&self, anchor: AnchorId) -> Option<Pose> {
        self.anchors.get(&anchor).map(|a| a.pose.clone())
    }

    fn anchor_tracking_state(&self, anchor: AnchorId) -> TrackingState {
        self.anchors
            .get(&anchor)
            .map(|a| a.tracking_state)
            .unwrap_or(TrackingState::Stopped)
    }

    fn detach_anchor(&mut self, anchor: AnchorId) {
        if self.anchors.remove(&anchor).is_some() {
            self.detached.push(anchor);
        }
    }

    fn earth_state(&self) -> EarthState {
        self.earth_state
    }

    fn earth_tracking_state(&self) -> TrackingState {
        self.earth_tracking_state
    }

    fn camera_geospatial_pose(&self) -> Result<GeospatialPose, EngineError> {
        Ok(self.camera_geospatial.clone())
    }

    fn geospatial_pose_of(&self, _pose: &Pose) -> Result<GeospatialPose, EngineError> {
        Ok(self
            .anchor_geospatial
            .clone()
            .unwrap_or_else(|| self.camera_geospatial.clone()))
    }

    fn create_earth_anchor(
        &mut self,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        east_up_south_quaternion: UnitQuaternion<f32>,
    ) -> Result<AnchorId, EngineError> {
        if self.earth_state != EarthState::Enabled {
            return Err(EngineError::EarthNotReady {
                state: self.earth_state,
            });
        }
        let mut pose = Pose::identity();
        pose.rotation = east_up_south_quaternion;
        // The tracking-frame pose of a geodetic anchor is engine-internal;
        // the mock only needs the coordinates for inspection.
        let _ = (latitude, longitude, altitude);
        Ok(self.insert_anchor(pose, CloudAnchorState::None))
    }

    fn host_cloud_anchor(
        &mut self,
        anchor: AnchorId,
        ttl_seconds: u32,
    ) -> Result<(), EngineError> {
        if let Some(reason) = &self.reject_cloud {
            return Err(EngineError::CloudSubmission {
                reason: reason.clone(),
            });
        }
        let entry = self
            .anchors
            .get_mut(&anchor)
            .ok_or(EngineError::UnknownAnchor { anchor })?;
        entry.cloud_state = CloudAnchorState::TaskInProgress;
        self.host_requests.push((anchor, ttl_seconds));
        Ok(())
    }

    fn resolve_cloud_anchor(&mut self, cloud_anchor_id: &str) -> Result<AnchorId, EngineError> {
        if let Some(reason) = &self.reject_cloud {
            return Err(EngineError::CloudSubmission {
                reason: reason.clone(),
            });
        }
        self.resolve_requests.push(cloud_anchor_id.to_string());
        let id = self.insert_anchor(Pose::identity(), CloudAnchorState::TaskInProgress);
        if let Some(entry) = self.anchors.get_mut(&id) {
            entry.cloud_id = Some(cloud_anchor_id.to_string());
        }
        Ok(id)
    }

    fn cloud_anchor_state(&self, anchor: AnchorId) -> CloudAnchorState {
        self.anchors
            .get(&anchor)
            .map(|a| a.cloud_state)
            .unwrap_or(CloudAnchorState::None)
    }

    fn cloud_anchor_id(&self, anchor: AnchorId) -> Option<String> {
        self.anchors.get(&anchor).and_then(|a| a.cloud_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_lifecycle() {
        let mut session = MockArSession::new();
        let anchor = session
            .create_anchor(&Pose::from_translation(1.0, 0.0, -2.0))
            .unwrap();

        assert_eq!(
            session.anchor_tracking_state(anchor),
            TrackingState::Tracking
        );
        assert!(session.anchor_pose(anchor).is_some());

        session.detach_anchor(anchor);
        assert_eq!(session.anchor_tracking_state(anchor), TrackingState::Stopped);
        assert!(session.anchor_pose(anchor).is_none());
        assert_eq!(session.detached_anchors(), &[anchor]);
    }

    #[test]
    fn test_hosting_transitions_to_in_progress() {
        let mut session = MockArSession::new();
        let anchor = session.create_anchor(&Pose::identity()).unwrap();

        session.host_cloud_anchor(anchor, 300).unwrap();
        assert_eq!(
            session.cloud_anchor_state(anchor),
            CloudAnchorState::TaskInProgress
        );
        assert_eq!(session.host_requests(), &[(anchor, 300)]);

        session.finish_cloud_task(anchor, CloudAnchorState::Success, Some("ua-1234"));
        assert_eq!(session.cloud_anchor_state(anchor), CloudAnchorState::Success);
        assert_eq!(session.cloud_anchor_id(anchor).as_deref(), Some("ua-1234"));
    }

    #[test]
    fn test_queued_frames_are_returned_in_order() {
        let mut session = MockArSession::new();
        session.push_frame(Frame::tracking(0, Pose::from_translation(1.0, 0.0, 0.0)));

        let first = session.update().unwrap();
        assert_eq!(first.camera_pose.position.x, 1.0);
        assert_eq!(first.frame_index, 1);

        // Queue exhausted: synthesized frame from the configured camera pose.
        let second = session.update().unwrap();
        assert_eq!(second.camera_pose, Pose::identity());
        assert_eq!(second.frame_index, 2);
    }

    #[test]
    fn test_update_failure_injection() {
        let mut session = MockArSession::new();
        session.fail_updates(true);
        assert!(matches!(
            session.update(),
            Err(EngineError::CameraNotAvailable)
        ));
    }
}
