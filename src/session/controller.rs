//! Current-anchor state machine driven by frames and user actions
//!
//! The controller owns the engine session, the cloud coordinator and the
//! anchor registry behind one coarse mutex. Frame ticks (render context)
//! and user actions (UI context) both acquire that lock for the duration of
//! the call and never re-enter it: completion callbacks registered with the
//! coordinator only push onto a small shared queue, which the frame tick
//! drains in the same pass.

use crate::cloud::coordinator::{
    CloudAnchorCallback, CloudAnchorCoordinator, CloudRequestError, CoordinatorConfig,
};
use crate::core::types::{AnchorId, CloudAnchorState, EarthState, Pose, TrackingState};
use crate::engine::error::EngineError;
use crate::engine::session::{ArSession, Frame};
use crate::geodesy;
use crate::scene::AnchorRegistry;
use crate::utils::config::SessionConfig;
use log::{debug, error};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Upper bound on undelivered status messages; the oldest are dropped first
const MAX_QUEUED_MESSAGES: usize = 32;

/// Observable state of the current-anchor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No current anchor
    Empty,
    /// A local anchor is placed but not yet hosted
    Placed,
    /// A hosting request is outstanding
    Hosting,
    /// The current anchor is hosted in the cloud
    Hosted,
    /// A resolve request is outstanding
    Resolving,
    /// The current anchor was resolved from a cloud id
    Resolved,
}

/// Current-anchor slot with the anchor each state carries
#[derive(Debug, Clone, Copy)]
enum AnchorSlot {
    Empty,
    Placed {
        anchor: AnchorId,
    },
    Hosting {
        /// The placed anchor still being rendered while hosting runs
        placed: AnchorId,
    },
    Hosted {
        anchor: AnchorId,
    },
    Resolving,
    Resolved {
        anchor: AnchorId,
    },
}

impl AnchorSlot {
    fn state(&self) -> SlotState {
        match self {
            AnchorSlot::Empty => SlotState::Empty,
            AnchorSlot::Placed { .. } => SlotState::Placed,
            AnchorSlot::Hosting { .. } => SlotState::Hosting,
            AnchorSlot::Hosted { .. } => SlotState::Hosted,
            AnchorSlot::Resolving => SlotState::Resolving,
            AnchorSlot::Resolved { .. } => SlotState::Resolved,
        }
    }

    /// The anchor the renderer should draw, if any
    fn drawable_anchor(&self) -> Option<AnchorId> {
        match self {
            AnchorSlot::Empty | AnchorSlot::Resolving => None,
            AnchorSlot::Placed { anchor }
            | AnchorSlot::Hosted { anchor }
            | AnchorSlot::Resolved { anchor } => Some(*anchor),
            AnchorSlot::Hosting { placed } => Some(*placed),
        }
    }
}

/// Severity of a user-facing status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// Human-readable status line for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

/// Errors from user-triggered session operations
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// An empty short code was submitted for resolution
    EmptyShortCode,
    /// The operation needs an empty current-anchor slot
    SlotOccupied { state: SlotState },
    /// Saving requires a placed, un-hosted anchor
    NoPlacedAnchor { state: SlotState },
    /// Earth-relative localization is unavailable
    EarthNotEnabled { state: EarthState },
    /// The earth subsystem exists but is not currently tracking
    EarthNotTracking { state: TrackingState },
    /// The engine failed mid-operation
    Engine { error: EngineError },
    /// Cloud request submission failed
    Cloud { error: CloudRequestError },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::EmptyShortCode => write!(f, "empty cloud anchor short code"),
            SessionError::SlotOccupied { state } => {
                write!(f, "current anchor slot occupied ({:?})", state)
            }
            SessionError::NoPlacedAnchor { state } => {
                write!(f, "no placed anchor to save ({:?})", state)
            }
            SessionError::EarthNotEnabled { state } => {
                write!(f, "earth tracking unavailable ({:?})", state)
            }
            SessionError::EarthNotTracking { state } => {
                write!(f, "earth tracking not ready ({:?})", state)
            }
            SessionError::Engine { error } => write!(f, "engine error: {}", error),
            SessionError::Cloud { error } => write!(f, "cloud request error: {}", error),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<EngineError> for SessionError {
    fn from(error: EngineError) -> Self {
        SessionError::Engine { error }
    }
}

impl From<CloudRequestError> for SessionError {
    fn from(error: CloudRequestError) -> Self {
        SessionError::Cloud { error }
    }
}

/// Completed cloud request carried from the coordinator callback to the
/// frame tick that applies it
enum CompletionEvent {
    Host {
        anchor: AnchorId,
        state: CloudAnchorState,
    },
    Resolve {
        anchor: AnchorId,
        state: CloudAnchorState,
        cloud_anchor_id: String,
    },
}

type CompletionQueue = Arc<Mutex<VecDeque<CompletionEvent>>>;

fn lock_queue(queue: &Mutex<VecDeque<CompletionEvent>>) -> MutexGuard<'_, VecDeque<CompletionEvent>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct ControllerInner<S> {
    session: S,
    coordinator: CloudAnchorCoordinator,
    registry: AnchorRegistry,
    slot: AnchorSlot,
    /// Geodetic anchor created by the last save; replaced on each save
    geospatial_anchor: Option<AnchorId>,
    /// Camera pose from the most recent frame, used by the save path
    last_camera_pose: Pose,
    /// Placement requested by the UI, honored at most once per frame tick
    placement_requested: bool,
    completions: CompletionQueue,
    messages: VecDeque<StatusMessage>,
    config: SessionConfig,
}

/// Orchestrates anchor placement, hosting and resolution over the live
/// frame stream
///
/// All mutating entry points are mutually exclusive: one mutex guards the
/// combined {session, current-anchor slot, outstanding requests, registry},
/// held for the duration of each call.
pub struct AnchorSessionController<S: ArSession> {
    inner: Mutex<ControllerInner<S>>,
}

impl<S: ArSession> AnchorSessionController<S> {
    pub fn new(session: S, config: SessionConfig) -> Self {
        let coordinator = CloudAnchorCoordinator::new(CoordinatorConfig {
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
        });
        Self {
            inner: Mutex::new(ControllerInner {
                session,
                coordinator,
                registry: AnchorRegistry::new(),
                slot: AnchorSlot::Empty,
                geospatial_anchor: None,
                last_camera_pose: Pose::identity(),
                placement_requested: false,
                completions: Arc::new(Mutex::new(VecDeque::new())),
                messages: VecDeque::new(),
                config,
            }),
        }
    }

    /// Advance the session by one frame
    ///
    /// Pulls the next frame, polls outstanding cloud requests, applies their
    /// completions, honors at most one queued placement attempt, and checks
    /// tracking of the current anchor. Returns the pose to draw the virtual
    /// object at, or `None` when nothing should be drawn. Failures inside
    /// the frame path are logged and the frame is skipped; they never
    /// propagate to the render loop.
    pub fn on_frame(&self) -> Option<Pose> {
        self.lock().frame_tick()
    }

    /// Request a placement at the next frame's best surface hit
    ///
    /// Honored only while the current-anchor slot is empty and the camera is
    /// tracking; at most one placement attempt runs per frame tick even if
    /// several hits (or several requests) are queued.
    pub fn place_anchor(&self) {
        self.lock().placement_requested = true;
    }

    /// Save the placed anchor as a geodetic cloud anchor
    ///
    /// Requires a placed anchor and an enabled, tracking earth subsystem.
    /// On success the slot moves to `Hosting` and completion arrives via a
    /// later frame tick. Every failure leaves the slot where it was so the
    /// user can retry.
    pub fn save(&self) -> Result<(), SessionError> {
        let mut inner = self.lock();
        match inner.save_placed_anchor() {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("anchor save failed: {}", e);
                let text = match &e {
                    SessionError::NoPlacedAnchor { .. } => {
                        "Place an anchor before saving".to_string()
                    }
                    SessionError::EarthNotEnabled { state } => {
                        format!("Earth tracking unavailable ({:?})", state)
                    }
                    SessionError::EarthNotTracking { .. } => {
                        "Earth tracking not ready yet".to_string()
                    }
                    _ => "Anchor not saved".to_string(),
                };
                inner.push_message(Severity::Error, text);
                Err(e)
            }
        }
    }

    /// Resolve a previously hosted anchor from its short code
    ///
    /// Empty codes are rejected immediately with a user-visible message and
    /// no cloud call.
    pub fn resolve(&self, short_code: &str) -> Result<(), SessionError> {
        let mut inner = self.lock();

        if short_code.is_empty() {
            inner.push_message(
                Severity::Error,
                format!("Anchor not found: {}", short_code),
            );
            return Err(SessionError::EmptyShortCode);
        }

        match inner.begin_resolve(short_code) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("anchor resolve failed: {}", e);
                inner.push_message(
                    Severity::Error,
                    format!("Error resolving anchor {}: {}", short_code, e),
                );
                Err(e)
            }
        }
    }

    /// Clear the current anchor and abandon outstanding cloud requests
    ///
    /// Abandoned requests never invoke their callbacks; their eventual
    /// results are discarded.
    pub fn clear(&self) {
        let mut inner = self.lock();
        if let Some(earth) = inner.geospatial_anchor.take() {
            inner.session.detach_anchor(earth);
        }
        if let AnchorSlot::Resolved { anchor } = inner.slot {
            inner.session.detach_anchor(anchor);
        }
        inner.coordinator.clear_listeners();
        lock_queue(&inner.completions).clear();
        inner.slot = AnchorSlot::Empty;
        inner.placement_requested = false;
        debug!("anchor scene cleared");
    }

    /// Observable state of the current-anchor slot
    pub fn slot_state(&self) -> SlotState {
        self.lock().slot.state()
    }

    /// The anchor currently rendered, if any
    pub fn current_anchor(&self) -> Option<AnchorId> {
        self.lock().slot.drawable_anchor()
    }

    /// Snapshot of every anchor created this session, in creation order
    pub fn anchors(&self) -> Vec<AnchorId> {
        self.lock().registry.all().to_vec()
    }

    /// Number of cloud requests still awaiting a terminal state
    pub fn pending_request_count(&self) -> usize {
        self.lock().coordinator.pending_request_count()
    }

    /// Drain the accumulated user-facing status messages
    pub fn take_messages(&self) -> Vec<StatusMessage> {
        self.lock().messages.drain(..).collect()
    }

    /// Run a closure against the owned session (tests and diagnostics)
    pub fn with_session<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.lock().session)
    }

    fn lock(&self) -> MutexGuard<'_, ControllerInner<S>> {
        // Recover the guard if a previous holder panicked; the state is
        // only ever mutated through these entry points.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: ArSession> ControllerInner<S> {
    fn frame_tick(&mut self) -> Option<Pose> {
        let frame = match self.session.update() {
            Ok(frame) => frame,
            Err(e) => {
                error!("frame update failed: {}", e);
                return None;
            }
        };
        self.last_camera_pose = frame.camera_pose.clone();

        if self.session.earth_tracking_state() == TrackingState::Stopped {
            error!(
                "earth tracking stopped ({:?})",
                self.session.earth_state()
            );
        }

        self.coordinator.on_update(&mut self.session);
        self.apply_completions();

        // One placement attempt per tick, whatever number of requests or
        // hits arrived in between.
        if std::mem::take(&mut self.placement_requested) {
            self.try_place(&frame);
        }

        if frame.camera_tracking_state != TrackingState::Tracking {
            debug!(
                "camera not tracking ({:?}); skipping draw",
                frame.camera_tracking_state
            );
            return None;
        }

        let anchor = self.slot.drawable_anchor()?;
        match self.session.anchor_tracking_state(anchor) {
            TrackingState::Tracking => self.session.anchor_pose(anchor),
            TrackingState::Stopped => {
                error!("{} tracking stopped; object lost", anchor);
                None
            }
            TrackingState::Paused => None,
        }
    }

    fn try_place(&mut self, frame: &Frame) {
        if self.slot.state() != SlotState::Empty {
            return;
        }
        if frame.camera_tracking_state != TrackingState::Tracking {
            return;
        }

        // Hits arrive nearest first; take the first one that can carry an
        // anchor and ignore the rest.
        for hit in &frame.hits {
            if !hit.supports_anchor() {
                continue;
            }
            match self.session.create_anchor(&hit.hit_pose) {
                Ok(anchor) => {
                    self.registry.add(anchor);
                    debug!(
                        "placed {} at {:.2} m on {:?}",
                        anchor, hit.distance, hit.trackable
                    );
                    self.slot = AnchorSlot::Placed { anchor };
                }
                Err(e) => error!("anchor creation failed: {}", e),
            }
            return;
        }
    }

    fn save_placed_anchor(&mut self) -> Result<(), SessionError> {
        let placed = match &self.slot {
            AnchorSlot::Placed { anchor } => *anchor,
            other => {
                return Err(SessionError::NoPlacedAnchor {
                    state: other.state(),
                })
            }
        };

        let earth_state = self.session.earth_state();
        if earth_state != EarthState::Enabled {
            return Err(SessionError::EarthNotEnabled { state: earth_state });
        }
        let earth_tracking = self.session.earth_tracking_state();
        if earth_tracking != TrackingState::Tracking {
            return Err(SessionError::EarthNotTracking {
                state: earth_tracking,
            });
        }

        // Only one geodetic anchor exists at a time; a re-save replaces the
        // previous one.
        if let Some(old) = self.geospatial_anchor.take() {
            self.session.detach_anchor(old);
        }

        let camera_geospatial = self.session.camera_geospatial_pose()?;
        debug!(
            "camera geodetic position: lat={}, lon={}, alt={}",
            camera_geospatial.latitude, camera_geospatial.longitude, camera_geospatial.altitude
        );

        let anchor_pose =
            self.session
                .anchor_pose(placed)
                .ok_or(SessionError::Engine {
                    error: EngineError::UnknownAnchor { anchor: placed },
                })?;
        debug!(
            "anchor local position: ({}, {}, {})",
            anchor_pose.position.x, anchor_pose.position.y, anchor_pose.position.z
        );
        debug!(
            "anchor distance: {} m",
            geodesy::distance(&self.last_camera_pose, &anchor_pose)
        );

        // Diagnostic estimate alongside the engine's authoritative
        // conversion below.
        match geodesy::estimate_geodetic_offset(
            &camera_geospatial,
            &self.last_camera_pose,
            &anchor_pose,
        ) {
            Ok(estimate) => debug!(
                "anchor offset estimate: lat={}, lon={}",
                estimate.latitude, estimate.longitude
            ),
            Err(e) => debug!("anchor offset estimate unavailable: {}", e),
        }

        let geospatial = self.session.geospatial_pose_of(&anchor_pose)?;
        let earth_anchor = self.session.create_earth_anchor(
            geospatial.latitude,
            geospatial.longitude,
            geospatial.altitude,
            geospatial.east_up_south_quaternion,
        )?;
        self.registry.add(earth_anchor);
        self.geospatial_anchor = Some(earth_anchor);

        self.push_message(Severity::Info, "Now hosting anchor...".to_string());

        let callback = self.host_completion_callback();
        self.coordinator.host_cloud_anchor(
            &mut self.session,
            earth_anchor,
            self.config.host_ttl_seconds,
            callback,
        )?;

        self.slot = AnchorSlot::Hosting { placed };
        Ok(())
    }

    fn begin_resolve(&mut self, short_code: &str) -> Result<(), SessionError> {
        if self.slot.state() != SlotState::Empty {
            return Err(SessionError::SlotOccupied {
                state: self.slot.state(),
            });
        }

        let callback = self.resolve_completion_callback(short_code);
        self.coordinator
            .resolve_cloud_anchor(&mut self.session, short_code, callback)?;

        self.slot = AnchorSlot::Resolving;
        Ok(())
    }

    fn host_completion_callback(&self) -> CloudAnchorCallback {
        let queue = Arc::clone(&self.completions);
        Box::new(move |anchor, state| {
            lock_queue(&queue).push_back(CompletionEvent::Host { anchor, state });
        })
    }

    fn resolve_completion_callback(&self, short_code: &str) -> CloudAnchorCallback {
        let queue = Arc::clone(&self.completions);
        let cloud_anchor_id = short_code.to_string();
        Box::new(move |anchor, state| {
            lock_queue(&queue).push_back(CompletionEvent::Resolve {
                anchor,
                state,
                cloud_anchor_id,
            });
        })
    }

    fn apply_completions(&mut self) {
        loop {
            let event = match lock_queue(&self.completions).pop_front() {
                Some(event) => event,
                None => return,
            };
            match event {
                CompletionEvent::Host { anchor, state } => self.apply_host_result(anchor, state),
                CompletionEvent::Resolve {
                    anchor,
                    state,
                    cloud_anchor_id,
                } => self.apply_resolve_result(anchor, state, &cloud_anchor_id),
            }
        }
    }

    fn apply_host_result(&mut self, anchor: AnchorId, state: CloudAnchorState) {
        if state == CloudAnchorState::Success {
            let cloud_id = self.session.cloud_anchor_id(anchor).unwrap_or_default();
            self.push_message(Severity::Info, format!("Anchor hosted: {}", cloud_id));
            self.slot = AnchorSlot::Hosted { anchor };
        } else {
            self.push_message(Severity::Error, format!("Error hosting anchor: {}", state));
            // Back to the placed anchor so the user can retry the save.
            if let AnchorSlot::Hosting { placed } = self.slot {
                self.slot = AnchorSlot::Placed { anchor: placed };
            }
        }
    }

    fn apply_resolve_result(
        &mut self,
        anchor: AnchorId,
        state: CloudAnchorState,
        cloud_anchor_id: &str,
    ) {
        if state == CloudAnchorState::Success {
            self.push_message(
                Severity::Info,
                format!("Anchor resolved: {}", cloud_anchor_id),
            );
            self.registry.add(anchor);
            self.slot = AnchorSlot::Resolved { anchor };
        } else {
            self.push_message(
                Severity::Error,
                format!("Error resolving anchor {}: {}", cloud_anchor_id, state),
            );
            self.slot = AnchorSlot::Empty;
        }
    }

    fn push_message(&mut self, severity: Severity, text: String) {
        if self.messages.len() >= MAX_QUEUED_MESSAGES {
            self.messages.pop_front();
        }
        self.messages.push_back(StatusMessage { severity, text });
    }
}
