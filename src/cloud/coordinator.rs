//! Host/resolve request state machine
//!
//! The coordinator submits anchor hosting and resolution to the engine's
//! asynchronous cloud service and tracks every outstanding request in an
//! explicit record. Completion is discovered by polling: `on_update()` runs
//! once per rendered frame, checks each outstanding request's cloud state,
//! and dispatches its callback exactly once when a terminal state is
//! reached. Requests abandoned with `clear_listeners()` never fire.
//!
//! Submission never blocks and callbacks are never invoked synchronously
//! from a submit call; the earliest a callback can run is the next
//! `on_update()`.

use crate::core::constants::{MAX_HOST_TTL_SECONDS, MIN_HOST_TTL_SECONDS};
use crate::core::types::{AnchorId, CloudAnchorState};
use crate::engine::error::EngineError;
use crate::engine::session::ArSession;
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Completion callback invoked once per request with the anchor handle and
/// the terminal cloud state
pub type CloudAnchorCallback = Box<dyn FnOnce(AnchorId, CloudAnchorState) + Send>;

/// Handle identifying one outstanding host or resolve request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn new(id: u64) -> Self {
        RequestId(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Whether a request hosts a local anchor or resolves a cloud id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Host,
    Resolve,
}

/// Outstanding request record, owned by the coordinator until terminal
struct PendingCloudRequest {
    kind: RequestKind,
    anchor: AnchorId,
    submitted_at: Instant,
    on_complete: CloudAnchorCallback,
}

/// Errors from request submission
#[derive(Debug, Clone, PartialEq)]
pub enum CloudRequestError {
    /// The requested time-to-live is outside the service's supported range
    TtlOutOfRange { ttl_seconds: u32 },
    /// The engine rejected the submission
    Engine { error: EngineError },
}

impl fmt::Display for CloudRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudRequestError::TtlOutOfRange { ttl_seconds } => write!(
                f,
                "ttl {} outside supported range {}..={}",
                ttl_seconds, MIN_HOST_TTL_SECONDS, MAX_HOST_TTL_SECONDS
            ),
            CloudRequestError::Engine { error } => write!(f, "engine error: {}", error),
        }
    }
}

impl std::error::Error for CloudRequestError {}

impl From<EngineError> for CloudRequestError {
    fn from(error: EngineError) -> Self {
        CloudRequestError::Engine { error }
    }
}

/// Coordinator tuning parameters
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Optional watchdog: requests older than this are completed with
    /// `ErrorTimeout` instead of waiting on the service forever. Disabled
    /// by default; the engine's own terminal-state delivery is trusted.
    pub request_timeout: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
        }
    }
}

/// Tracks outstanding cloud-anchor requests and dispatches completions
///
/// Methods take `&mut self`; when frame updates and user actions run on
/// different threads, the owner serializes access with a single lock held
/// for the duration of each call (see `AnchorSessionController`).
pub struct CloudAnchorCoordinator {
    config: CoordinatorConfig,
    request_counter: u64,
    pending: HashMap<RequestId, PendingCloudRequest>,
}

impl CloudAnchorCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            request_counter: 0,
            pending: HashMap::new(),
        }
    }

    /// Begin hosting an anchor with the cloud service
    ///
    /// Validates the time-to-live, submits the asynchronous hosting call and
    /// registers a request record. Returns immediately; `on_complete` fires
    /// from a later `on_update()` once the service reports a terminal state,
    /// and never more than once.
    pub fn host_cloud_anchor(
        &mut self,
        session: &mut dyn ArSession,
        anchor: AnchorId,
        ttl_seconds: u32,
        on_complete: CloudAnchorCallback,
    ) -> Result<RequestId, CloudRequestError> {
        if !(MIN_HOST_TTL_SECONDS..=MAX_HOST_TTL_SECONDS).contains(&ttl_seconds) {
            return Err(CloudRequestError::TtlOutOfRange { ttl_seconds });
        }

        session.host_cloud_anchor(anchor, ttl_seconds)?;
        Ok(self.register(RequestKind::Host, anchor, on_complete))
    }

    /// Begin resolving a cloud anchor id
    ///
    /// Same contract as hosting. Callers are expected to reject empty ids
    /// before reaching this method; the id is forwarded to the engine
    /// verbatim.
    pub fn resolve_cloud_anchor(
        &mut self,
        session: &mut dyn ArSession,
        cloud_anchor_id: &str,
        on_complete: CloudAnchorCallback,
    ) -> Result<RequestId, CloudRequestError> {
        let anchor = session.resolve_cloud_anchor(cloud_anchor_id)?;
        Ok(self.register(RequestKind::Resolve, anchor, on_complete))
    }

    /// Poll outstanding requests and dispatch completed ones
    ///
    /// Called once per rendered frame. Tolerates an empty request set.
    /// Returns the number of callbacks dispatched.
    pub fn on_update(&mut self, session: &mut dyn ArSession) -> usize {
        if self.pending.is_empty() {
            return 0;
        }

        let timeout = self.config.request_timeout;
        let completed: Vec<(RequestId, CloudAnchorState)> = self
            .pending
            .iter()
            .filter_map(|(id, request)| {
                let state = session.cloud_anchor_state(request.anchor);
                if state.is_terminal() {
                    Some((*id, state))
                } else if timeout.is_some_and(|t| request.submitted_at.elapsed() >= t) {
                    Some((*id, CloudAnchorState::ErrorTimeout))
                } else {
                    None
                }
            })
            .collect();

        let dispatched = completed.len();
        for (id, state) in completed {
            // Removal before dispatch: the callback can never observe its
            // own request as still outstanding.
            if let Some(request) = self.pending.remove(&id) {
                debug!(
                    "cloud request {} ({:?}) for {} finished: {}",
                    id.id(),
                    request.kind,
                    request.anchor,
                    state
                );
                if state == CloudAnchorState::ErrorTimeout {
                    warn!(
                        "cloud request {} for {} expired after {:?}",
                        id.id(),
                        request.anchor,
                        request.submitted_at.elapsed()
                    );
                }
                (request.on_complete)(request.anchor, state);
            }
        }
        dispatched
    }

    /// Drop every outstanding request without notifying its callback
    ///
    /// Used when the scene is cleared. The underlying service calls may
    /// still complete; their results are discarded silently because no
    /// record remains to dispatch them.
    pub fn clear_listeners(&mut self) {
        if !self.pending.is_empty() {
            debug!("abandoning {} outstanding cloud request(s)", self.pending.len());
        }
        self.pending.clear();
    }

    /// Number of requests still awaiting a terminal state
    pub fn pending_request_count(&self) -> usize {
        self.pending.len()
    }

    fn register(
        &mut self,
        kind: RequestKind,
        anchor: AnchorId,
        on_complete: CloudAnchorCallback,
    ) -> RequestId {
        self.request_counter += 1;
        let id = RequestId::new(self.request_counter);
        self.pending.insert(
            id,
            PendingCloudRequest {
                kind,
                anchor,
                submitted_at: Instant::now(),
                on_complete,
            },
        );
        id
    }
}

impl Default for CloudAnchorCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Pose;
    use crate::engine::mock::MockArSession;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_callback(counter: &Arc<AtomicUsize>) -> CloudAnchorCallback {
        let counter = Arc::clone(counter);
        Box::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_host_rejects_out_of_range_ttl() {
        let mut session = MockArSession::new();
        let anchor = session.create_anchor(&Pose::identity()).unwrap();
        let mut coordinator = CloudAnchorCoordinator::default();

        for ttl in [0, 366, u32::MAX] {
            let result =
                coordinator.host_cloud_anchor(&mut session, anchor, ttl, Box::new(|_, _| {}));
            assert_eq!(
                result.unwrap_err(),
                CloudRequestError::TtlOutOfRange { ttl_seconds: ttl }
            );
        }

        // Nothing was submitted to the engine and nothing is outstanding.
        assert!(session.host_requests().is_empty());
        assert_eq!(coordinator.pending_request_count(), 0);
    }

    #[test]
    fn test_host_accepts_ttl_bounds() {
        let mut session = MockArSession::new();
        let mut coordinator = CloudAnchorCoordinator::default();

        for ttl in [1, 300, 365] {
            let anchor = session.create_anchor(&Pose::identity()).unwrap();
            coordinator
                .host_cloud_anchor(&mut session, anchor, ttl, Box::new(|_, _| {}))
                .unwrap();
        }
        assert_eq!(coordinator.pending_request_count(), 3);
    }

    #[test]
    fn test_callback_fires_once_after_terminal_state() {
        let mut session = MockArSession::new();
        let anchor = session.create_anchor(&Pose::identity()).unwrap();
        let mut coordinator = CloudAnchorCoordinator::default();

        let fired = Arc::new(AtomicUsize::new(0));
        coordinator
            .host_cloud_anchor(&mut session, anchor, 300, counting_callback(&fired))
            .unwrap();

        // Submission alone never dispatches.
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Three polls while the task is still in flight.
        for _ in 0..3 {
            assert_eq!(coordinator.on_update(&mut session), 0);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Terminal state lands; the fourth poll dispatches exactly once.
        session.finish_cloud_task(anchor, CloudAnchorState::Success, Some("ua-42"));
        assert_eq!(coordinator.on_update(&mut session), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_request_count(), 0);

        // Further polls find nothing to dispatch.
        assert_eq!(coordinator.on_update(&mut session), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_state_is_forwarded_verbatim() {
        let mut session = MockArSession::new();
        let anchor = session.create_anchor(&Pose::identity()).unwrap();
        let mut coordinator = CloudAnchorCoordinator::default();

        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&seen);
        coordinator
            .host_cloud_anchor(
                &mut session,
                anchor,
                300,
                Box::new(move |a, state| {
                    *sink.lock().unwrap() = Some((a, state));
                }),
            )
            .unwrap();

        session.finish_cloud_task(
            anchor,
            CloudAnchorState::ErrorHostingDatasetProcessingFailed,
            None,
        );
        coordinator.on_update(&mut session);

        assert_eq!(
            *seen.lock().unwrap(),
            Some((anchor, CloudAnchorState::ErrorHostingDatasetProcessingFailed))
        );
    }

    #[test]
    fn test_clear_listeners_abandons_without_dispatch() {
        let mut session = MockArSession::new();
        let anchor = session.create_anchor(&Pose::identity()).unwrap();
        let mut coordinator = CloudAnchorCoordinator::default();

        let fired = Arc::new(AtomicUsize::new(0));
        coordinator
            .host_cloud_anchor(&mut session, anchor, 300, counting_callback(&fired))
            .unwrap();

        coordinator.clear_listeners();
        assert_eq!(coordinator.pending_request_count(), 0);

        // The engine finishes the abandoned task later; no callback fires.
        session.finish_cloud_task(anchor, CloudAnchorState::Success, Some("ua-7"));
        assert_eq!(coordinator.on_update(&mut session), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_on_update_with_no_requests_is_noop() {
        let mut session = MockArSession::new();
        let mut coordinator = CloudAnchorCoordinator::default();
        assert_eq!(coordinator.on_update(&mut session), 0);
    }

    #[test]
    fn test_resolve_dispatches_with_resolved_anchor() {
        let mut session = MockArSession::new();
        let mut coordinator = CloudAnchorCoordinator::default();

        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&seen);
        coordinator
            .resolve_cloud_anchor(
                &mut session,
                "short-code-1",
                Box::new(move |a, state| {
                    *sink.lock().unwrap() = Some((a, state));
                }),
            )
            .unwrap();

        assert_eq!(session.resolve_requests(), &["short-code-1".to_string()]);

        // The mock created the anchor being populated; finish it.
        let anchor = AnchorId::new(1);
        session.finish_cloud_task(anchor, CloudAnchorState::Success, None);
        coordinator.on_update(&mut session);

        assert_eq!(
            *seen.lock().unwrap(),
            Some((anchor, CloudAnchorState::Success))
        );
    }

    #[test]
    fn test_concurrent_requests_complete_independently() {
        let mut session = MockArSession::new();
        let a = session.create_anchor(&Pose::identity()).unwrap();
        let b = session.create_anchor(&Pose::identity()).unwrap();
        let mut coordinator = CloudAnchorCoordinator::default();

        let fired_a = Arc::new(AtomicUsize::new(0));
        let fired_b = Arc::new(AtomicUsize::new(0));
        coordinator
            .host_cloud_anchor(&mut session, a, 300, counting_callback(&fired_a))
            .unwrap();
        coordinator
            .host_cloud_anchor(&mut session, b, 300, counting_callback(&fired_b))
            .unwrap();
        assert_eq!(coordinator.pending_request_count(), 2);

        session.finish_cloud_task(b, CloudAnchorState::Success, Some("ua-b"));
        assert_eq!(coordinator.on_update(&mut session), 1);
        assert_eq!(fired_a.load(Ordering::SeqCst), 0);
        assert_eq!(fired_b.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_request_count(), 1);

        session.finish_cloud_task(a, CloudAnchorState::ErrorServiceUnavailable, None);
        assert_eq!(coordinator.on_update(&mut session), 1);
        assert_eq!(fired_a.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_request_count(), 0);
    }

    #[test]
    fn test_watchdog_times_out_stalled_request() {
        let mut session = MockArSession::new();
        let anchor = session.create_anchor(&Pose::identity()).unwrap();
        let mut coordinator = CloudAnchorCoordinator::new(CoordinatorConfig {
            request_timeout: Some(Duration::from_millis(0)),
        });

        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&seen);
        coordinator
            .host_cloud_anchor(
                &mut session,
                anchor,
                300,
                Box::new(move |a, state| {
                    *sink.lock().unwrap() = Some((a, state));
                }),
            )
            .unwrap();

        // The engine never reports a terminal state; the zero-length
        // watchdog expires on the first poll.
        coordinator.on_update(&mut session);
        assert_eq!(
            *seen.lock().unwrap(),
            Some((anchor, CloudAnchorState::ErrorTimeout))
        );
        assert_eq!(coordinator.pending_request_count(), 0);
    }
}
