//! Single-flight refresh state and the pending request queue
//!
//! `RefreshState` is the only shared mutable state in the gateway. It holds:
//! - `refreshing`: whether a refresh call is in flight
//! - `pending`: FIFO queue of requests that hit a 401 during that refresh
//! - `epoch`: bumped every time a refresh settles, so a request that was
//!   sent before the refresh and answered after it is replayed directly
//!   instead of starting another refresh for the same expiry episode
//! - `last_failed`: whether the most recent refresh failed; such late
//!   requests then fail at once instead of replaying without a credential
//!
//! Every method takes the lock, mutates, and returns without awaiting, so a
//! check-and-set of `refreshing` is atomic with respect to every other
//! request regardless of runtime flavor.
//!
//! Transitions:
//! - Idle → Refreshing (first 401 of an expiry episode, `admit` → `Lead`)
//! - Refreshing → Refreshing (further 401s, `admit` → `Queued`)
//! - Refreshing → Idle (`settle`: `epoch` bumped, outcome recorded, queue
//!   drained FIFO)

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{GatewayError, Result};
use crate::request::{ApiResponse, RequestDescriptor};

/// A request suspended until the in-flight refresh settles.
#[derive(Debug)]
pub struct PendingRequest {
    pub request: RequestDescriptor,
    pub reply: oneshot::Sender<Result<ApiResponse>>,
}

impl PendingRequest {
    /// Resolve the waiting caller. A caller that gave up waiting is ignored.
    pub fn resolve(self, result: Result<ApiResponse>) {
        let _ = self.reply.send(result);
    }

    /// Whether the waiting caller is still there to receive a result.
    pub fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }
}

/// What a request that just got a 401 should do next.
#[derive(Debug)]
pub enum Admission {
    /// No refresh in flight: the caller must run one, then replay.
    Lead(RequestDescriptor),
    /// A refresh is in flight: wait for the queued request's result.
    Queued(oneshot::Receiver<Result<ApiResponse>>),
    /// A refresh succeeded after this request was sent: replay it right away
    /// with whatever credential the store now holds.
    Stale(RequestDescriptor),
    /// A refresh failed after this request was sent; the session is already
    /// over and the caller fails without replaying.
    Expired,
}

#[derive(Debug, Default)]
struct Inner {
    refreshing: bool,
    epoch: u64,
    last_failed: bool,
    pending: VecDeque<PendingRequest>,
}

/// Refresh flag, epoch counter, and pending queue for one gateway.
#[derive(Debug, Default)]
pub struct RefreshState {
    inner: Mutex<Inner>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Nothing panics while the lock is held; recover the data if it ever does.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Epoch to record just before dispatching a request.
    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Decide how a request dispatched at `dispatched_epoch` recovers from a 401.
    pub fn admit(&self, request: RequestDescriptor, dispatched_epoch: u64) -> Admission {
        let mut inner = self.lock();
        if inner.refreshing {
            let (reply, receiver) = oneshot::channel();
            inner.pending.push_back(PendingRequest { request, reply });
            debug!(queued = inner.pending.len(), "refresh in flight, request queued");
            Admission::Queued(receiver)
        } else if inner.epoch != dispatched_epoch {
            if inner.last_failed {
                Admission::Expired
            } else {
                Admission::Stale(request)
            }
        } else {
            inner.refreshing = true;
            Admission::Lead(request)
        }
    }

    /// End the current refresh and hand back the queue in arrival order.
    pub fn settle(&self, succeeded: bool) -> Vec<PendingRequest> {
        let mut inner = self.lock();
        inner.refreshing = false;
        inner.epoch += 1;
        inner.last_failed = !succeeded;
        inner.pending.drain(..).collect()
    }

    /// Take the queued requests without ending an in-flight refresh.
    ///
    /// Used on sign-out: waiters are failed right away while the refresh
    /// itself (if any) keeps sole ownership of the `refreshing` flag.
    pub fn take_pending(&self) -> Vec<PendingRequest> {
        self.lock().pending.drain(..).collect()
    }
}

/// Settles the refresh state if the refreshing task is dropped mid-flight.
///
/// Queued waiters then fail with `SessionExpired` and `refreshing` is clear
/// for the next 401.
pub(crate) struct SettleGuard<'a> {
    state: &'a RefreshState,
    armed: bool,
}

impl<'a> SettleGuard<'a> {
    pub(crate) fn new(state: &'a RefreshState) -> Self {
        Self { state, armed: true }
    }

    /// Settle explicitly and return the drained queue.
    pub(crate) fn settle(mut self, succeeded: bool) -> Vec<PendingRequest> {
        self.armed = false;
        self.state.settle(succeeded)
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let pending = self.state.settle(false);
        debug!(rejected = pending.len(), "refresh cancelled before settling");
        for waiter in pending {
            waiter.resolve(Err(GatewayError::SessionExpired(
                "token refresh was cancelled".into(),
            )));
        }
    }
}

/// Boxed future returned by `TokenRefresher::refresh`.
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = budget_auth::Result<String>> + Send + 'a>>;

/// The Refresh Endpoint collaborator: produces a new access token.
pub trait TokenRefresher: Send + Sync {
    fn refresh(&self) -> RefreshFuture<'_>;
}

/// Refreshes against `POST {base_url}/auth/refresh` using the ambient cookie.
pub struct HttpRefresher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRefresher {
    /// `client` must be the cookie-enabled client that performed the login.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl TokenRefresher for HttpRefresher {
    fn refresh(&self) -> RefreshFuture<'_> {
        Box::pin(async move {
            budget_auth::refresh_access_token(&self.client, &self.base_url)
                .await
                .map(|response| response.access_token)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str) -> RequestDescriptor {
        RequestDescriptor::get(path)
    }

    #[test]
    fn first_failure_leads_later_failures_queue() {
        let state = RefreshState::new();
        let epoch = state.epoch();

        assert!(matches!(state.admit(request("/a"), epoch), Admission::Lead(_)));
        assert!(state.is_refreshing());
        assert!(matches!(state.admit(request("/b"), epoch), Admission::Queued(_)));
        assert!(matches!(state.admit(request("/c"), epoch), Admission::Queued(_)));
        assert_eq!(state.pending_len(), 2);
    }

    #[test]
    fn settle_drains_in_arrival_order() {
        let state = RefreshState::new();
        let epoch = state.epoch();
        let _lead = state.admit(request("/lead"), epoch);
        let _receivers: Vec<_> = ["/1", "/2", "/3", "/4"]
            .iter()
            .map(|p| state.admit(request(p), epoch))
            .collect();

        let drained = state.settle(true);
        let paths: Vec<&str> = drained.iter().map(|p| p.request.path.as_str()).collect();
        assert_eq!(paths, vec!["/1", "/2", "/3", "/4"]);
        assert!(!state.is_refreshing());
        assert_eq!(state.pending_len(), 0);
    }

    #[test]
    fn settle_bumps_epoch_and_marks_old_requests_stale() {
        let state = RefreshState::new();
        let before = state.epoch();
        let _lead = state.admit(request("/a"), before);
        state.settle(true);

        assert_eq!(state.epoch(), before + 1);
        // Sent with the old token, answered after the refresh: replay, don't refresh
        assert!(matches!(state.admit(request("/late"), before), Admission::Stale(_)));
        assert!(!state.is_refreshing());
        // Sent with the new token and still rejected: a new episode
        assert!(matches!(state.admit(request("/new"), before + 1), Admission::Lead(_)));
    }

    #[test]
    fn late_request_after_failed_refresh_is_expired() {
        let state = RefreshState::new();
        let before = state.epoch();
        let _lead = state.admit(request("/a"), before);
        state.settle(false);

        assert!(matches!(state.admit(request("/late"), before), Admission::Expired));
        assert!(!state.is_refreshing());
        // A request sent after the failure starts a new episode
        assert!(matches!(state.admit(request("/new"), before + 1), Admission::Lead(_)));

        // A later successful refresh makes late requests replayable again
        state.settle(true);
        assert!(matches!(state.admit(request("/late"), before + 1), Admission::Stale(_)));
    }

    #[test]
    fn cancelled_refresh_counts_as_failed() {
        let state = RefreshState::new();
        let before = state.epoch();
        let _lead = state.admit(request("/a"), before);
        drop(SettleGuard::new(&state));

        assert!(matches!(state.admit(request("/late"), before), Admission::Expired));
    }

    #[tokio::test]
    async fn dropped_guard_rejects_waiters() {
        let state = RefreshState::new();
        let epoch = state.epoch();
        let _lead = state.admit(request("/lead"), epoch);
        let Admission::Queued(receiver) = state.admit(request("/waiter"), epoch) else {
            panic!("expected Queued");
        };

        drop(SettleGuard::new(&state));

        let result = receiver.await.unwrap();
        assert!(matches!(result, Err(GatewayError::SessionExpired(_))));
        assert!(!state.is_refreshing());
    }

    #[test]
    fn explicit_settle_disarms_guard() {
        let state = RefreshState::new();
        let epoch = state.epoch();
        let _lead = state.admit(request("/lead"), epoch);
        let guard = SettleGuard::new(&state);
        let drained = guard.settle(true);
        assert!(drained.is_empty());
        assert_eq!(state.epoch(), epoch + 1);
    }

    #[test]
    fn take_pending_leaves_refresh_in_flight() {
        let state = RefreshState::new();
        let epoch = state.epoch();
        let _lead = state.admit(request("/lead"), epoch);
        let _waiter = state.admit(request("/waiter"), epoch);

        assert_eq!(state.take_pending().len(), 1);
        assert!(state.is_refreshing());
        assert_eq!(state.pending_len(), 0);
    }

    #[test]
    fn abandoned_waiter_is_detectable() {
        let state = RefreshState::new();
        let epoch = state.epoch();
        let _lead = state.admit(request("/lead"), epoch);
        let receiver = state.admit(request("/gone"), epoch);
        drop(receiver);

        let drained = state.settle(true);
        assert_eq!(drained.len(), 1);
        assert!(drained[0].is_abandoned());
    }
}
