//! Session expiry bookkeeping for the dashboard process

use std::sync::atomic::{AtomicU64, Ordering};

use budget_gateway::SessionListener;
use tracing::warn;

/// Counts sessions the gateway gave up on.
///
/// The browser-facing redirect is produced per request by `AppError`; this
/// listener only records that the process lost its session.
#[derive(Debug, Default)]
pub struct SessionTracker {
    expired: AtomicU64,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expired_total(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }
}

impl SessionListener for SessionTracker {
    fn on_expired(&self) {
        let total = self.expired.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(expired_total = total, "session expired, sign-in required");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_expirations_through_trait_object() {
        let tracker = Arc::new(SessionTracker::new());
        let listener: Arc<dyn SessionListener> = tracker.clone();

        listener.on_expired();
        listener.on_expired();
        assert_eq!(tracker.expired_total(), 2);
    }
}
