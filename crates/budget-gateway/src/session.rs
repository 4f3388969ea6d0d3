//! Session expiry notification
//!
//! The gateway never navigates anywhere itself. When a session cannot be
//! recovered it clears the credential, fails the caller with
//! `GatewayError::SessionExpired`, and tells the host through this trait so
//! the host can send the user back to its login entry point.

/// Receives the "session is gone" signal.
pub trait SessionListener: Send + Sync {
    fn on_expired(&self);
}

/// Listener that ignores expiry. Hosts that only look at returned errors use this.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl SessionListener for NoopListener {
    fn on_expired(&self) {}
}

impl<F> SessionListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_expired(&self) {
        self()
    }
}
