//! Authenticated Request Gateway
//!
//! Wraps every backend call made on behalf of a signed-in user:
//! - attaches `Authorization: Bearer <token>` read fresh from a `TokenStore`
//! - on a 401, runs at most one token refresh at a time and queues other
//!   failing requests until it settles
//! - replays queued requests in arrival order once the new token is stored
//! - on refresh failure clears the credential, fails every queued request
//!   with `SessionExpired`, and notifies the host's `SessionListener`

pub mod classify;
pub mod error;
pub mod gateway;
pub mod refresh;
pub mod request;
pub mod session;

pub use classify::classify_status;
pub use error::{GatewayError, Result};
pub use gateway::{
    DEFAULT_QUEUE_TIMEOUT, DEFAULT_REFRESH_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, Gateway,
    GatewayBuilder, GatewayConfig,
};
pub use refresh::{HttpRefresher, RefreshFuture, RefreshState, TokenRefresher};
pub use request::{ApiResponse, RequestDescriptor};
pub use session::{NoopListener, SessionListener};
