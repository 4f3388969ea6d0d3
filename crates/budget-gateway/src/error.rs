//! Error taxonomy for gateway requests

use std::collections::BTreeMap;

/// Errors surfaced by `Gateway::send`.
///
/// Only `AuthenticationRequired` is handled inside the gateway (it triggers
/// refresh and replay). Callers normally see it transformed into a replayed
/// response or into `SessionExpired`; every other variant reaches the caller
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure: connection refused, timeout, broken body.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered 401.
    #[error("authentication required")]
    AuthenticationRequired,

    /// Refresh failed, timed out, was cancelled, or a replayed request was
    /// still unauthorized. The credential has been cleared.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// 400/422 with the server's message and per-field errors.
    #[error("validation failed ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        fields: BTreeMap<String, String>,
    },

    /// Any other non-2xx status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The request descriptor could not be turned into an HTTP request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A 2xx body did not decode into the expected type.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The gateway could not be constructed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Whether the host should send the user to the login entry point.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, GatewayError::SessionExpired(_))
    }

    /// Upstream HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::AuthenticationRequired => Some(401),
            GatewayError::Validation { status, .. } | GatewayError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Short label for metrics and JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Network(_) => "network_error",
            GatewayError::AuthenticationRequired => "authentication_required",
            GatewayError::SessionExpired(_) => "session_expired",
            GatewayError::Validation { .. } => "validation_error",
            GatewayError::Server { .. } => "server_error",
            GatewayError::InvalidRequest(_) => "invalid_request",
            GatewayError::InvalidResponse(_) => "invalid_response",
            GatewayError::Configuration(_) => "configuration_error",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Network(e.to_string())
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_reported_for_response_errors_only() {
        assert_eq!(GatewayError::AuthenticationRequired.status(), Some(401));
        assert_eq!(
            GatewayError::Server {
                status: 503,
                message: "down".into()
            }
            .status(),
            Some(503)
        );
        assert_eq!(GatewayError::Network("refused".into()).status(), None);
        assert_eq!(GatewayError::SessionExpired("gone".into()).status(), None);
    }

    #[test]
    fn only_session_expired_requests_a_redirect() {
        assert!(GatewayError::SessionExpired("refresh failed".into()).is_session_expired());
        assert!(!GatewayError::AuthenticationRequired.is_session_expired());
        assert!(!GatewayError::Network("x".into()).is_session_expired());
    }

    #[test]
    fn display_includes_server_message() {
        let err = GatewayError::Validation {
            status: 422,
            message: "amount must be positive".into(),
            fields: BTreeMap::new(),
        };
        assert_eq!(
            err.to_string(),
            "validation failed (422): amount must be positive"
        );
        assert_eq!(err.kind(), "validation_error");
    }
}
