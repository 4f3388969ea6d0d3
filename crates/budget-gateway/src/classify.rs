//! Response classification
//!
//! Maps an HTTP status and body to either success or a `GatewayError`.
//! 401 is the only status the gateway recovers from; everything else is
//! reported to the caller with whatever message the backend supplied.

use budget_auth::ErrorBody;

use crate::error::GatewayError;

/// Fallback message when the backend gives no usable error text
const GENERIC_FAILURE: &str = "request failed";

/// Classify a completed response.
///
/// - 2xx: `Ok(())`
/// - 401: `AuthenticationRequired`
/// - 400/422: `Validation` with the server message and field errors
/// - anything else: `Server` with the server message
pub fn classify_status(status: u16, body: &str) -> Result<(), GatewayError> {
    match status {
        200..=299 => Ok(()),
        401 => Err(GatewayError::AuthenticationRequired),
        400 | 422 => {
            let parsed = ErrorBody::parse(body);
            Err(GatewayError::Validation {
                status,
                message: parsed.message_or(body, GENERIC_FAILURE),
                fields: parsed.fields,
            })
        }
        _ => {
            let parsed = ErrorBody::parse(body);
            Err(GatewayError::Server {
                status,
                message: parsed.message_or(body, GENERIC_FAILURE),
            })
        }
    }
}

/// Metrics label for a classified outcome.
pub fn outcome_label(result: &Result<(), GatewayError>) -> &'static str {
    match result {
        Ok(()) => "success",
        Err(GatewayError::AuthenticationRequired) => "auth_failed",
        Err(GatewayError::Validation { .. }) => "validation",
        Err(_) => "server",
    }
}
