//! Mapping backend failures onto dashboard HTTP responses
//!
//! `SessionExpired` sends the browser back to the login entry point with a
//! 303. Everything else becomes a JSON body:
//! `{"error":{"type":"...","message":"...","fields":{...},"request_id":"req_..."}}`

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use budget_auth::LOGIN_ENTRY_POINT;
use budget_gateway::GatewayError;
use tracing::{info, warn};

/// Handler error.
#[derive(Debug)]
pub enum AppError {
    Gateway(GatewayError),
    Auth(budget_auth::Error),
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        AppError::Gateway(e)
    }
}

impl From<budget_auth::Error> for AppError {
    fn from(e: budget_auth::Error) -> Self {
        AppError::Auth(e)
    }
}

pub fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

/// JSON error response with an optional per-field error map.
pub fn error_response(
    status: StatusCode,
    kind: &str,
    message: &str,
    fields: &BTreeMap<String, String>,
    request_id: &str,
) -> Response {
    let mut error = serde_json::json!({
        "type": kind,
        "message": message,
        "request_id": request_id,
    });
    if !fields.is_empty() {
        error["fields"] = serde_json::json!(fields);
    }
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        serde_json::json!({ "error": error }).to_string(),
    )
        .into_response()
}

fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}

impl AppError {
    /// Status, type label, message and field errors for the JSON body.
    fn parts(&self) -> (StatusCode, &'static str, String, BTreeMap<String, String>) {
        let no_fields = BTreeMap::new;
        match self {
            AppError::Gateway(e) => match e {
                GatewayError::Network(_) => (StatusCode::BAD_GATEWAY, e.kind(), e.to_string(), no_fields()),
                GatewayError::AuthenticationRequired | GatewayError::SessionExpired(_) => {
                    (StatusCode::UNAUTHORIZED, e.kind(), e.to_string(), no_fields())
                }
                GatewayError::Validation {
                    message, fields, ..
                } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    e.kind(),
                    message.clone(),
                    fields.clone(),
                ),
                GatewayError::Server { status, message } => {
                    (upstream_status(*status), e.kind(), message.clone(), no_fields())
                }
                GatewayError::InvalidRequest(_) => {
                    (StatusCode::BAD_REQUEST, e.kind(), e.to_string(), no_fields())
                }
                GatewayError::InvalidResponse(_) => {
                    (StatusCode::BAD_GATEWAY, e.kind(), e.to_string(), no_fields())
                }
                GatewayError::Configuration(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    e.kind(),
                    e.to_string(),
                    no_fields(),
                ),
            },
            AppError::Auth(e) => match e {
                budget_auth::Error::Rejected {
                    status,
                    message,
                    fields,
                } => (
                    upstream_status(*status),
                    "auth_rejected",
                    message.clone(),
                    fields.clone(),
                ),
                budget_auth::Error::Http(_) => {
                    (StatusCode::BAD_GATEWAY, "network_error", e.to_string(), no_fields())
                }
                budget_auth::Error::RefreshFailed(_) => {
                    (StatusCode::UNAUTHORIZED, "session_expired", e.to_string(), no_fields())
                }
                budget_auth::Error::InvalidResponse(_) => {
                    (StatusCode::BAD_GATEWAY, "invalid_response", e.to_string(), no_fields())
                }
                budget_auth::Error::CredentialParse(_) | budget_auth::Error::Io(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "credential_store_error",
                    e.to_string(),
                    no_fields(),
                ),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Gateway(GatewayError::SessionExpired(reason)) = &self {
            info!(reason = %reason, "session expired, redirecting to login");
            return Redirect::to(LOGIN_ENTRY_POINT).into_response();
        }

        let request_id = new_request_id();
        let (status, kind, message, fields) = self.parts();
        warn!(request_id = %request_id, status = status.as_u16(), kind, message = %message, "request failed");
        error_response(status, kind, &message, &fields, &request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn session_expired_redirects_to_login() {
        let response =
            AppError::from(GatewayError::SessionExpired("refresh failed".into())).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], LOGIN_ENTRY_POINT);
    }

    #[tokio::test]
    async fn validation_error_carries_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("amount".to_string(), "must be positive".to_string());
        let response = AppError::from(GatewayError::Validation {
            status: 400,
            message: "Validation failed".into(),
            fields,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "validation_error");
        assert_eq!(body["error"]["message"], "Validation failed");
        assert_eq!(body["error"]["fields"]["amount"], "must be positive");
        assert!(body["error"]["request_id"].as_str().unwrap().starts_with("req_"));
    }

    #[tokio::test]
    async fn network_error_is_bad_gateway() {
        let response =
            AppError::from(GatewayError::Network("connection refused".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "network_error");
        assert!(body["error"].get("fields").is_none());
    }

    #[tokio::test]
    async fn server_error_keeps_upstream_status() {
        let response = AppError::from(GatewayError::Server {
            status: 404,
            message: "Goal not found".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["message"], "Goal not found");
    }

    #[tokio::test]
    async fn authentication_required_is_401() {
        let response = AppError::from(GatewayError::AuthenticationRequired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejected_login_keeps_status_and_message() {
        let response = AppError::from(budget_auth::Error::Rejected {
            status: 401,
            message: "Invalid email or password".into(),
            fields: BTreeMap::new(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["type"], "auth_rejected");
        assert_eq!(body["error"]["message"], "Invalid email or password");
    }
}
