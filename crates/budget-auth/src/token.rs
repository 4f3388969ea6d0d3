//! Login, registration, token refresh, and logout
//!
//! All four calls POST JSON to the backend's `/auth/*` routes. Refresh sends
//! no body at all: the backend identifies the session from the refresh
//! cookie it set at login, so the `reqwest::Client` passed in must be the
//! same cookie-enabled client used for login.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use common::Secret;

use crate::constants::{JSON_MIME, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH, endpoint};
use crate::error::{Error, ErrorBody, Result, truncate_body};

/// Authenticated user as returned by login and `/user/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl User {
    /// "First Last" when both are known, otherwise the email address.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() => format!("{first} {last}"),
            (Some(first), _) if !first.is_empty() => first.to_string(),
            _ => self.email.clone(),
        }
    }
}

/// Successful `POST /auth/login` body.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "accessToken", alias = "access_token")]
    pub token: String,
    pub user: User,
}

/// Successful `POST /auth/refresh` body.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    #[serde(rename = "accessToken", alias = "token", alias = "access_token")]
    pub access_token: String,
}

/// `POST /auth/register` payload.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Successful `POST /auth/register` body.
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub user: User,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

/// Exchange email + password for a bearer token and the user profile.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &Secret<String>,
) -> Result<LoginResponse> {
    let response = client
        .post(endpoint(base_url, LOGIN_PATH))
        .header(ACCEPT, JSON_MIME)
        .json(&LoginBody {
            email,
            password: password.expose(),
        })
        .send()
        .await
        .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

    let response = reject_non_success(response, "Login failed").await?;
    let login = response
        .json::<LoginResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("invalid login response: {e}")))?;

    debug!(email, "login succeeded");
    Ok(login)
}

/// Create an account. The backend does not log the new user in.
pub async fn register(
    client: &reqwest::Client,
    base_url: &str,
    request: &RegisterRequest,
) -> Result<RegisterResponse> {
    let response = client
        .post(endpoint(base_url, REGISTER_PATH))
        .header(ACCEPT, JSON_MIME)
        .json(request)
        .send()
        .await
        .map_err(|e| Error::Http(format!("register request failed: {e}")))?;

    let response = reject_non_success(response, "Registration failed").await?;
    response
        .json::<RegisterResponse>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("invalid register response: {e}")))
}

/// Exchange the ambient refresh cookie for a new access token.
///
/// Any non-2xx status is a refresh failure; the caller decides what that
/// means for the session.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<RefreshResponse> {
    let response = client
        .post(endpoint(base_url, REFRESH_PATH))
        .header(ACCEPT, JSON_MIME)
        .header(CONTENT_TYPE, JSON_MIME)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::RefreshFailed(format!(
            "refresh endpoint returned {status}: {}",
            truncate_body(&body)
        )));
    }

    response
        .json::<RefreshResponse>()
        .await
        .map_err(|e| Error::RefreshFailed(format!("invalid refresh response: {e}")))
}

/// Invalidate the session server-side. `token` is attached when known.
pub async fn logout(client: &reqwest::Client, base_url: &str, token: Option<&str>) -> Result<()> {
    let mut request = client
        .post(endpoint(base_url, LOGOUT_PATH))
        .header(ACCEPT, JSON_MIME)
        .json(&serde_json::json!({}));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::Http(format!("logout request failed: {e}")))?;

    if let Err(e) = reject_non_success(response, "Logout failed").await {
        warn!(error = %e, "backend refused logout");
        return Err(e);
    }
    Ok(())
}

/// Pass 2xx responses through; turn anything else into `Error::Rejected`.
async fn reject_non_success(
    response: reqwest::Response,
    fallback: &str,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let parsed = ErrorBody::parse(&body);
    Err(Error::Rejected {
        status: status.as_u16(),
        message: parsed.message_or(&body, fallback),
        fields: parsed.fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use tokio::net::TcpListener;

    /// Start a fake backend and return its base URL.
    async fn start_backend(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn login_returns_token_and_user() {
        let app = axum::Router::new().route(
            LOGIN_PATH,
            post(|axum::Json(body): axum::Json<serde_json::Value>| async move {
                assert_eq!(body["email"], "ana@example.com");
                assert_eq!(body["password"], "s3cret");
                axum::Json(serde_json::json!({
                    "token": "at_login",
                    "user": {"id": "u1", "email": "ana@example.com", "firstName": "Ana", "lastName": "Silva"}
                }))
            }),
        );
        let base = start_backend(app).await;

        let login = login(
            &reqwest::Client::new(),
            &base,
            "ana@example.com",
            &Secret::new("s3cret".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(login.token, "at_login");
        assert_eq!(login.user.display_name(), "Ana Silva");
    }

    #[tokio::test]
    async fn login_rejection_carries_server_message() {
        let app = axum::Router::new().route(
            LOGIN_PATH,
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    axum::Json(serde_json::json!({"message": "Invalid email or password"})),
                )
            }),
        );
        let base = start_backend(app).await;

        let err = login(
            &reqwest::Client::new(),
            &base,
            "ana@example.com",
            &Secret::new("wrong".to_string()),
        )
        .await
        .unwrap_err();

        match err {
            Error::Rejected { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid email or password");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_surfaces_field_errors() {
        let app = axum::Router::new().route(
            REGISTER_PATH,
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    axum::Json(serde_json::json!({
                        "message": "Validation failed",
                        "errors": {"email": "already registered"}
                    })),
                )
            }),
        );
        let base = start_backend(app).await;

        let request = RegisterRequest {
            email: "ana@example.com".into(),
            password: "pw".into(),
            name: "Ana".into(),
        };
        let err = register(&reqwest::Client::new(), &base, &request)
            .await
            .unwrap_err();

        let Error::Rejected { status, fields, .. } = err else {
            panic!("expected Rejected");
        };
        assert_eq!(status, 400);
        assert_eq!(fields["email"], "already registered");
    }

    #[tokio::test]
    async fn refresh_accepts_access_token_field() {
        let app = axum::Router::new().route(
            REFRESH_PATH,
            post(|headers: HeaderMap| async move {
                assert_eq!(headers["content-type"], JSON_MIME);
                assert_eq!(headers["accept"], JSON_MIME);
                axum::Json(serde_json::json!({"accessToken": "at_fresh"}))
            }),
        );
        let base = start_backend(app).await;

        let refreshed = refresh_access_token(&reqwest::Client::new(), &base)
            .await
            .unwrap();
        assert_eq!(refreshed.access_token, "at_fresh");
    }

    #[tokio::test]
    async fn refresh_non_2xx_is_refresh_failure() {
        let app = axum::Router::new().route(
            REFRESH_PATH,
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = start_backend(app).await;

        let err = refresh_access_token(&reqwest::Client::new(), &base)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RefreshFailed(ref m) if m.contains("500")), "got: {err:?}");
    }

    #[tokio::test]
    async fn refresh_against_dead_backend_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = refresh_access_token(&reqwest::Client::new(), &base)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn logout_attaches_bearer_when_known() {
        let app = axum::Router::new().route(
            LOGOUT_PATH,
            post(|headers: HeaderMap| async move {
                if headers.get("authorization").and_then(|v| v.to_str().ok())
                    == Some("Bearer at_current")
                {
                    StatusCode::NO_CONTENT
                } else {
                    StatusCode::UNAUTHORIZED
                }
            }),
        );
        let base = start_backend(app).await;
        let client = reqwest::Client::new();

        logout(&client, &base, Some("at_current")).await.unwrap();
        let err = logout(&client, &base, None).await.unwrap_err();
        assert!(matches!(err, Error::Rejected { status: 401, .. }));
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user: User = serde_json::from_str(r#"{"email":"bo@example.com"}"#).unwrap();
        assert_eq!(user.display_name(), "bo@example.com");
    }
}
