//! Route protection
//!
//! Decides, per inbound request, whether the visitor may reach the route:
//! - `/health` and `/metrics` are always reachable
//! - without a Session Credential, anything outside `/auth` redirects to the
//!   login entry point, remembering where the visitor was headed
//! - with a credential, the `/auth` pages (GET) redirect home
//!
//! `route_decision` is pure; `guard` is the axum middleware around it.

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use budget_auth::LOGIN_ENTRY_POINT;
use tracing::{debug, warn};

use crate::state::AppState;

/// Routes that bypass authentication entirely
const EXEMPT_PATHS: &[&str] = &["/health", "/metrics"];

/// Prefix of the login/register/logout routes
const AUTH_PREFIX: &str = "/auth";

const HOME: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// Redirect to this login URL
    Login(String),
    Home,
}

pub fn route_decision(path: &str, method: &Method, authenticated: bool) -> RouteDecision {
    if EXEMPT_PATHS.contains(&path) {
        return RouteDecision::Allow;
    }
    let is_auth_route = path == AUTH_PREFIX || path.starts_with("/auth/");

    if is_auth_route {
        if authenticated && method == Method::GET {
            return RouteDecision::Home;
        }
        return RouteDecision::Allow;
    }

    if !authenticated {
        return RouteDecision::Login(login_url(path));
    }
    RouteDecision::Allow
}

/// `/auth/login?redirect=<path>`, form-encoded.
pub fn login_url(path: &str) -> String {
    match serde_urlencoded::to_string([("redirect", path)]) {
        Ok(query) => format!("{LOGIN_ENTRY_POINT}?{query}"),
        Err(e) => {
            warn!(error = %e, "could not encode login redirect");
            LOGIN_ENTRY_POINT.to_string()
        }
    }
}

/// Post-login target: only same-site absolute paths are honoured.
pub fn safe_redirect(target: Option<&str>) -> &str {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.contains('\\') => t,
        _ => HOME,
    }
}

/// axum middleware applying `route_decision`.
pub async fn guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if EXEMPT_PATHS.contains(&path) {
        return next.run(request).await;
    }

    let authenticated = state.gateway().is_authenticated().await;
    match route_decision(path, request.method(), authenticated) {
        RouteDecision::Allow => next.run(request).await,
        RouteDecision::Login(location) => {
            debug!(path, "no session credential, redirecting to login");
            Redirect::temporary(&location).into_response()
        }
        RouteDecision::Home => Redirect::temporary(HOME).into_response(),
    }
}
