//! Backend auth routes and shared header values
//!
//! Paths are relative to the configured API base URL. `LOGIN_ENTRY_POINT`
//! is the dashboard-side route a host navigates to when the session ends;
//! it happens to share the backend's login path.

/// Exchange email + password for a bearer token
pub const LOGIN_PATH: &str = "/auth/login";

/// Create a new account
pub const REGISTER_PATH: &str = "/auth/register";

/// Exchange the ambient refresh cookie for a new access token (no body)
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Invalidate the current session server-side
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Profile of the authenticated user
pub const CURRENT_USER_PATH: &str = "/user/me";

/// Where the host sends the user once the session is gone
pub const LOGIN_ENTRY_POINT: &str = "/auth/login";

/// Content-Type and Accept value for every backend call
pub const JSON_MIME: &str = "application/json";

/// Join the API base URL and a route path without doubling the slash.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
