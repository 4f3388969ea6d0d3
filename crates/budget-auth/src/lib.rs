//! Session authentication for the budget dashboard
//!
//! Talks to the backend's `/auth/*` endpoints and owns the Session
//! Credential. This crate has no dependency on the gateway or the dashboard
//! binary, so it can be tested and used on its own.
//!
//! Credential flow:
//! 1. Host calls `token::login()` with email + password
//! 2. Returned bearer token is stored via `TokenStore::set()`
//! 3. The gateway reads the token through `TokenStore::get()` before every request
//! 4. On a 401 the gateway calls `token::refresh_access_token()` (ambient refresh cookie)
//! 5. The refreshed token replaces the old one via `TokenStore::set()`
//! 6. Logout or an irrecoverable refresh failure calls `TokenStore::remove()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use constants::*;
pub use credentials::{FileTokenStore, MemoryTokenStore, StoreFuture, TokenStore};
pub use error::{Error, ErrorBody, Result};
pub use token::{
    LoginResponse, RefreshResponse, RegisterRequest, RegisterResponse, User, login, logout,
    refresh_access_token, register,
};
