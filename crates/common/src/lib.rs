//! Shared types for the budget dashboard workspace
//!
//! `Secret` keeps bearer tokens out of logs and Debug output. `Error` covers
//! the configuration and I/O failures every binary in the workspace can hit
//! before the gateway is up.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
