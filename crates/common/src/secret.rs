//! Redacting wrapper for bearer tokens and passwords

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs and wiped on drop.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the inner value (use sparingly, never log the result)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T: Zeroize> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Zeroize + PartialEq> PartialEq for Secret<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_is_redacted_in_debug_and_display() {
        let token = Secret::new(String::from("eyJhbGciOiJIUzI1NiJ9.payload.sig"));
        assert_eq!(format!("{token:?}"), "[REDACTED]");
        assert_eq!(format!("{token}"), "[REDACTED]");
    }

    #[test]
    fn redaction_survives_struct_debug() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Login {
            email: String,
            password: Secret<String>,
        }

        let login = Login {
            email: "ana@example.com".into(),
            password: "hunter2".to_string().into(),
        };
        let debug = format!("{login:?}");
        assert!(debug.contains("ana@example.com"));
        assert!(!debug.contains("hunter2"), "got: {debug}");
    }

    #[test]
    fn expose_returns_inner_value() {
        let token = Secret::new(String::from("at_123"));
        assert_eq!(token.expose(), "at_123");
        assert_eq!(token.clone(), token);
    }
}
