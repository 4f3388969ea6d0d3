//! Configuration and I/O errors shared across the workspace

use thiserror::Error;

/// Common error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_offending_field() {
        let err = Error::Config("api.base_url must start with http:// or https://".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: api.base_url must start with http:// or https://"
        );
    }

    #[test]
    fn io_and_toml_errors_convert_with_question_mark() {
        fn read_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/budget-dashboard.toml")?)
        }
        fn parse_garbage() -> Result<toml::Table> {
            Ok(toml::from_str("[server\nlisten_addr =")?)
        }

        let io = read_missing().unwrap_err();
        assert!(io.to_string().starts_with("I/O error:"), "got: {io}");

        let parse = parse_garbage().unwrap_err();
        assert!(matches!(parse, Error::Toml(_)), "got: {parse:?}");
    }
}
