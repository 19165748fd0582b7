//! All error types for the proptrans crate.
//!
//! These are returned from the fallible operations that cannot degrade on
//! their own (reading a required file, writing output, loading config).
//! Per-key and ledger problems are logged and recovered instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file '{path}' is not valid UTF-8{}", guess_suffix(.guess))]
    InvalidEncoding { path: String, guess: Option<String> },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid glob pattern: {0}")]
    Glob(String),
}

fn guess_suffix(guess: &Option<String>) -> String {
    match guess {
        Some(name) => format!(" (looks like {name})"),
        None => String::new(),
    }
}

impl Error {
    /// Creates a new validation error
    pub fn validation_error(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Creates a new translation error
    pub fn translation_error(message: impl Into<String>) -> Self {
        Error::Translation(message.into())
    }

    /// Creates a new config error
    pub fn config_error(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::Io(io_error);
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::from(json_error);
        assert!(error.to_string().starts_with("JSON error"));
    }

    #[test]
    fn test_invalid_encoding_without_guess() {
        let error = Error::InvalidEncoding {
            path: "app_de.properties".to_string(),
            guess: None,
        };
        assert_eq!(
            error.to_string(),
            "file 'app_de.properties' is not valid UTF-8"
        );
    }

    #[test]
    fn test_invalid_encoding_with_guess() {
        let error = Error::InvalidEncoding {
            path: "app_de.properties".to_string(),
            guess: Some("windows-1252".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "file 'app_de.properties' is not valid UTF-8 (looks like windows-1252)"
        );
    }

    #[test]
    fn test_helper_constructors() {
        assert_eq!(
            Error::validation_error("bad").to_string(),
            "validation error: bad"
        );
        assert_eq!(
            Error::translation_error("timeout").to_string(),
            "translation error: timeout"
        );
        assert_eq!(
            Error::config_error("missing key").to_string(),
            "config error: missing key"
        );
    }

    #[test]
    fn test_error_debug() {
        let error = Error::Glob("[".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("Glob"));
    }
}
