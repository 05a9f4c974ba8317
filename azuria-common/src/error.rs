// ================================================================
// File: azuria-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Startup configuration:
    #[error("API_URL is not defined in the environment variables.")]
    ApiUrlNotDefined,

    #[error("TOKEN is not defined in the environment variables.")]
    TokenNotDefined,

    #[error("Parse error: {0}")]
    Parse(String),

    // Command / event files:
    #[error("File {0} is not a valid command file.")]
    InvalidCommandFile(String),

    #[error("File {0} is not a valid event file.")]
    InvalidEventFile(String),

    #[error("Malformed manifest {path}: {source}")]
    Manifest {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Remote calls:
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    // Preconditions:
    #[error("Client is not ready yet")]
    NotReady,

    #[error("Already loaded: {0}")]
    AlreadyLoaded(String),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Platform(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUri(err.to_string())
    }
}

impl Error {
    /// True for the two required-setting errors raised before the client exists.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::ApiUrlNotDefined | Error::TokenNotDefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_are_distinguishable() {
        let url = Error::ApiUrlNotDefined;
        let token = Error::TokenNotDefined;
        assert!(url.is_configuration());
        assert!(token.is_configuration());
        assert_ne!(url.to_string(), token.to_string());
        assert!(url.to_string().contains("API_URL"));
        assert!(token.to_string().contains("TOKEN"));
    }

    #[test]
    fn invalid_file_names_the_file() {
        let err = Error::InvalidCommandFile("ping.json".into());
        assert_eq!(err.to_string(), "File ping.json is not a valid command file.");
        assert!(!err.is_configuration());
    }
}
