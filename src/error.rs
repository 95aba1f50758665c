//! Error types for frame streaming and playback.
//!
//! All errors implement `std::error::Error` and carry enough context to decide
//! whether the session can keep going.
//!
//! ## Error Categories
//!
//! - **Protocol Errors**: malformed frame messages from the simulation server
//! - **Data Inconsistency**: a frame whose particle count does not match the scene
//! - **Connection Errors**: socket failures, peer disconnects, handshake problems
//! - **Configuration Errors**: invalid endpoint or playback settings
//!
//! Protocol and data errors are recoverable: the offending message or frame is
//! dropped and the session continues. Connection errors end the session's
//! producer side.
//!
//! ```rust
//! use simview::StreamError;
//!
//! let error = StreamError::connection_failed("server not reachable");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for streaming operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for streaming operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Malformed frame message: {details}")]
    Protocol { details: String },

    #[error("Frame has {actual} positions but the scene holds {expected} objects")]
    DataInconsistency { expected: usize, actual: usize },

    #[error("Connection to simulation server failed: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid endpoint '{url}': {details}")]
    Endpoint { url: String, details: String },

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error("Config file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Session already closed")]
    SessionClosed,
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Connection { .. } => true,
            StreamError::Timeout { .. } => true,
            StreamError::Protocol { .. } => false,
            StreamError::DataInconsistency { .. } => false,
            StreamError::Endpoint { .. } => false,
            StreamError::Config { .. } => false,
            StreamError::File { .. } => false,
            StreamError::SessionClosed => false,
        }
    }

    /// Returns whether the session keeps running after this error.
    ///
    /// Bad messages and mismatched frames are dropped; everything else ends
    /// the producer side of the session.
    pub fn is_frame_local(&self) -> bool {
        matches!(self, StreamError::Protocol { .. } | StreamError::DataInconsistency { .. })
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::Protocol { .. } => vec![
                "Check that the server sends 'time' and 'positions' fields",
                "Verify client and server protocol versions match",
            ],
            StreamError::DataInconsistency { .. } => vec![
                "Create the scene with the scenario's particle count",
                "Reconnect with a fresh session after changing scenarios",
            ],
            StreamError::Connection { .. } => vec![
                "Ensure the simulation server is running",
                "Check the host and port in the endpoint configuration",
                "Start a new session to reconnect",
            ],
            StreamError::Endpoint { .. } => vec![
                "Use a host of the form 'hostname:port'",
                "Pick one of the supported scenarios",
            ],
            StreamError::Config { .. } => vec![
                "Check playback settings are positive and finite",
                "Compare against the documented defaults",
            ],
            StreamError::File { .. } => vec![
                "Check the config file exists and is readable",
                "Check file permissions",
            ],
            StreamError::Timeout { .. } => vec![
                "Increase the connect timeout",
                "Verify the server is responding",
            ],
            StreamError::SessionClosed => vec!["Start a new session"],
        }
    }

    /// Helper constructor for malformed messages.
    pub fn protocol_error(details: impl Into<String>) -> Self {
        StreamError::Protocol { details: details.into() }
    }

    /// Helper constructor for frames that do not fit the scene.
    pub fn data_inconsistency(expected: usize, actual: usize) -> Self {
        StreamError::DataInconsistency { expected, actual }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        StreamError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for endpoint errors.
    pub fn invalid_endpoint(url: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Endpoint { url: url.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn invalid_config(details: impl Into<String>) -> Self {
        StreamError::Config { details: details.into() }
    }

    /// Helper constructor for config file errors.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::File { path, source }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Protocol { details: err.to_string() }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        StreamError::Connection {
            reason: "websocket error".to_string(),
            source: Some(Box::new(err)),
        }
    }
}
