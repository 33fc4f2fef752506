//! Error handling for the data access SDK
//!
//! This module provides the error system used across the SDK:
//! - Classifies failures by transport outcome (cancelled, timeout, network,
//!   client, server, malformed)
//! - Distinguishes retryable from permanent failures
//! - Maps errors to user-facing messages, never raw stack traces
//! - Provides a convenient Result type alias

use thiserror::Error;

pub mod mapping;

/// Result type for data access operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Main error type for the data access SDK
#[derive(Error, Debug)]
pub enum DataError {
    /// The request was superseded or explicitly cancelled
    #[error("request cancelled")]
    Cancelled,

    /// The request exceeded its configured deadline
    #[error("timeout: {0}")]
    Timeout(String),

    /// Transport-level failure, no response received
    #[error("network error: {0}")]
    Network(String),

    /// HTTP 4xx response from the backend
    #[error("client error ({status}): {message}")]
    Client { status: u16, message: String },

    /// HTTP 5xx response from the backend
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A response body that could not be parsed
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Key/value session storage failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl DataError {
    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        DataError::Timeout(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        DataError::Network(message.into())
    }

    /// Create a client (4xx) error
    pub fn client(status: u16, message: impl Into<String>) -> Self {
        DataError::Client {
            status,
            message: message.into(),
        }
    }

    /// Create a server (5xx) error
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        DataError::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        DataError::Malformed(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        DataError::Configuration(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        DataError::Storage(message.into())
    }

    /// Check if this is a retryable error.
    ///
    /// Only timeouts, transport failures and 5xx responses are transient.
    /// Cancellation and 4xx responses are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::Timeout(_) | DataError::Network(_) | DataError::Server { .. }
        )
    }

    /// Check if this error represents a cancelled request
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DataError::Cancelled)
    }

    /// Get the HTTP status code if this error carries one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DataError::Client { status, .. } | DataError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// A single human-readable message suitable for end users.
    ///
    /// Status-bearing errors map through the status table in
    /// [`mapping::user_message_for_status`]; everything else gets a generic
    /// phrasing for its class.
    pub fn user_message(&self) -> String {
        match self {
            DataError::Cancelled => "The request was cancelled.".to_string(),
            DataError::Timeout(_) => "The server took too long to respond.".to_string(),
            DataError::Network(_) => "Could not reach the server.".to_string(),
            DataError::Client { status, .. } | DataError::Server { status, .. } => {
                mapping::user_message_for_status(*status).to_string()
            }
            DataError::Malformed(_) => "The server returned an unreadable response.".to_string(),
            DataError::Configuration(_) => "The application is misconfigured.".to_string(),
            DataError::Storage(_) => "Local storage is unavailable.".to_string(),
        }
    }
}

/// Convert reqwest errors to DataError
impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::timeout(format!("request timed out: {}", err))
        } else if err.is_connect() {
            DataError::network(format!("connection error: {}", err))
        } else if err.is_decode() {
            DataError::malformed(format!("response decode error: {}", err))
        } else if let Some(status) = err.status() {
            if status.is_client_error() {
                DataError::client(status.as_u16(), err.to_string())
            } else {
                DataError::server(status.as_u16(), err.to_string())
            }
        } else {
            DataError::network(format!("transport error: {}", err))
        }
    }
}

/// Convert serde_json errors to DataError
impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::malformed(format!("JSON error: {}", err))
    }
}
