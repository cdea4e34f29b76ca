//! Error types for the vodhub search aggregator
//!
//! Provides a single error enum covering input validation, upstream
//! transport failures and malformed upstream payloads.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all vodhub operations
///
/// Implements Display for human-readable messages and Serialize
/// so front ends can forward errors as plain strings.
#[derive(Error, Debug)]
pub enum VodError {
    /// Empty query, malformed item id or incomplete source configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upstream could not be reached, timed out or answered with a non-OK status
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Upstream answered but the payload did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Aggregated search was cancelled by the caller
    #[error("Search cancelled")]
    Cancelled,

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

impl From<reqwest::Error> for VodError {
    fn from(error: reqwest::Error) -> Self {
        // Checked first: a timeout while reading the body surfaces as a body error
        if error.is_timeout() {
            return VodError::UpstreamUnavailable("request timed out".to_string());
        }
        if error.is_decode() || error.is_body() {
            return VodError::MalformedResponse(error.to_string());
        }
        match error.status() {
            Some(status) => VodError::UpstreamUnavailable(format!("HTTP {}", status.as_u16())),
            None => VodError::UpstreamUnavailable(error.to_string()),
        }
    }
}

impl Serialize for VodError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for vodhub operations
pub type Result<T> = std::result::Result<T, VodError>;
