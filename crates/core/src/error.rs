//! Error types for the CardioLake domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.
//!
//! Only transport-level problems are errors. A search that matches nothing is
//! an empty [`Bundle`](crate::fhir::Bundle), and unparseable agent text is
//! handled by the reply envelope, so neither shows up here.

use thiserror::Error;

/// The top-level error type for all CardioLake operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Datastore errors ---
    #[error("Datastore error: {0}")]
    Store(#[from] StoreError),

    // --- Agent runtime errors ---
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Datastore request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Datastore authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid datastore response: {0}")]
    InvalidResponse(String),

    #[error("Request signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("Agent request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Agent authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Agent runtime throttled the request: {0}")]
    Throttled(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Malformed event stream: {0}")]
    Decode(String),

    #[error("Agent runtime raised {exception_type}: {message}")]
    Remote {
        exception_type: String,
        message: String,
    },

    #[error("Agent not configured: {0}")]
    NotConfigured(String),
}
