//! Error types for parfetch
//!
//! This module provides the failure vocabulary shared by every layer:
//! - The retrieval taxonomy surfaced to callers (UrlRequired, Timeout,
//!   TooManyRedirects, and the generic Request failure)
//! - Ambient variants wrapping transport, decompression, configuration,
//!   and filesystem failures

use thiserror::Error;

/// Result type alias for parfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for parfetch
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// A request was issued without a target URL
    #[error("a URL is required before a request can be sent")]
    UrlRequired,

    /// Transport-level timeout, kept distinct from other network failures
    #[error("request to {url} timed out")]
    Timeout {
        /// The URL whose request exceeded the configured timeout
        url: String,
    },

    /// The redirect hop budget was exhausted before the chain resolved
    #[error("stopped after {hops} redirects while resolving {url}")]
    TooManyRedirects {
        /// The URL the chain had reached when the budget ran out
        url: String,
        /// Number of hops recorded before giving up
        hops: usize,
    },

    /// Generic request failure (unresolvable size or file name, HTTP error
    /// statuses, size verification mismatches)
    #[error("request failed: {0}")]
    Request(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body decompression failed
    #[error("failed to decode {encoding} response body: {reason}")]
    Decode {
        /// The content-encoding that was being decoded
        encoding: String,
        /// The underlying decoder error
        reason: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker_count")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
