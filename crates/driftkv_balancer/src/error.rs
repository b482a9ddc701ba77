//! Error types for the balancer.

use thiserror::Error;

/// Result type for balancer operations.
pub type BalancerResult<T> = Result<T, BalancerError>;

/// Errors that can occur in the balancer.
#[derive(Debug, Error)]
pub enum BalancerError {
    /// No backend is currently passing its health probe.
    #[error("no healthy backends available")]
    NoHealthyBackends,

    /// Forwarding a request to the chosen backend failed.
    #[error("forward to {backend} failed: {source}")]
    Forward {
        /// The backend the request was routed to.
        backend: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Reading the inbound request body failed.
    #[error("request body read failed: {0}")]
    Body(#[source] axum::Error),

    /// Building the proxied response failed.
    #[error("response build failed: {0}")]
    Http(#[from] axum::http::Error),

    /// I/O error, typically binding the listen port.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
