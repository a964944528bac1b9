//! Error types for the singleton gate.
//!
//! A policy denial is not an error: it is reported as [`crate::Verdict::Deny`].
//! Everything here is an infrastructure or startup failure.

use thiserror::Error;

/// Error type for gate setup and evaluation
#[derive(Error, Debug)]
pub enum Error {
    /// The protected kind could not be resolved against the cluster's type scheme
    #[error("Failed to resolve resource identity: {0}")]
    Lookup(String),

    /// API discovery request failed
    #[error("API discovery failed: {0}")]
    Discovery(#[source] kube::Error),

    /// Listing existing instances failed
    #[error("Failed to list existing instances: {0}")]
    Query(#[source] kube::Error),

    /// The caller's deadline expired before the list completed
    #[error("Admission evaluation cancelled: {0}")]
    Cancelled(String),

    /// A textual `group/version/Kind` could not be parsed
    #[error("Invalid resource identity: {0}")]
    InvalidIdentity(String),

    /// Process configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// Server error
    #[error("Webhook server error: {0}")]
    Server(String),
}

impl Error {
    /// Check if this error should be retried by the caller
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Query(e) | Error::Discovery(e) => {
                // Retry on network errors, rate limiting, and server errors
                matches!(
                    e,
                    kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::Cancelled(_) => true,
            Error::Lookup(_)
            | Error::InvalidIdentity(_)
            | Error::Config(_)
            | Error::TlsConfig(_)
            | Error::Server(_) => false,
        }
    }

    /// HTTP-style status code carried in an errored admission response
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Query(_) | Error::Cancelled(_) | Error::Discovery(_) | Error::Server(_) => 500,
            Error::Lookup(_)
            | Error::InvalidIdentity(_)
            | Error::Config(_)
            | Error::TlsConfig(_) => 400,
        }
    }
}

/// Result type alias for gate operations
pub type Result<T> = std::result::Result<T, Error>;
