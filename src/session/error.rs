//! Error types for the session transport.

use thiserror::Error;

/// Errors surfaced by [`SessionClient`](super::SessionClient) requests.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A GET failed at the transport level on every attempt of its budget.
    #[error("GET {url} failed after {attempts} attempt(s): {source}")]
    Exhausted {
        /// Requested URL.
        url: String,
        /// Attempts made, including the first.
        attempts: u32,
        /// Last transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A non-retried request (POST) failed at the transport level.
    #[error("{method} {url} failed: {source}")]
    Send {
        /// HTTP method.
        method: String,
        /// Requested URL.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The response arrived but its body could not be read.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// Requested URL.
        url: String,
        /// Read error.
        #[source]
        source: reqwest::Error,
    },

    /// The URL could not be turned into a request.
    #[error("invalid request URL: {url}")]
    InvalidUrl {
        /// Rejected URL.
        url: String,
    },

    /// A header profile entry is not a valid HTTP header.
    #[error("invalid header '{name}' in request profile")]
    InvalidHeader {
        /// Header name.
        name: String,
    },

    /// The underlying HTTP client could not be built.
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The in-flight permit pool was closed.
    #[error("request permit pool closed unexpectedly")]
    PermitPoolClosed,
}

impl TransportError {
    /// Creates an exhausted-retries error.
    pub fn exhausted(url: impl Into<String>, attempts: u32, source: reqwest::Error) -> Self {
        Self::Exhausted {
            url: url.into(),
            attempts,
            source,
        }
    }

    /// Creates a single-attempt send error.
    pub fn send(method: impl Into<String>, url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Send {
            method: method.into(),
            url: url.into(),
            source,
        }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Returns the attempt count when the error came from an exhausted GET.
    #[must_use]
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
