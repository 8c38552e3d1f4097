// SPDX-License-Identifier: MIT

//! Error types for the WHOOP connection core.
//!
//! Every failure surfaces to the direct caller with enough structure for a
//! one-line diagnostic; nothing is logged-and-swallowed in here.

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The interactive authorization flow could not be completed. Fatal for
    /// the current attempt; retry is an explicit user action.
    #[error("WHOOP authorization failed: {0}")]
    Auth(String),

    /// Network-level failure: no HTTP response was received at all.
    #[error("network error calling {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response, with status and body preserved for diagnostics.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        status: u16,
        endpoint: String,
        body: String,
    },

    /// Malformed JSON or a record missing/mistyping a required field.
    #[error("invalid WHOOP payload: {0}")]
    Parse(String),

    /// Credential store write failure. A refreshed-but-unpersisted token
    /// desyncs from the provider on the next run, so this is never swallowed.
    #[error("failed to persist WHOOP credentials: {0}")]
    Persistence(String),
}

impl Error {
    pub(crate) fn transport(endpoint: &str, source: reqwest::Error) -> Self {
        Error::Transport {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    /// True for an HTTP 401 response (candidate for the one refresh-retry).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Http { status: 401, .. })
    }

    /// True for an HTTP 404 response (cycle-scoped "no data" signal).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Http { status: 404, .. })
    }
}
