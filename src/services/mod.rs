// SPDX-License-Identifier: MIT

//! Services module - OAuth connection flow and authenticated API client.

pub mod callback;
pub mod oauth;
pub mod whoop;

pub use callback::{CallbackListener, CallbackResult};
pub use oauth::{OAuthFlow, DEFAULT_SCOPE, WHOOP_AUTH_URL, WHOOP_TOKEN_URL};
pub use whoop::{WhoopClient, WHOOP_API_BASE_URL};

use std::time::Duration;

/// Fixed User-Agent for every outbound request.
pub(crate) const USER_AGENT: &str = concat!("whoopsync/", env!("CARGO_PKG_VERSION"));

/// Per-call network timeout. Once a call is in flight it runs to
/// completion or to this deadline; there is no mid-request cancellation.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
