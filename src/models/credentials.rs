// SPDX-License-Identifier: MIT

//! Stored WHOOP OAuth credentials.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A connected account's tokens and lifecycle timestamps.
///
/// Whichever component currently holds the authenticated session owns the
/// single authoritative copy; refresh replaces `access_token` and
/// `expires_at` together, and `connected_at` never changes after the first
/// successful authorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Current access token.
    pub access_token: String,
    /// Refresh token; absent means the connection can never be renewed.
    pub refresh_token: Option<String>,
    /// Granted OAuth scope.
    pub scope: Option<String>,
    /// Token scheme reported by the provider (defaults to bearer).
    pub token_type: Option<String>,
    /// Access token expiry; absent means treat as non-expiring.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the account was first connected.
    pub connected_at: DateTime<Utc>,
    /// Last successful authenticated request.
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// True when `expires_at` is set and falls within `seconds` of now.
    /// A missing expiry never counts as expiring.
    pub fn expires_within(&self, seconds: i64) -> bool {
        match self.expires_at {
            Some(at) => at <= Utc::now() + Duration::seconds(seconds),
            None => false,
        }
    }

    /// True when the access token has already expired.
    pub fn is_expired(&self) -> bool {
        self.expires_within(0)
    }

    /// Value for the `Authorization` header. WHOOP reports `token_type`
    /// lowercase ("bearer"); the header wants the capitalized scheme.
    pub fn authorization_header(&self) -> String {
        let scheme = self.token_type.as_deref().unwrap_or("bearer").trim();
        format!("{} {}", capitalize(scheme), self.access_token)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
