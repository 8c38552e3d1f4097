// SPDX-License-Identifier: MIT

//! Application settings loaded from environment variables.
//!
//! The redirect host/port/path must exactly match the redirect URL
//! registered in the WHOOP developer dashboard; this is a configuration
//! contract, not something the flow can negotiate at runtime.

use std::env;

pub const DEFAULT_REDIRECT_HOST: &str = "127.0.0.1";
pub const DEFAULT_REDIRECT_PORT: u16 = 8765;
pub const DEFAULT_REDIRECT_PATH: &str = "/callback";

/// Settings loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// WHOOP OAuth client ID (public).
    pub whoop_client_id: Option<String>,
    /// WHOOP OAuth client secret.
    pub whoop_client_secret: Option<String>,
    /// Loopback host the callback listener binds to.
    pub redirect_host: String,
    /// Loopback port the callback listener binds to.
    pub redirect_port: u16,
    /// Path component of the registered redirect URL.
    pub redirect_path: String,
}

impl Settings {
    /// Load settings from the environment (and a `.env` file if present).
    ///
    /// Client credentials are optional here: data fetching with an already
    /// stored token works without them (refresh is then structurally
    /// unavailable). The connect path demands them via
    /// [`Settings::client_credentials`].
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            whoop_client_id: env_nonempty("WHOOP_CLIENT_ID"),
            whoop_client_secret: env_nonempty("WHOOP_CLIENT_SECRET"),
            redirect_host: env::var("WHOOP_REDIRECT_HOST")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_HOST.to_string()),
            redirect_port: env::var("WHOOP_REDIRECT_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REDIRECT_PORT),
            redirect_path: env::var("WHOOP_REDIRECT_PATH")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_PATH.to_string()),
        }
    }

    /// Client id and secret, or a [`ConfigError`] naming the first missing
    /// variable.
    pub fn client_credentials(&self) -> Result<(String, String), ConfigError> {
        let id = self
            .whoop_client_id
            .clone()
            .ok_or(ConfigError::Missing("WHOOP_CLIENT_ID"))?;
        let secret = self
            .whoop_client_secret
            .clone()
            .ok_or(ConfigError::Missing("WHOOP_CLIENT_SECRET"))?;
        Ok((id, secret))
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
