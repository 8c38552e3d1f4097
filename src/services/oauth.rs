// SPDX-License-Identifier: MIT

//! Interactive WHOOP OAuth connection flow.
//!
//! Drives a single authorization-code exchange: correlation token, one-shot
//! loopback listener, browser hand-off, bounded wait for the redirect, and
//! a token-endpoint exchange tried under several client-authentication
//! conventions because providers disagree about which one they accept.

use std::time::Duration;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::header;
use serde::Deserialize;

use crate::config::{DEFAULT_REDIRECT_HOST, DEFAULT_REDIRECT_PATH, DEFAULT_REDIRECT_PORT};
use crate::error::{Error, Result};
use crate::models::Credentials;
use crate::services::callback::CallbackListener;
use crate::services::{HTTP_TIMEOUT, USER_AGENT};

pub const WHOOP_AUTH_URL: &str = "https://api.prod.whoop.com/oauth/oauth2/auth";
pub const WHOOP_TOKEN_URL: &str = "https://api.prod.whoop.com/oauth/oauth2/token";

/// Scope requested when the caller does not override it.
pub const DEFAULT_SCOPE: &str =
    "offline read:recovery read:cycles read:sleep read:workout read:profile read:body_measurement";

/// Length of the per-attempt correlation (`state`) token.
const STATE_LEN: usize = 8;

/// Tokens returned by the token endpoint (code exchange and refresh grant).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

/// Ordered client-authentication conventions for the code exchange.
/// Kept as a list so another convention can be appended without
/// restructuring the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeStrategy {
    /// JSON body with the client secret in the payload.
    Json,
    /// Form-encoded body with the client secret in the payload.
    Form,
    /// Form-encoded body with client credentials in an HTTP Basic header.
    FormBasic,
}

impl ExchangeStrategy {
    const ORDER: [ExchangeStrategy; 3] = [Self::Json, Self::Form, Self::FormBasic];

    fn label(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Form => "form",
            Self::FormBasic => "form-basic",
        }
    }
}

type Launcher = Box<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// Drives one interactive authorization attempt.
pub struct OAuthFlow {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_host: String,
    redirect_port: u16,
    redirect_path: String,
    auth_url: String,
    token_url: String,
    launcher: Launcher,
}

impl OAuthFlow {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_host: DEFAULT_REDIRECT_HOST.to_string(),
            redirect_port: DEFAULT_REDIRECT_PORT,
            redirect_path: DEFAULT_REDIRECT_PATH.to_string(),
            auth_url: WHOOP_AUTH_URL.to_string(),
            token_url: WHOOP_TOKEN_URL.to_string(),
            launcher: Box::new(|url| webbrowser::open(url)),
        }
    }

    /// Override the loopback redirect binding. Must match the redirect URL
    /// registered with the provider exactly.
    pub fn with_redirect(mut self, host: &str, port: u16, path: &str) -> Self {
        self.redirect_host = host.to_string();
        self.redirect_port = port;
        self.redirect_path = path.to_string();
        self
    }

    /// Override the provider endpoints (tests point these at a mock server).
    pub fn with_endpoints(mut self, auth_url: &str, token_url: &str) -> Self {
        self.auth_url = auth_url.to_string();
        self.token_url = token_url.to_string();
        self
    }

    /// Override how the authorization URL is handed to the user. The
    /// default opens the system browser.
    pub fn with_launcher(
        mut self,
        launcher: impl Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    /// The redirect URI as registered with the provider.
    pub fn redirect_uri(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.redirect_host, self.redirect_port, self.redirect_path
        )
    }

    /// Build the browser-facing authorization URL.
    pub fn authorize_url(&self, scope: &str, state: &str) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(scope),
            urlencoding::encode(state),
        )
    }

    /// Run the interactive authorization-code exchange.
    ///
    /// Blocks until the browser redirect arrives or `timeout` elapses.
    /// Every failure is an [`Error::Auth`], fatal for this attempt; the
    /// caller may re-run the whole flow.
    pub async fn connect(&self, scope: Option<&str>, timeout: Duration) -> Result<Credentials> {
        let state = generate_state();
        let scope = scope.unwrap_or(DEFAULT_SCOPE);

        let listener = CallbackListener::bind(
            &self.redirect_host,
            self.redirect_port,
            &self.redirect_path,
        )
        .await?;

        let auth_url = self.authorize_url(scope, &state);
        tracing::info!(url = %auth_url, "Opening WHOOP authorization in browser");
        if let Err(e) = (self.launcher)(&auth_url) {
            // Not fatal: the URL is logged above for manual use.
            tracing::warn!(error = %e, "Could not open browser, open the URL manually");
        }

        let result = listener.wait(timeout).await?;

        if let Some(error) = result.error {
            return Err(Error::Auth(format!("provider reported an error: {error}")));
        }
        // CSRF defense: the token endpoint must never see a code whose
        // redirect did not echo this attempt's correlation token.
        if result.state.as_deref() != Some(state.as_str()) {
            return Err(Error::Auth("authorization state mismatch".to_string()));
        }
        let code = result
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Auth("authorization code missing".to_string()))?;

        let tokens = self.exchange_code(&code).await?;
        let now = Utc::now();

        Ok(Credentials {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            scope: tokens.scope,
            token_type: tokens.token_type,
            expires_at: tokens
                .expires_in
                .filter(|&secs| secs > 0)
                .map(|secs| now + chrono::Duration::seconds(secs)),
            connected_at: now,
            last_sync_at: None,
        })
    }

    /// Exchange the authorization code, trying each strategy in order and
    /// stopping at the first 2xx with a non-empty access token.
    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let mut failures: Vec<String> = Vec::new();

        for strategy in ExchangeStrategy::ORDER {
            match self.post_token_request(code, strategy).await {
                Ok(tokens) if !tokens.access_token.trim().is_empty() => {
                    tracing::debug!(strategy = strategy.label(), "Token exchange succeeded");
                    return Ok(tokens);
                }
                Ok(_) => {
                    failures.push(format!("{}: response missing access_token", strategy.label()));
                }
                Err(e) => failures.push(format!("{}: {e}", strategy.label())),
            }
        }

        Err(Error::Auth(format!(
            "token exchange failed: {}",
            failures.join(" | ")
        )))
    }

    async fn post_token_request(
        &self,
        code: &str,
        strategy: ExchangeStrategy,
    ) -> Result<TokenResponse> {
        let redirect_uri = self.redirect_uri();

        let request = match strategy {
            ExchangeStrategy::Json => self.http.post(&self.token_url).json(&serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": redirect_uri,
                "client_id": self.client_id,
                "client_secret": self.client_secret,
            })),
            ExchangeStrategy::Form => self.http.post(&self.token_url).form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ]),
            ExchangeStrategy::FormBasic => self
                .http
                .post(&self.token_url)
                .basic_auth(&self.client_id, Some(&self.client_secret))
                .form(&[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri.as_str()),
                    ("client_id", self.client_id.as_str()),
                ]),
        };

        let response = request
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::transport(&self.token_url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(&self.token_url, e))?;

        if !status.is_success() {
            let mut detail = body.trim().to_string();
            if status.as_u16() == 401 {
                detail.push_str(" (check WHOOP_CLIENT_ID/WHOOP_CLIENT_SECRET)");
            }
            if detail.contains("1010") {
                detail.push_str(&format!(
                    " (check the dashboard redirect URL matches {redirect_uri} exactly)"
                ));
            }
            return Err(Error::Http {
                status: status.as_u16(),
                endpoint: self.token_url.clone(),
                body: detail,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("token endpoint response: {e}")))
    }
}

/// Fresh correlation token: 8 random alphanumeric characters, compared
/// once against the redirect's `state` and then discarded.
fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}
