// SPDX-License-Identifier: MIT

//! Authenticated WHOOP API client.
//!
//! Handles:
//! - GET requests with the stored credentials
//! - Proactive token refresh inside a 60-second expiry margin
//! - One reactive refresh-and-retry on a 401 response
//! - Paginated listing with strict per-record parsing
//! - Keeping the persisted credential copy in sync after every mutation

use std::sync::Arc;

use chrono::Utc;
use reqwest::header;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::records::Record;
use crate::models::{BodyMeasurement, Credentials, Cycle, Page, Profile, Recovery, Sleep, Snapshot, Workout};
use crate::services::oauth::{TokenResponse, WHOOP_TOKEN_URL};
use crate::services::{HTTP_TIMEOUT, USER_AGENT};
use crate::store::CredentialStore;

pub const WHOOP_API_BASE_URL: &str = "https://api.prod.whoop.com/developer";

/// Margin before token expiry when we proactively refresh.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Workouts included in a composite snapshot by default.
pub const SNAPSHOT_WORKOUT_LIMIT: u32 = 3;

/// Authenticated client over one connected account.
///
/// The client owns the single authoritative in-memory [`Credentials`] for
/// its lifetime and re-persists it through the injected store after every
/// refresh and every successful request. Operations are sequential,
/// single-writer; there is no internal parallelism.
pub struct WhoopClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials: Credentials,
    store: Arc<dyn CredentialStore>,
}

impl WhoopClient {
    pub fn new(
        credentials: Credentials,
        client_id: Option<String>,
        client_secret: Option<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: WHOOP_API_BASE_URL.to_string(),
            token_url: WHOOP_TOKEN_URL.to_string(),
            client_id,
            client_secret,
            credentials,
            store,
        }
    }

    /// Point the client at a different API base (tests use a mock server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Point the refresh grant at a different token endpoint.
    pub fn with_token_url(mut self, token_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self
    }

    /// Current credential record.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    // ─── Core request path ───────────────────────────────────────────────

    /// Authenticated GET returning the raw JSON object.
    ///
    /// Refreshes proactively when the token is inside the expiry margin.
    /// On a 401, refreshes exactly once and retries exactly once with the
    /// new token; if refresh is structurally unavailable the original 401
    /// surfaces. Any other HTTP status surfaces immediately. A successful
    /// call updates `last_sync_at` and persists the record.
    pub async fn get(&mut self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        self.refresh_if_expiring().await?;

        match self.request(path, params).await {
            Ok(payload) => {
                self.touch_last_sync().await?;
                Ok(payload)
            }
            Err(err) if err.is_unauthorized() => {
                tracing::debug!(path, "Got 401, attempting token refresh");
                if self.refresh().await? {
                    let payload = self.request(path, params).await?;
                    self.touch_last_sync().await?;
                    Ok(payload)
                } else {
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// One paginated GET: `limit` query parameter in, `records` array and
    /// optional continuation token out. Non-object entries are skipped, not
    /// failed on; the caller drives any further pagination itself.
    pub async fn get_paginated<T: Record>(&mut self, path: &str, limit: u32) -> Result<Page<T>> {
        let payload = self.get(path, &[("limit", limit.to_string())]).await?;

        let entries = payload
            .get("records")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| Error::Parse(format!("unexpected records payload from {path}")))?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.is_object() {
                records.push(parse_record::<T>(entry)?);
            }
        }

        let next_token = payload
            .get("next_token")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Page { records, next_token })
    }

    async fn request(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::AUTHORIZATION, self.credentials.authorization_header())
            .timeout(HTTP_TIMEOUT);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(&url, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::transport(&url, e))?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                endpoint: url,
                body: body.trim().to_string(),
            });
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("response from {url} is not valid JSON: {e}")))?;
        if !payload.is_object() {
            return Err(Error::Parse(format!(
                "unexpected response payload from {url}: expected a JSON object"
            )));
        }
        Ok(payload)
    }

    // ─── Token lifecycle ─────────────────────────────────────────────────

    /// Refresh when the token expires within the margin. A record without
    /// `expires_at` is treated as non-expiring and never refreshed here.
    pub async fn refresh_if_expiring(&mut self) -> Result<bool> {
        if self.credentials.expires_within(REFRESH_MARGIN_SECS) {
            tracing::debug!("Access token expiring soon, refreshing");
            self.refresh().await
        } else {
            Ok(false)
        }
    }

    /// Refresh the access token with the stored refresh token.
    ///
    /// Fails closed: returns `Ok(false)` without error when there is no
    /// refresh token or no client credentials, since refresh is sometimes
    /// structurally unavailable. On success the token fields are replaced
    /// (provider omissions fall back to the previous values), `connected_at`
    /// and `last_sync_at` are preserved, and the record is persisted.
    pub async fn refresh(&mut self) -> Result<bool> {
        let Some(refresh_token) = self.credentials.refresh_token.clone() else {
            return Ok(false);
        };
        let (Some(client_id), Some(client_secret)) =
            (self.client_id.clone(), self.client_secret.clone())
        else {
            return Ok(false);
        };

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("scope", "offline"),
            ])
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
            return Err(Error::Http {
                status: status.as_u16(),
                endpoint: self.token_url.clone(),
                body: body.trim().to_string(),
            });
        }

        let tokens: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Parse(format!("token refresh response: {e}")))?;
        if tokens.access_token.trim().is_empty() {
            return Err(Error::Parse(
                "token refresh response missing access_token".to_string(),
            ));
        }

        let now = Utc::now();
        self.credentials.access_token = tokens.access_token;
        self.credentials.refresh_token = tokens.refresh_token.or(Some(refresh_token));
        self.credentials.token_type = tokens.token_type.or(self.credentials.token_type.take());
        self.credentials.scope = tokens.scope.or(self.credentials.scope.take());
        self.credentials.expires_at = tokens
            .expires_in
            .filter(|&secs| secs > 0)
            .map(|secs| now + chrono::Duration::seconds(secs));

        self.store.save(&self.credentials).await?;
        tracing::debug!("WHOOP access token refreshed and persisted");
        Ok(true)
    }

    async fn touch_last_sync(&mut self) -> Result<()> {
        self.credentials.last_sync_at = Some(Utc::now());
        self.store.save(&self.credentials).await
    }

    // ─── Convenience accessors ───────────────────────────────────────────

    pub async fn latest_cycle(&mut self) -> Result<Option<Cycle>> {
        let page = self.get_paginated::<Cycle>("/v2/cycle", 1).await?;
        Ok(page.records.into_iter().next())
    }

    pub async fn latest_recovery(&mut self) -> Result<Option<Recovery>> {
        let page = self.get_paginated::<Recovery>("/v2/recovery", 1).await?;
        Ok(page.records.into_iter().next())
    }

    pub async fn latest_sleep(&mut self) -> Result<Option<Sleep>> {
        let page = self.get_paginated::<Sleep>("/v2/activity/sleep", 1).await?;
        Ok(page.records.into_iter().next())
    }

    /// Recovery for one specific cycle. 404 means "no data for this cycle"
    /// and returns `None`; any other status is a hard failure.
    pub async fn recovery_for_cycle(&mut self, cycle_id: i64) -> Result<Option<Recovery>> {
        match self.get(&format!("/v2/cycle/{cycle_id}/recovery"), &[]).await {
            Ok(payload) => Ok(Some(parse_record(payload)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Sleep for one specific cycle, with the same 404 semantics as
    /// [`WhoopClient::recovery_for_cycle`].
    pub async fn sleep_for_cycle(&mut self, cycle_id: i64) -> Result<Option<Sleep>> {
        match self.get(&format!("/v2/cycle/{cycle_id}/sleep"), &[]).await {
            Ok(payload) => Ok(Some(parse_record(payload)?)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn latest_workouts(&mut self, limit: u32) -> Result<Vec<Workout>> {
        let page = self
            .get_paginated::<Workout>("/v2/activity/workout", limit)
            .await?;
        Ok(page.records)
    }

    pub async fn profile(&mut self) -> Result<Profile> {
        let payload = self.get("/v2/user/profile/basic", &[]).await?;
        parse_record(payload)
    }

    pub async fn body_measurement(&mut self) -> Result<BodyMeasurement> {
        let payload = self.get("/v2/user/measurement/body", &[]).await?;
        parse_record(payload)
    }

    /// Assemble the composite snapshot: latest cycle, the recovery/sleep
    /// tied to that specific cycle (falling back to the "latest" endpoints
    /// when there is no current cycle), recent workouts, profile and body
    /// measurement.
    pub async fn snapshot(&mut self, workout_limit: u32) -> Result<Snapshot> {
        let cycle = self.latest_cycle().await?;

        let (recovery, sleep) = match &cycle {
            Some(cycle) => (
                self.recovery_for_cycle(cycle.id).await?,
                self.sleep_for_cycle(cycle.id).await?,
            ),
            None => (self.latest_recovery().await?, self.latest_sleep().await?),
        };

        let workouts = self.latest_workouts(workout_limit).await?;
        let profile = self.profile().await?;
        let body_measurement = self.body_measurement().await?;

        Ok(Snapshot {
            cycle,
            recovery,
            sleep,
            workouts,
            profile,
            body_measurement,
        })
    }
}

/// Parse one JSON object into a typed record, labeling failures with the
/// record kind so diagnostics read "workout record: missing field
/// `sport_name`".
fn parse_record<T: Record>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Parse(format!("{} record: {e}", T::KIND)))
}
