// SPDX-License-Identifier: MIT

//! Shared helpers for integration tests: sample WHOOP payloads, credential
//! builders, and a launcher that drives the loopback callback like a
//! browser would.

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use whoopsync::models::Credentials;

/// Credentials expiring `expires_in_secs` from now (None = non-expiring).
#[allow(dead_code)]
pub fn credentials(expires_in_secs: Option<i64>) -> Credentials {
    Credentials {
        access_token: "initial-access-token".to_string(),
        refresh_token: Some("initial-refresh-token".to_string()),
        scope: Some("offline read:recovery".to_string()),
        token_type: Some("bearer".to_string()),
        expires_at: expires_in_secs.map(|secs| Utc::now() + Duration::seconds(secs)),
        connected_at: Utc::now() - Duration::days(7),
        last_sync_at: None,
    }
}

/// Credentials with no refresh token (refresh structurally unavailable).
#[allow(dead_code)]
pub fn credentials_without_refresh() -> Credentials {
    Credentials {
        refresh_token: None,
        ..credentials(None)
    }
}

/// Token endpoint success payload.
#[allow(dead_code)]
pub fn token_json(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": "rotated-refresh-token",
        "expires_in": 3600,
        "scope": "offline read:recovery",
        "token_type": "bearer"
    })
}

#[allow(dead_code)]
pub fn cycle_json(id: i64) -> Value {
    json!({
        "id": id,
        "user_id": 10129,
        "created_at": "2025-04-01T11:25:44.774Z",
        "updated_at": "2025-04-01T14:25:44.774Z",
        "start": "2025-04-01T02:25:44.774Z",
        "end": null,
        "timezone_offset": "-07:00",
        "score_state": "SCORED",
        "score": {"strain": 5.2, "average_heart_rate": 68}
    })
}

#[allow(dead_code)]
pub fn recovery_json(cycle_id: i64) -> Value {
    json!({
        "cycle_id": cycle_id,
        "sleep_id": "e5f0c896-1e2b-4a4e-a31e-5f2c6a3c5f30",
        "user_id": 10129,
        "created_at": "2025-04-01T11:25:44.774Z",
        "updated_at": "2025-04-01T14:25:44.774Z",
        "score_state": "SCORED",
        "score": {"recovery_score": 44, "resting_heart_rate": 64}
    })
}

#[allow(dead_code)]
pub fn sleep_json(cycle_id: i64) -> Value {
    json!({
        "id": "e5f0c896-1e2b-4a4e-a31e-5f2c6a3c5f30",
        "cycle_id": cycle_id,
        "user_id": 10129,
        "created_at": "2025-04-01T11:25:44.774Z",
        "updated_at": "2025-04-01T14:25:44.774Z",
        "start": "2025-04-01T02:25:44.774Z",
        "end": "2025-04-01T10:11:44.774Z",
        "timezone_offset": "-07:00",
        "nap": false,
        "score_state": "SCORED",
        "score": {"sleep_performance_percentage": 88}
    })
}

#[allow(dead_code)]
pub fn workout_json() -> Value {
    json!({
        "id": "1a0e6ba4-2b3c-4d5e-8f90-abcdefabcdef",
        "user_id": 10129,
        "created_at": "2025-04-01T11:25:44.774Z",
        "updated_at": "2025-04-01T14:25:44.774Z",
        "start": "2025-04-01T02:25:44.774Z",
        "end": "2025-04-01T03:25:44.774Z",
        "timezone_offset": "-07:00",
        "sport_name": "running",
        "score_state": "SCORED",
        "sport_id": 0,
        "score": {"strain": 8.1}
    })
}

#[allow(dead_code)]
pub fn profile_json() -> Value {
    json!({
        "user_id": 10129,
        "email": "jane@example.com",
        "first_name": "Jane",
        "last_name": "Doe"
    })
}

#[allow(dead_code)]
pub fn body_json() -> Value {
    json!({
        "height_meter": 1.72,
        "weight_kilogram": 66.4,
        "max_heart_rate": 192
    })
}

/// Paginated listing payload.
#[allow(dead_code)]
pub fn page_json(records: Vec<Value>, next_token: Option<&str>) -> Value {
    json!({
        "records": records,
        "next_token": next_token
    })
}

/// Extract a raw query parameter from a URL (test values never need
/// percent-decoding).
#[allow(dead_code)]
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(&format!("{name}=")))
        .map(str::to_string)
}

/// Launcher that plays the browser: echoes the flow's own `state` back to
/// the redirect URI with a fixed code.
#[allow(dead_code)]
pub fn echo_launcher(redirect_uri: &str) -> impl Fn(&str) -> std::io::Result<()> {
    let redirect_uri = redirect_uri.to_string();
    move |auth_url: &str| {
        let state = query_param(auth_url, "state").unwrap_or_default();
        let target = format!("{redirect_uri}?code=test-auth-code&state={state}");
        tokio::spawn(async move {
            let _ = reqwest::get(&target).await;
        });
        Ok(())
    }
}

/// Launcher that replays a fixed query string regardless of the real state.
#[allow(dead_code)]
pub fn fixed_query_launcher(redirect_uri: &str, query: &str) -> impl Fn(&str) -> std::io::Result<()> {
    let target = format!("{redirect_uri}?{query}");
    move |_auth_url: &str| {
        let target = target.clone();
        tokio::spawn(async move {
            let _ = reqwest::get(&target).await;
        });
        Ok(())
    }
}
