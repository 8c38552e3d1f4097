// SPDX-License-Identifier: MIT

//! Typed WHOOP API records.
//!
//! Each record is an immutable snapshot of one JSON object from the API.
//! Parsing is strict: identity and timestamp fields must be present and
//! well-typed, and a failure names the record kind and offending field
//! rather than coercing to a default. Downstream planning logic treats
//! absence as a meaningful "unavailable" signal.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker for API record types, carrying the kind name used in parse
/// diagnostics.
pub trait Record: DeserializeOwned {
    /// Record kind as it appears in error messages.
    const KIND: &'static str;
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Continuation token for caller-driven pagination.
    pub next_token: Option<String>,
}

/// Physiological cycle (roughly one day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    /// Absent while the cycle is still running.
    pub end: Option<DateTime<Utc>>,
    pub timezone_offset: String,
    pub score_state: String,
    pub score: Option<Value>,
}

impl Record for Cycle {
    const KIND: &'static str = "cycle";
}

/// Sleep activity, tied to the cycle it scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sleep {
    pub id: String,
    pub cycle_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone_offset: String,
    pub nap: bool,
    pub score_state: String,
    pub score: Option<Value>,
}

impl Record for Sleep {
    const KIND: &'static str = "sleep";
}

/// Recovery score, identified by the cycle/sleep pair it derives from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recovery {
    pub cycle_id: i64,
    pub sleep_id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score_state: String,
    pub score: Option<Value>,
}

impl Record for Recovery {
    const KIND: &'static str = "recovery";
}

/// Recorded workout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timezone_offset: String,
    pub sport_name: String,
    pub score_state: String,
    pub sport_id: Option<i64>,
    pub score: Option<Value>,
}

impl Record for Workout {
    const KIND: &'static str = "workout";
}

/// Basic user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Record for Profile {
    const KIND: &'static str = "profile";
}

/// Body measurement singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyMeasurement {
    pub height_meter: f64,
    pub weight_kilogram: f64,
    pub max_heart_rate: i64,
}

impl Record for BodyMeasurement {
    const KIND: &'static str = "body measurement";
}

/// Composite snapshot handed to the planning layer.
///
/// `cycle`, `recovery` and `sleep` are absent when the provider has no
/// current data; `profile` and `body_measurement` always resolve or the
/// snapshot fetch fails as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub cycle: Option<Cycle>,
    pub recovery: Option<Recovery>,
    pub sleep: Option<Sleep>,
    pub workouts: Vec<Workout>,
    pub profile: Profile,
    pub body_measurement: BodyMeasurement,
}
