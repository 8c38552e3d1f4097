// SPDX-License-Identifier: MIT

//! whoopsync: connect a WHOOP account and pull recovery data.
//!
//! This crate implements the interactive OAuth authorization-code flow
//! (one-shot loopback callback listener, CSRF-safe state token, multi-
//! strategy code exchange) and an authenticated API client that refreshes
//! expiring tokens, retries once on a 401, and strictly parses the
//! cycle/sleep/recovery/workout records backing a daily-planning layer.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::{Error, Result};
