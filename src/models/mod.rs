// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod credentials;
pub mod records;

pub use credentials::Credentials;
pub use records::{
    BodyMeasurement, Cycle, Page, Profile, Record, Recovery, Sleep, Snapshot, Workout,
};
