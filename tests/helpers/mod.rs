//! Shared test helpers.

pub mod engine_helpers;
pub mod event_recorder;
