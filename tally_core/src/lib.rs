#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core scale-monitoring logic (transport-agnostic).
//!
//! This crate turns a stream of raw weight-sensor payloads into classified,
//! enriched readings, item-count deltas, and a bounded history, and fans the
//! results out to any number of observers. Transports (broker clients, push
//! channels) live outside; they feed `MonitorHub::ingest` or implement
//! `tally_traits::RawSource` and let `MonitorService` do the pumping.
//!
//! ## Architecture
//!
//! - **Parsing**: best-effort weight extraction from text payloads
//!   (`reading` module)
//! - **Stabilization**: per-device sliding window with a range dispersion
//!   test and gated emission (`stabilizer` module)
//! - **Counting**: tare-and-divide item deltas behind directional policy
//!   gates (`inventory` module)
//! - **History**: age- and count-bounded log of accepted readings
//!   (`history` module)
//! - **Fan-out**: the `hub` module ties the stages together and broadcasts
//!   events; the `service` module runs the hub on its own thread
//!
//! All weights are `f64` kilograms; all times are milliseconds on a
//! caller-owned monotonic epoch.

pub mod conversions;
pub mod error;
pub mod history;
pub mod hub;
pub mod inventory;
pub mod reading;
pub mod service;
pub mod stabilizer;

pub use error::{Result, ServiceError, ValidationError};
pub use history::{HistoryBuffer, HistoryCfg, HistoryEntry};
pub use hub::{EnrichedReading, HubBuilder, MonitorEvent, MonitorHub};
pub use inventory::{
    CountChange, DeltaOutcome, InventoryCfg, InventoryState, apply_stable_weight,
};
pub use reading::{Reading, StatusTag, UNKNOWN_DEVICE, parse_weight_kg};
pub use service::MonitorService;
pub use stabilizer::{
    Classification, DeviceWindow, Stability, StabilizerCfg, StabilizerMode, should_emit,
};
