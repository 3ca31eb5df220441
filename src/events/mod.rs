// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Event Streaming
//!
//! Surfaces remote stack events while a long-running operation is in
//! flight.
//!
//! # Flow
//!
//! ```text
//! main task                         polling task
//! ─────────                         ────────────
//! tracker.fresh_events()  (baseline)
//! spawn ──────────────────────────> loop every interval:
//! execute + wait (blocking)           fresh_events() → reverse → channel
//! stop ───────────────────────────> final drain → channel → exit
//! join <──────────────────────────┘
//! ```
//!
//! - [`EventTracker`] deduplicates events by id and never replays history
//! - [`EventPoller`] owns a tracker on a background task and forwards new
//!   events oldest-first over a bounded channel
//! - [`track_while`] runs an operation with a poller alongside it

pub mod poller;
pub mod tracker;

pub use poller::{track_while, EventPoller};
pub use tracker::EventTracker;
