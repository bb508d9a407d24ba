//! Irrigation valve sequencer library.
//!
//! Drives a master control valve and a set of zone valves through relay
//! pins, one queued job at a time, with a stop broadcast and a pressure
//! bleed after each batch.  The host binary and the integration tests
//! both link against this crate.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod health;
pub mod pins;
pub mod processor;
pub mod sync;
