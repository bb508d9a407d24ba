//! Application core: jobs, commands, ports and the system wiring.
//!
//! Hardware is reached only through the [`ports::PinDriver`] trait, so
//! everything here runs unchanged against the in-memory driver.

pub mod commands;
pub mod job;
pub mod ports;
pub mod service;
