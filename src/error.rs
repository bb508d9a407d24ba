//! Unified error types for the irrigation sequencer.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! processor's batch-boundary error handling uniform.  All variants are
//! `Copy` so they can be logged and carried out of a batch without
//! allocation.

use core::fmt;

use crate::pins::{PinNumber, ValveNumber};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or does not cover a request.
    Config(ConfigError),
    /// The pin driver rejected an operation.
    Pin(PinError),
    /// The job queue refused a job.
    Queue(QueueError),
    /// The processor worker thread could not be spawned or panicked.
    Worker,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Pin(e) => write!(f, "pin: {e}"),
            Self::Queue(e) => write!(f, "queue: {e}"),
            Self::Worker => write!(f, "processor worker failed"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Two board entries claim the same pin.
    DuplicatePin(PinNumber),
    /// Two valve mappings share a valve number.
    DuplicateValve(ValveNumber),
    /// A relay was requested for a pin the board does not own.
    UnknownPin(PinNumber),
    /// A job references a valve number with no pin mapping.
    UnmappedValve(ValveNumber),
    /// More pins than a board can hold.
    TooManyRelays,
    /// The configuration document could not be parsed.
    Malformed,
    /// A field failed validation.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePin(pin) => write!(f, "pin {pin} already in use"),
            Self::DuplicateValve(valve) => write!(f, "valve number {valve} mapped twice"),
            Self::UnknownPin(pin) => write!(f, "no relay exists on pin {pin}"),
            Self::UnmappedValve(valve) => {
                write!(f, "valve number {valve} is not a valid valve number")
            }
            Self::TooManyRelays => write!(f, "relay board capacity exceeded"),
            Self::Malformed => write!(f, "configuration document malformed"),
            Self::Invalid(msg) => write!(f, "invalid: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Pin driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// The driver has no such pin.
    InvalidPin(PinNumber),
    /// The pin was never opened, or was already closed.
    NotOpen(PinNumber),
    /// The driver cannot put the pin into the requested mode.
    UnsupportedMode(PinNumber),
    /// Electrical I/O on the pin failed.
    Io(PinNumber),
}

impl PinError {
    /// Pin the failure refers to.
    pub const fn pin(self) -> PinNumber {
        match self {
            Self::InvalidPin(p) | Self::NotOpen(p) | Self::UnsupportedMode(p) | Self::Io(p) => p,
        }
    }
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(p) => write!(f, "pin {p} does not exist"),
            Self::NotOpen(p) => write!(f, "pin {p} is not open"),
            Self::UnsupportedMode(p) => write!(f, "pin {p} mode not supported"),
            Self::Io(p) => write!(f, "pin {p} I/O failed"),
        }
    }
}

impl std::error::Error for PinError {}

impl From<PinError> for Error {
    fn from(e: PinError) -> Self {
        Self::Pin(e)
    }
}

// ---------------------------------------------------------------------------
// Queue errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was completed; no further jobs are accepted.
    Closed,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "job queue completed"),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
