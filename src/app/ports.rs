//! Port traits: the boundary between the sequencing logic and hardware.
//!
//! ```text
//!   Pin driver adapter ──▶ PinDriver ──▶ Relay / RelayBoard ──▶ IrrigationProcessor
//! ```
//!
//! Driven adapters (the in-memory simulation, embedded-hal pins) implement
//! [`PinDriver`].  Relays consume it through an `Arc`, so the engine never
//! touches registers directly.
//!
//! ## Contract
//!
//! - Every call is synchronous and completes before it returns.
//! - Implementations synchronise internally: all methods take `&self` so
//!   the driver can be shared between the initializer and the processor.
//! - `read` returns the level last latched on the pin, which may differ
//!   from what this process wrote if something external drove it.

use embedded_hal::digital::PinState;

use crate::error::PinError;
use crate::pins::{PinMode, PinNumber};

// ───────────────────────────────────────────────────────────────
// Pin driver port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Raw digital-pin access.
pub trait PinDriver: Send + Sync {
    /// Claim a pin for use.
    fn open(&self, pin: PinNumber) -> Result<(), PinError>;

    /// Release a previously opened pin.
    fn close(&self, pin: PinNumber) -> Result<(), PinError>;

    /// Switch the pin's direction.
    fn set_mode(&self, pin: PinNumber, mode: PinMode) -> Result<(), PinError>;

    /// Drive an electrical level.
    fn write(&self, pin: PinNumber, level: PinState) -> Result<(), PinError>;

    /// Sample the electrical level.
    fn read(&self, pin: PinNumber) -> Result<PinState, PinError>;
}
