//! Pin numbering, pin modes and the default valve wiring.
//!
//! Single source of truth for pin identifiers: every driver and the
//! default configuration reference this module rather than hard-coding
//! numbers.  Default assignments match the reference 4-zone controller
//! (BCM numbering on a Raspberry Pi relay HAT).

/// Logical GPIO number as understood by the pin driver.
pub type PinNumber = u8;

/// Operator-facing zone identifier carried by an irrigation job.
pub type ValveNumber = u16;

/// Maximum number of relays a single board can own.
/// Must stay a power of two (backing `FnvIndexMap` requirement).
pub const MAX_RELAYS: usize = 32;

/// Electrical direction of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

// ---------------------------------------------------------------------------
// Default valve wiring
// ---------------------------------------------------------------------------

/// Master control valve relay.
pub const MCV_GPIO: PinNumber = 5;

/// Zone relays, indexed by `valve number - 1`.
pub const ZONE_GPIOS: [PinNumber; 4] = [6, 13, 19, 26];

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Pin count of the in-memory driver used by the host binary.
pub const SIM_PIN_COUNT: u8 = 50;
