//! Relay and relay-board drivers.
//!
//! A [`Relay`] turns a logical on/off intent into the electrical level its
//! wiring needs; a [`RelayBoard`] owns every relay pin the system uses.
//!
//! ## Wiring
//!
//! ```text
//!   electrical = logical XOR (wiring == NormallyOpen)      High = true
//!
//!   NormallyOpen   on → Low    off → High   (active-low HAT boards)
//!   NormallyClosed on → High   off → Low
//! ```
//!
//! The logical state is never cached: [`Relay::is_on`] reads the pin back,
//! so it stays truthful if something external moved the pin.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embedded_hal::digital::PinState;
use heapless::FnvIndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::PinDriver;
use crate::error::{ConfigError, Error, PinError};
use crate::pins::{MAX_RELAYS, PinMode, PinNumber};

/// How a relay's contacts are wired relative to the coil drive level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayWiring {
    #[default]
    NormallyOpen,
    NormallyClosed,
}

impl RelayWiring {
    /// Electrical level that realises the logical state `on`.
    pub const fn level_for(self, on: bool) -> PinState {
        let high = on ^ matches!(self, Self::NormallyOpen);
        if high { PinState::High } else { PinState::Low }
    }

    /// Logical state implied by an electrical level.
    pub const fn is_on(self, level: PinState) -> bool {
        matches!(level, PinState::High) ^ matches!(self, Self::NormallyOpen)
    }

    /// Level that leaves the valve closed.
    pub const fn safe_level(self) -> PinState {
        self.level_for(false)
    }
}

// ───────────────────────────────────────────────────────────────
// Relay
// ───────────────────────────────────────────────────────────────

/// One relay channel on one pin.
pub struct Relay<D: PinDriver> {
    pin: PinNumber,
    wiring: RelayWiring,
    driver: Arc<D>,
}

impl<D: PinDriver> Relay<D> {
    fn new(pin: PinNumber, wiring: RelayWiring, driver: Arc<D>) -> Self {
        Self {
            pin,
            wiring,
            driver,
        }
    }

    pub fn pin(&self) -> PinNumber {
        self.pin
    }

    pub fn wiring(&self) -> RelayWiring {
        self.wiring
    }

    /// Energise (`true`) or release (`false`) the relay.  Exactly one pin write.
    pub fn set_on(&self, on: bool) -> Result<(), PinError> {
        self.driver.write(self.pin, self.wiring.level_for(on))
    }

    /// Read the pin back and derive the logical state.
    pub fn is_on(&self) -> Result<bool, PinError> {
        self.driver.read(self.pin).map(|level| self.wiring.is_on(level))
    }

    /// Put the pin into output mode (no level change).
    pub fn ensure_output(&self) -> Result<(), PinError> {
        self.driver.set_mode(self.pin, PinMode::Output)
    }
}

// ───────────────────────────────────────────────────────────────
// RelayBoard
// ───────────────────────────────────────────────────────────────

/// Fixed set of relays keyed by pin.
///
/// Exclusive owner of the pins it was created with.  Pins are opened as
/// outputs on creation and closed exactly once by [`dispose`](Self::dispose)
/// (or on drop).
pub struct RelayBoard<D: PinDriver> {
    wiring: RelayWiring,
    relays: FnvIndexMap<PinNumber, Relay<D>, MAX_RELAYS>,
    disposed: AtomicBool,
}

impl<D: PinDriver> RelayBoard<D> {
    /// Open every pin as an output and build one relay per pin.
    ///
    /// Fails with [`ConfigError::DuplicatePin`] before touching the driver
    /// if a pin repeats.  If the driver fails part-way, pins opened so far
    /// are closed again.
    pub fn create(
        wiring: RelayWiring,
        driver: Arc<D>,
        pins: impl IntoIterator<Item = PinNumber>,
    ) -> Result<Self, Error> {
        let mut relays: FnvIndexMap<PinNumber, Relay<D>, MAX_RELAYS> = FnvIndexMap::new();

        for pin in pins {
            if relays.contains_key(&pin) {
                return Err(ConfigError::DuplicatePin(pin).into());
            }
            if relays
                .insert(pin, Relay::new(pin, wiring, driver.clone()))
                .is_err()
            {
                return Err(ConfigError::TooManyRelays.into());
            }
        }

        let mut opened: heapless::Vec<PinNumber, MAX_RELAYS> = heapless::Vec::new();
        for &pin in relays.keys() {
            let result = driver
                .open(pin)
                .and_then(|()| driver.set_mode(pin, PinMode::Output));
            if let Err(e) = result {
                warn!("RelayBoard: opening pin {} failed: {}", pin, e);
                for &p in &opened {
                    let _ = driver.close(p);
                }
                return Err(e.into());
            }
            // Bounded by the relay map capacity.
            let _ = opened.push(pin);
        }

        debug!("RelayBoard: {} relays opened ({:?})", relays.len(), wiring);

        Ok(Self {
            wiring,
            relays,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn wiring(&self) -> RelayWiring {
        self.wiring
    }

    /// Look up the relay on `pin`.
    pub fn relay(&self, pin: PinNumber) -> Result<&Relay<D>, ConfigError> {
        self.relays.get(&pin).ok_or(ConfigError::UnknownPin(pin))
    }

    /// Switch the relay on `pin`.
    pub fn set(&self, pin: PinNumber, on: bool) -> Result<(), Error> {
        self.relay(pin)?.set_on(on)?;
        Ok(())
    }

    /// Logical state of the relay on `pin`, read back from the driver.
    pub fn is_on(&self, pin: PinNumber) -> Result<bool, Error> {
        Ok(self.relay(pin)?.is_on()?)
    }

    pub fn contains(&self, pin: PinNumber) -> bool {
        self.relays.contains_key(&pin)
    }

    /// Owned pins in creation order.
    pub fn pins(&self) -> impl Iterator<Item = PinNumber> + '_ {
        self.relays.keys().copied()
    }

    pub fn relays(&self) -> impl Iterator<Item = &Relay<D>> {
        self.relays.values()
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// Drive every relay off, attempting all of them even if some fail.
    /// Returns the first failure.
    pub fn all_off(&self) -> Result<(), PinError> {
        let mut first_err = None;
        for relay in self.relays.values() {
            if let Err(e) = relay.set_on(false) {
                warn!("RelayBoard: failed to release pin {}: {}", relay.pin(), e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Close every owned pin exactly once.  Further calls are no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for relay in self.relays.values() {
            if let Err(e) = relay.driver.close(relay.pin) {
                warn!("RelayBoard: closing pin {} failed: {}", relay.pin, e);
            }
        }
        debug!("RelayBoard: disposed");
    }
}

impl<D: PinDriver> Drop for RelayBoard<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}
