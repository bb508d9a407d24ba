//! embedded-hal pin driver.
//!
//! Adapts a set of `embedded_hal::digital::StatefulOutputPin`s, keyed by
//! pin number, to the [`PinDriver`] port so the sequencer can run on any
//! HAL that implements the 1.0 digital traits.
//!
//! HAL pins are typed and already configured as push-pull outputs when
//! they are handed over, so `open`/`close` only track ownership and
//! `set_mode` accepts [`PinMode::Output`] alone.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::{Error as _, PinState, StatefulOutputPin};
use heapless::FnvIndexMap;
use log::warn;

use crate::app::ports::PinDriver;
use crate::error::{ConfigError, PinError};
use crate::pins::{MAX_RELAYS, PinMode, PinNumber};

struct HalPin<P> {
    io: P,
    open: bool,
}

/// Pin driver backed by embedded-hal output pins.
pub struct HalPinDriver<P> {
    pins: Mutex<CriticalSectionRawMutex, RefCell<FnvIndexMap<PinNumber, HalPin<P>, MAX_RELAYS>>>,
}

impl<P: StatefulOutputPin + Send> HalPinDriver<P> {
    pub fn new() -> Self {
        Self {
            pins: Mutex::new(RefCell::new(FnvIndexMap::new())),
        }
    }

    /// Register the HAL pin that answers to `number`.
    pub fn with_pin(self, number: PinNumber, io: P) -> Result<Self, ConfigError> {
        self.pins.lock(|pins| {
            let mut pins = pins.borrow_mut();
            if pins.contains_key(&number) {
                return Err(ConfigError::DuplicatePin(number));
            }
            pins.insert(number, HalPin { io, open: false })
                .map(|_| ())
                .map_err(|_| ConfigError::TooManyRelays)
        })?;
        Ok(self)
    }

    fn with_open_pin<T>(
        &self,
        pin: PinNumber,
        f: impl FnOnce(&mut P) -> Result<T, P::Error>,
    ) -> Result<T, PinError> {
        self.pins.lock(|pins| {
            let mut pins = pins.borrow_mut();
            let slot = pins.get_mut(&pin).ok_or(PinError::InvalidPin(pin))?;
            if !slot.open {
                return Err(PinError::NotOpen(pin));
            }
            f(&mut slot.io).map_err(|e| {
                warn!("HAL pin {} failed: {:?}", pin, e.kind());
                PinError::Io(pin)
            })
        })
    }

    fn set_open(&self, pin: PinNumber, open: bool) -> Result<(), PinError> {
        self.pins.lock(|pins| {
            let mut pins = pins.borrow_mut();
            let slot = pins.get_mut(&pin).ok_or(PinError::InvalidPin(pin))?;
            if !open && !slot.open {
                return Err(PinError::NotOpen(pin));
            }
            slot.open = open;
            Ok(())
        })
    }
}

impl<P: StatefulOutputPin + Send> Default for HalPinDriver<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: StatefulOutputPin + Send> PinDriver for HalPinDriver<P> {
    fn open(&self, pin: PinNumber) -> Result<(), PinError> {
        self.set_open(pin, true)
    }

    fn close(&self, pin: PinNumber) -> Result<(), PinError> {
        self.set_open(pin, false)
    }

    fn set_mode(&self, pin: PinNumber, mode: PinMode) -> Result<(), PinError> {
        match mode {
            PinMode::Output => self.with_open_pin(pin, |_| Ok(())),
            PinMode::Input => Err(PinError::UnsupportedMode(pin)),
        }
    }

    fn write(&self, pin: PinNumber, level: PinState) -> Result<(), PinError> {
        self.with_open_pin(pin, |io| io.set_state(level))
    }

    fn read(&self, pin: PinNumber) -> Result<PinState, PinError> {
        self.with_open_pin(pin, |io| {
            io.is_set_high()
                .map(|high| if high { PinState::High } else { PinState::Low })
        })
    }
}
