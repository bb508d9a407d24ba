//! In-memory pin driver.
//!
//! Simulates a bank of digital pins for host runs and tests: open flag,
//! mode and latched level per pin, plus a write history so callers can
//! assert on the exact sequence of electrical changes.
//!
//! ## Dual-purpose design
//!
//! The host binary runs the whole sequencer against this driver.  Tests
//! additionally use [`force_level`](MemoryPinDriver::force_level) to
//! simulate external interference and [`fail_pin`](MemoryPinDriver::fail_pin)
//! to inject I/O faults.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::PinState;

use crate::app::ports::PinDriver;
use crate::error::PinError;
use crate::pins::{PinMode, PinNumber};

/// One recorded electrical write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: PinNumber,
    pub level: PinState,
}

#[derive(Debug, Clone, Copy)]
struct PinData {
    open: bool,
    mode: Option<PinMode>,
    level: PinState,
    closes: u32,
    failing: bool,
}

impl PinData {
    const fn new() -> Self {
        Self {
            open: false,
            mode: None,
            level: PinState::Low,
            closes: 0,
            failing: false,
        }
    }
}

struct Bank {
    pins: Vec<PinData>,
    history: Vec<PinWrite>,
}

/// Simulated pin bank numbered `0..pin_count`.
pub struct MemoryPinDriver {
    bank: Mutex<CriticalSectionRawMutex, RefCell<Bank>>,
}

impl MemoryPinDriver {
    pub fn new(pin_count: u8) -> Self {
        Self {
            bank: Mutex::new(RefCell::new(Bank {
                pins: vec![PinData::new(); pin_count as usize],
                history: Vec::new(),
            })),
        }
    }

    pub fn pin_count(&self) -> usize {
        self.bank.lock(|b| b.borrow().pins.len())
    }

    fn with_pin<T>(
        &self,
        pin: PinNumber,
        f: impl FnOnce(&mut PinData, &mut Vec<PinWrite>) -> Result<T, PinError>,
    ) -> Result<T, PinError> {
        self.bank.lock(|b| {
            let mut bank = b.borrow_mut();
            let Bank { pins, history } = &mut *bank;
            let data = pins
                .get_mut(pin as usize)
                .ok_or(PinError::InvalidPin(pin))?;
            f(data, history)
        })
    }

    fn peek<T>(&self, pin: PinNumber, default: T, f: impl FnOnce(&PinData) -> T) -> T {
        self.bank
            .lock(|b| b.borrow().pins.get(pin as usize).map_or(default, f))
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn is_open(&self, pin: PinNumber) -> bool {
        self.peek(pin, false, |p| p.open)
    }

    pub fn mode(&self, pin: PinNumber) -> Option<PinMode> {
        self.peek(pin, None, |p| p.mode)
    }

    /// Latched level (`Low` for unknown pins).
    pub fn level(&self, pin: PinNumber) -> PinState {
        self.peek(pin, PinState::Low, |p| p.level)
    }

    /// Number of times `pin` has been closed.
    pub fn close_count(&self, pin: PinNumber) -> u32 {
        self.peek(pin, 0, |p| p.closes)
    }

    /// Every write since creation (or the last [`clear_history`](Self::clear_history)).
    pub fn history(&self) -> Vec<PinWrite> {
        self.bank.lock(|b| b.borrow().history.clone())
    }

    /// Levels written to one pin, in order.
    pub fn writes_to(&self, pin: PinNumber) -> Vec<PinState> {
        self.bank.lock(|b| {
            b.borrow()
                .history
                .iter()
                .filter(|w| w.pin == pin)
                .map(|w| w.level)
                .collect()
        })
    }

    pub fn clear_history(&self) {
        self.bank.lock(|b| b.borrow_mut().history.clear());
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Change a pin's level behind the driver's back (not recorded).
    pub fn force_level(&self, pin: PinNumber, level: PinState) {
        let _ = self.with_pin(pin, |p, _| {
            p.level = level;
            Ok(())
        });
    }

    /// Make writes and mode changes on `pin` fail with [`PinError::Io`].
    pub fn fail_pin(&self, pin: PinNumber, failing: bool) {
        let _ = self.with_pin(pin, |p, _| {
            p.failing = failing;
            Ok(())
        });
    }
}

impl PinDriver for MemoryPinDriver {
    fn open(&self, pin: PinNumber) -> Result<(), PinError> {
        self.with_pin(pin, |p, _| {
            p.open = true;
            Ok(())
        })
    }

    fn close(&self, pin: PinNumber) -> Result<(), PinError> {
        self.with_pin(pin, |p, _| {
            if !p.open {
                return Err(PinError::NotOpen(pin));
            }
            p.open = false;
            p.closes += 1;
            Ok(())
        })
    }

    fn set_mode(&self, pin: PinNumber, mode: PinMode) -> Result<(), PinError> {
        self.with_pin(pin, |p, _| {
            if !p.open {
                return Err(PinError::NotOpen(pin));
            }
            if p.failing {
                return Err(PinError::Io(pin));
            }
            p.mode = Some(mode);
            Ok(())
        })
    }

    fn write(&self, pin: PinNumber, level: PinState) -> Result<(), PinError> {
        self.with_pin(pin, |p, history| {
            if !p.open {
                return Err(PinError::NotOpen(pin));
            }
            if p.failing {
                return Err(PinError::Io(pin));
            }
            p.level = level;
            history.push(PinWrite { pin, level });
            Ok(())
        })
    }

    fn read(&self, pin: PinNumber) -> Result<PinState, PinError> {
        self.with_pin(pin, |p, _| {
            if !p.open {
                return Err(PinError::NotOpen(pin));
            }
            Ok(p.level)
        })
    }
}
