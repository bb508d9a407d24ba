//! Valve pin initializer.
//!
//! Drives the master control valve and every zone valve to the closed
//! state in output mode.  Runs once before the processor is spawned and
//! once more on shutdown; both passes force the safe state regardless of
//! what the pins currently read, so repeated calls converge on the same
//! pin states.

use std::sync::Arc;

use log::{info, warn};

use crate::app::ports::PinDriver;
use crate::config::IrrigationConfig;
use crate::drivers::relay::RelayBoard;
use crate::error::Result;
use crate::pins::PinNumber;

pub struct PinInitializer<D: PinDriver> {
    board: Arc<RelayBoard<D>>,
    valve_pins: Vec<PinNumber>,
}

impl<D: PinDriver> PinInitializer<D> {
    pub fn new(board: Arc<RelayBoard<D>>, config: &IrrigationConfig) -> Self {
        Self {
            board,
            valve_pins: config.board_pins().collect(),
        }
    }

    /// Close every valve before irrigation is allowed to start.
    pub fn start(&self) -> Result<()> {
        self.drive_safe()?;
        info!("PinInitializer: {} valve pins closed", self.valve_pins.len());
        Ok(())
    }

    /// Return every valve to the closed state on shutdown.
    pub fn stop(&self) -> Result<()> {
        self.drive_safe()?;
        info!("PinInitializer: valves closed for shutdown");
        Ok(())
    }

    /// Every pin is attempted; the first failure is returned.
    fn drive_safe(&self) -> Result<()> {
        let mut first_err = None;
        for &pin in &self.valve_pins {
            if let Err(e) = self.close_pin(pin) {
                warn!("PinInitializer: failed to close pin {}: {}", pin, e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn close_pin(&self, pin: PinNumber) -> Result<()> {
        let relay = self.board.relay(pin)?;
        relay.ensure_output()?;
        relay.set_on(false)?;
        Ok(())
    }
}
