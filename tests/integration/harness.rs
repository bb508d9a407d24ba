//! Shared fixture for integration tests.
//!
//! Builds a small three-zone installation on the in-memory pin driver
//! with short delays, plus polling helpers for tests that run the
//! processor on its worker thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use embedded_hal::digital::PinState;
use irrigation::app::job::IrrigationJob;
use irrigation::config::{IrrigationConfig, ValveMapping};
use irrigation::drivers::memory_pins::MemoryPinDriver;
use irrigation::drivers::relay::{RelayBoard, RelayWiring};
use irrigation::pins::PinNumber;
use irrigation::processor::{IrrigationProcessor, IrrigationProcessorStatus, RunSummary, worker};
use irrigation::sync::cancel::CancellationToken;
use irrigation::sync::queue::{JobSender, job_queue};
use irrigation::sync::stopper::IrrigationStopper;

pub const MCV: PinNumber = 1;
/// Zone pins for valves 1, 2 and 3.
pub const ZONES: [PinNumber; 3] = [2, 3, 4];

/// Generous bound on anything that should happen "promptly".
pub const PROMPTLY: Duration = Duration::from_secs(5);

pub fn config() -> IrrigationConfig {
    IrrigationConfig {
        master_control_valve_pin: MCV,
        pressure_bleed_time: Duration::from_millis(10),
        zone_switch_delay: Duration::from_millis(10),
        relay_wiring: RelayWiring::NormallyOpen,
        valves: ZONES
            .iter()
            .enumerate()
            .map(|(i, &pin)| ValveMapping {
                pin,
                valve_number: i as u16 + 1,
            })
            .collect(),
    }
}

pub fn job_ms(valve: u16, ms: u64) -> IrrigationJob {
    IrrigationJob::new(valve, Duration::from_millis(ms))
}

/// Electrical level a normally-open relay shows when on / off.
pub const ON: PinState = PinState::Low;
pub const OFF: PinState = PinState::High;

pub struct Rig {
    pub driver: Arc<MemoryPinDriver>,
    pub board: Arc<RelayBoard<MemoryPinDriver>>,
    pub jobs: JobSender,
    pub stopper: IrrigationStopper,
    pub status: IrrigationProcessorStatus,
    pub lifecycle: CancellationToken,
    processor: Option<IrrigationProcessor<MemoryPinDriver>>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: IrrigationConfig) -> Self {
        let driver = Arc::new(MemoryPinDriver::new(16));
        let board = Arc::new(
            RelayBoard::create(config.relay_wiring, driver.clone(), config.board_pins()).unwrap(),
        );
        for pin in config.board_pins() {
            board.set(pin, false).unwrap();
        }
        driver.clear_history();

        let (jobs, receiver) = job_queue();
        let stopper = IrrigationStopper::new();
        let status = IrrigationProcessorStatus::new();
        let processor = IrrigationProcessor::new(
            receiver,
            board.clone(),
            stopper.clone(),
            status.clone(),
            config,
        )
        .unwrap();

        Self {
            driver,
            board,
            jobs,
            stopper,
            status,
            lifecycle: CancellationToken::new(),
            processor: Some(processor),
        }
    }

    /// Run the processor to completion on this thread.
    pub fn run_to_end(&mut self) -> RunSummary {
        let processor = self.processor.take().unwrap();
        worker::run_blocking(processor, self.lifecycle.clone())
    }

    /// Start the processor on its worker thread.
    pub fn spawn(&mut self) -> JoinHandle<RunSummary> {
        let processor = self.processor.take().unwrap();
        let handle = worker::spawn(processor, self.lifecycle.clone()).unwrap();
        assert!(wait_until(PROMPTLY, || self.status.is_running()));
        handle
    }

    pub fn is_on(&self, pin: PinNumber) -> bool {
        self.driver.level(pin) == ON
    }

    pub fn all_off(&self) -> bool {
        core::iter::once(MCV)
            .chain(ZONES)
            .all(|pin| self.driver.level(pin) == OFF)
    }

    /// Zone pins switched on, in order (MCV excluded).
    pub fn zones_energised(&self) -> Vec<PinNumber> {
        self.driver
            .history()
            .iter()
            .filter(|w| w.pin != MCV && w.level == ON)
            .map(|w| w.pin)
            .collect()
    }
}

/// Poll `cond` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
