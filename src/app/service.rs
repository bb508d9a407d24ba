//! Irrigation system: wires the sequencer together.
//!
//! [`IrrigationSystem`] owns the relay board, the job queue, the stop
//! broadcast and the processor worker.  It exposes the producer-facing
//! handles and the start/stop lifecycle to the host.
//!
//! ```text
//!   JobSender ──▶ ┌────────────────────────────┐
//!                 │     IrrigationSystem        │──▶ RelayBoard ──▶ PinDriver
//! Stopper ──────▶ │ PinInitializer · Processor  │
//!                 └────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! 1. [`new`](IrrigationSystem::new) validates the config and opens the
//!    board pins.
//! 2. [`start`](IrrigationSystem::start) closes every valve, then spawns
//!    the processor on its worker thread.
//! 3. [`finish`](IrrigationSystem::finish) lets the queue drain, or
//!    [`shutdown`](IrrigationSystem::shutdown) cancels in-flight work.
//!    Both close every valve again and release the pins.

use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info, warn};

use crate::config::IrrigationConfig;
use crate::drivers::pin_init::PinInitializer;
use crate::drivers::relay::RelayBoard;
use crate::error::{Error, Result};
use crate::health::{self, HealthReport};
use crate::processor::{IrrigationProcessor, IrrigationProcessorStatus, RunSummary, worker};
use crate::sync::cancel::CancellationToken;
use crate::sync::queue::{JobReceiver, JobSender, job_queue};
use crate::sync::stopper::IrrigationStopper;

use super::ports::PinDriver;

pub struct IrrigationSystem<D: PinDriver + 'static> {
    config: IrrigationConfig,
    board: Arc<RelayBoard<D>>,
    initializer: PinInitializer<D>,
    jobs: JobSender,
    receiver: Option<JobReceiver>,
    stopper: IrrigationStopper,
    status: IrrigationProcessorStatus,
    lifecycle: CancellationToken,
    worker: Option<JoinHandle<RunSummary>>,
}

impl<D: PinDriver + 'static> IrrigationSystem<D> {
    /// Validate `config` and take ownership of its pins on `driver`.
    pub fn new(config: IrrigationConfig, driver: Arc<D>) -> Result<Self> {
        config.validate()?;
        let board = Arc::new(RelayBoard::create(
            config.relay_wiring,
            driver,
            config.board_pins(),
        )?);
        let initializer = PinInitializer::new(board.clone(), &config);
        let (jobs, receiver) = job_queue();

        info!(
            "Irrigation system ready: MCV pin {}, {} zones, {:?}",
            config.master_control_valve_pin,
            config.valves.len(),
            config.relay_wiring
        );

        Ok(Self {
            config,
            board,
            initializer,
            jobs,
            receiver: Some(receiver),
            stopper: IrrigationStopper::new(),
            status: IrrigationProcessorStatus::new(),
            lifecycle: CancellationToken::new(),
            worker: None,
        })
    }

    /// Close every valve, then start the processor.
    ///
    /// The processor ends when `lifecycle` (or [`shutdown`](Self::shutdown))
    /// cancels it.  A second call is a no-op.
    pub fn start(&mut self, lifecycle: &CancellationToken) -> Result<()> {
        let Some(receiver) = self.receiver.take() else {
            warn!("Irrigation system already started");
            return Ok(());
        };

        if let Err(e) = self.initializer.start() {
            self.receiver = Some(receiver);
            return Err(e);
        }

        self.lifecycle = lifecycle.child_token();
        let processor = IrrigationProcessor::new(
            receiver,
            self.board.clone(),
            self.stopper.clone(),
            self.status.clone(),
            self.config.clone(),
        )?;
        let handle = worker::spawn(processor, self.lifecycle.clone()).map_err(|e| {
            error!("Failed to spawn processor worker: {}", e);
            Error::Worker
        })?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Producer handle for the job queue.
    pub fn jobs(&self) -> JobSender {
        self.jobs.clone()
    }

    pub fn stopper(&self) -> IrrigationStopper {
        self.stopper.clone()
    }

    pub fn status(&self) -> IrrigationProcessorStatus {
        self.status.clone()
    }

    pub fn config(&self) -> &IrrigationConfig {
        &self.config
    }

    pub fn board(&self) -> &Arc<RelayBoard<D>> {
        &self.board
    }

    /// Stop the running job and discard the queue.  The processor keeps serving.
    pub fn request_stop(&self) {
        self.stopper.request_stop();
    }

    pub fn health(&self) -> [HealthReport; 2] {
        health::check_all(&self.status)
    }

    /// Stop accepting jobs, let the queue drain, then release the hardware.
    pub fn finish(mut self) -> Result<RunSummary> {
        self.jobs.complete();
        self.close()
    }

    /// Cancel in-flight work, then release the hardware.
    pub fn shutdown(mut self) -> Result<RunSummary> {
        self.jobs.complete();
        self.lifecycle.cancel();
        self.close()
    }

    fn close(&mut self) -> Result<RunSummary> {
        let summary = match self.worker.take() {
            Some(handle) => handle.join().map_err(|_| {
                error!("Processor worker panicked");
                Error::Worker
            }),
            None => Ok(RunSummary::default()),
        };

        let released = self.initializer.stop();
        self.board.dispose();
        info!("Irrigation system shut down");

        let summary = summary?;
        released?;
        Ok(summary)
    }
}

impl<D: PinDriver + 'static> Drop for IrrigationSystem<D> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.lifecycle.cancel();
            if let Err(e) = self.close() {
                warn!("Irrigation system shutdown on drop: {}", e);
            }
        }
    }
}
