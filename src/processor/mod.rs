//! Irrigation processor: the sequencing core.
//!
//! Consumes the job queue in batches.  A batch is every job that is
//! queued when the processor wakes, plus anything enqueued while the
//! batch runs.  For each job:
//!
//! ```text
//!   resolve valve ─▶ [zone-switch delay] ─▶ MCV on ─▶ zone on
//!        │                                              │
//!   (unmapped: skip)                      wait duration (batch scope)
//!                                                       │
//!                                         zone off ─▶ MCV off
//! ```
//!
//! After the queue runs dry, every distinct zone pin used in the batch is
//! re-opened for the pressure-bleed time with the MCV closed.
//!
//! ## Cancellation
//!
//! Two scopes are in play:
//!
//! - **lifecycle** (owned by the host): ends the processor.  Cuts every
//!   wait short, including the bleed.
//! - **batch** (child of lifecycle, one per batch): cancelled by the
//!   [`IrrigationStopper`] broadcast.  Cuts the running job (or the
//!   zone-switch delay before it) short; the remaining queued jobs are then
//!   discarded and no further zone is opened.  The bleed still runs for
//!   the zones that did irrigate.
//!
//! Valves are always closed on the way out of a job, whatever ended it.
//! A pin failure aborts the batch, drives the whole board off, and the
//! loop keeps serving later batches.

pub mod status;
pub mod worker;

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use futures_lite::future;
use log::{debug, error, info, warn};

use crate::app::job::IrrigationJob;
use crate::app::ports::PinDriver;
use crate::config::IrrigationConfig;
use crate::drivers::relay::RelayBoard;
use crate::error::{ConfigError, Error, Result};
use crate::pins::{MAX_RELAYS, PinNumber};
use crate::sync::cancel::{self, CancellationToken};
use crate::sync::queue::JobReceiver;
use crate::sync::stopper::{IrrigationStopper, SubscriptionId};

pub use status::IrrigationProcessorStatus;

// ───────────────────────────────────────────────────────────────
// Reports
// ───────────────────────────────────────────────────────────────

/// What happened in one batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Jobs that energised their zone, in execution order.
    pub executed: Vec<IrrigationJob>,
    /// Jobs dropped because their valve number is not mapped.
    pub skipped: usize,
    /// Queued jobs thrown away after a stop or shutdown.
    pub discarded: usize,
    /// The batch was cut short by a stop request or shutdown.
    pub interrupted: bool,
}

/// Totals over the processor's whole run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub executed: usize,
    pub skipped: usize,
    pub discarded: usize,
    /// Batches aborted by a pin failure.
    pub failed_batches: usize,
}

impl RunSummary {
    fn record(&mut self, report: &BatchReport) {
        self.batches += 1;
        self.executed += report.executed.len();
        self.skipped += report.skipped;
        self.discarded += report.discarded;
    }
}

/// Distinct zone pins used by `jobs`, in first-use order.
///
/// Jobs whose valve is not mapped contribute nothing.
pub fn bleed_pins(
    config: &IrrigationConfig,
    jobs: &[IrrigationJob],
) -> heapless::Vec<PinNumber, MAX_RELAYS> {
    let mut pins = heapless::Vec::new();
    for job in jobs {
        if let Ok(pin) = config.pin_for_valve(job.valve) {
            if !pins.contains(&pin) {
                // A validated config never maps more than MAX_RELAYS pins.
                let _ = pins.push(pin);
            }
        }
    }
    pins
}

// ───────────────────────────────────────────────────────────────
// Batch slot
// ───────────────────────────────────────────────────────────────

/// Cancellation scope of the batch in flight, reachable from the stop hook.
struct BatchSlot {
    current: Mutex<CriticalSectionRawMutex, RefCell<Option<CancellationToken>>>,
}

impl BatchSlot {
    const fn new() -> Self {
        Self {
            current: Mutex::new(RefCell::new(None)),
        }
    }

    fn install(&self, token: CancellationToken) {
        self.current.lock(|c| *c.borrow_mut() = Some(token));
    }

    fn clear(&self) {
        self.current.lock(|c| *c.borrow_mut() = None);
    }

    /// Cancel the current batch, if any.
    fn cancel(&self) {
        let token = self.current.lock(|c| c.borrow().clone());
        match token {
            Some(token) => {
                info!("Stopping current irrigation batch");
                token.cancel();
            }
            None => debug!("Stop requested while idle"),
        }
    }
}

/// Marks the processor running and hooks the stopper for as long as the
/// run future is alive.  Dropping it (normal exit or the future being
/// dropped) undoes both.
struct RunGuard {
    status: IrrigationProcessorStatus,
    stopper: IrrigationStopper,
    subscription: SubscriptionId,
}

impl RunGuard {
    fn enter(
        status: IrrigationProcessorStatus,
        stopper: IrrigationStopper,
        slot: &Arc<BatchSlot>,
    ) -> Self {
        let slot = slot.clone();
        let subscription = stopper.subscribe(move || slot.cancel());
        status.set_running(true);
        Self {
            status,
            stopper,
            subscription,
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.stopper.unsubscribe(self.subscription);
        self.status.set_running(false);
    }
}

// ───────────────────────────────────────────────────────────────
// IrrigationProcessor
// ───────────────────────────────────────────────────────────────

/// Single consumer of the job queue.  Owns sequencing of the valves.
pub struct IrrigationProcessor<D: PinDriver> {
    jobs: JobReceiver,
    board: Arc<RelayBoard<D>>,
    stopper: IrrigationStopper,
    status: IrrigationProcessorStatus,
    config: IrrigationConfig,
    batch: Arc<BatchSlot>,
}

impl<D: PinDriver> IrrigationProcessor<D> {
    /// Fails with [`ConfigError::UnknownPin`] if `board` lacks a pin the
    /// configuration names.
    pub fn new(
        jobs: JobReceiver,
        board: Arc<RelayBoard<D>>,
        stopper: IrrigationStopper,
        status: IrrigationProcessorStatus,
        config: IrrigationConfig,
    ) -> Result<Self> {
        if let Some(pin) = config.board_pins().find(|&p| !board.contains(p)) {
            return Err(ConfigError::UnknownPin(pin).into());
        }
        Ok(Self {
            jobs,
            board,
            stopper,
            status,
            config,
            batch: Arc::new(BatchSlot::new()),
        })
    }

    /// Serve batches until the queue is completed and drained, or
    /// `lifecycle` is cancelled.
    pub async fn run(mut self, lifecycle: CancellationToken) -> RunSummary {
        let _guard = RunGuard::enter(self.status.clone(), self.stopper.clone(), &self.batch);
        info!("IrrigationProcessor started");

        let mut summary = RunSummary::default();
        while let Some(first) = self.next_job(&lifecycle).await {
            let scope = lifecycle.child_token();
            self.batch.install(scope.clone());

            let mut report = BatchReport::default();
            let outcome = self.run_batch(first, &scope, &lifecycle, &mut report).await;
            self.batch.clear();

            let outcome = match outcome {
                Ok(()) if !report.executed.is_empty() => {
                    self.bleed_pressure(&report.executed, &lifecycle).await
                }
                other => other,
            };
            if let Err(e) = outcome {
                self.fail_safe(e);
                summary.failed_batches += 1;
            }

            info!(
                "Batch finished: {} run, {} skipped, {} discarded{}",
                report.executed.len(),
                report.skipped,
                report.discarded,
                if report.interrupted { " (interrupted)" } else { "" }
            );
            summary.record(&report);
        }

        if lifecycle.is_cancelled() {
            let dropped = self.jobs.discard_pending();
            if dropped > 0 {
                info!("Shutdown discarded {} queued jobs", dropped);
                summary.discarded += dropped;
            }
        }

        info!("IrrigationProcessor stopped");
        summary
    }

    /// First job of the next batch; `None` on shutdown or a drained,
    /// completed queue.
    async fn next_job(&mut self, lifecycle: &CancellationToken) -> Option<IrrigationJob> {
        future::or(
            async {
                lifecycle.cancelled().await;
                None
            },
            self.jobs.next(),
        )
        .await
    }

    async fn run_batch(
        &mut self,
        first: IrrigationJob,
        scope: &CancellationToken,
        lifecycle: &CancellationToken,
        report: &mut BatchReport,
    ) -> Result<()> {
        let mut held = Some(first);
        loop {
            if scope.is_cancelled() || lifecycle.is_cancelled() {
                self.abandon_batch(held, report);
                return Ok(());
            }

            let Some(job) = held.take().or_else(|| self.jobs.try_next()) else {
                return Ok(());
            };
            info!("Incoming job: valve {} for {:?}", job.valve, job.duration);

            let zone = match self.config.pin_for_valve(job.valve) {
                Ok(pin) => pin,
                Err(e) => {
                    error!("Skipping job: {}", e);
                    report.skipped += 1;
                    continue;
                }
            };

            if !report.executed.is_empty() {
                debug!("Zone switch delay {:?}", self.config.zone_switch_delay);
                cancel::sleep(self.config.zone_switch_delay, scope).await;
                // A stop during the delay ends the batch before the MCV moves.
                if scope.is_cancelled() || lifecycle.is_cancelled() {
                    self.abandon_batch(Some(job), report);
                    return Ok(());
                }
            }

            self.irrigate(zone, job, scope).await?;
            report.executed.push(job);
        }
    }

    /// Discard `held` (a job taken but not started) and everything still queued.
    fn abandon_batch(&mut self, held: Option<IrrigationJob>, report: &mut BatchReport) {
        report.interrupted = true;
        report.discarded += usize::from(held.is_some()) + self.jobs.discard_pending();
        if report.discarded > 0 {
            info!("Discarding {} queued jobs", report.discarded);
        }
    }

    /// Run one job.  Valves are closed again on every path that reaches
    /// the end of the wait.
    async fn irrigate(
        &self,
        zone: PinNumber,
        job: IrrigationJob,
        scope: &CancellationToken,
    ) -> Result<()> {
        let mcv = self.config.master_control_valve_pin;

        info!("Turning on MCV");
        self.board.set(mcv, true)?;
        info!("Opening valve {} (pin {})", job.valve, zone);
        self.board.set(zone, true)?;

        if cancel::sleep(job.duration, scope).await {
            debug!("Valve {} ran full {:?}", job.valve, job.duration);
        } else {
            info!("Valve {} stopped early", job.valve);
        }

        info!("Closing valve {} (pin {})", job.valve, zone);
        self.board.set(zone, false)?;
        info!("Turning off MCV");
        self.board.set(mcv, false)?;
        Ok(())
    }

    /// Vent the manifold through every zone used in the batch, MCV closed.
    async fn bleed_pressure(
        &self,
        executed: &[IrrigationJob],
        lifecycle: &CancellationToken,
    ) -> Result<()> {
        let pins = bleed_pins(&self.config, executed);
        info!("Bleeding pressure through {} zones", pins.len());
        for pin in pins {
            self.board.set(pin, true)?;
            cancel::sleep(self.config.pressure_bleed_time, lifecycle).await;
            self.board.set(pin, false)?;
        }
        info!("Pressure bled, irrigation complete");
        Ok(())
    }

    fn fail_safe(&self, cause: Error) {
        error!("Irrigation batch aborted: {}", cause);
        match self.board.all_off() {
            Ok(()) => warn!("All valves closed after failure"),
            Err(e) => error!("Could not close every valve: {}", e),
        }
    }
}
