//! Multi-producer, single-consumer job queue.
//!
//! A tokio unbounded channel of [`IrrigationJob`]s.  Producers hold a
//! clonable [`JobSender`]; the processor owns the one [`JobReceiver`].
//! All sender clones share a single channel sender, so
//! [`complete`](JobSender::complete) drops it and closes the channel for
//! everyone.  The receiver still drains what was queued before that.
//!
//! The channel only needs tokio's `sync` feature; the receiver is awaited
//! on the worker's `edge_executor`.

use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::app::job::IrrigationJob;
use crate::config::IrrigationConfig;
use crate::error::{QueueError, Result};
use crate::pins::ValveNumber;

struct Shared {
    /// `None` once the queue is completed.
    tx: Mutex<CriticalSectionRawMutex, RefCell<Option<UnboundedSender<IrrigationJob>>>>,
    /// Jobs sent but not yet taken by the receiver.
    pending: AtomicUsize,
}

/// Create a connected sender/receiver pair.
pub fn job_queue() -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        tx: Mutex::new(RefCell::new(Some(tx))),
        pending: AtomicUsize::new(0),
    });
    (
        JobSender {
            shared: shared.clone(),
        },
        JobReceiver { rx, shared },
    )
}

// ───────────────────────────────────────────────────────────────
// Producer side
// ───────────────────────────────────────────────────────────────

/// Producer handle.  Cheap to clone; every clone feeds the same queue.
#[derive(Clone)]
pub struct JobSender {
    shared: Arc<Shared>,
}

impl JobSender {
    /// Append one job.
    pub fn enqueue(&self, job: IrrigationJob) -> core::result::Result<(), QueueError> {
        self.enqueue_all([job])?;
        debug!("Queued job: valve {} for {:?}", job.valve, job.duration);
        Ok(())
    }

    /// Append several jobs as one contiguous run.  Returns how many were queued.
    pub fn enqueue_all(
        &self,
        jobs: impl IntoIterator<Item = IrrigationJob>,
    ) -> core::result::Result<usize, QueueError> {
        self.shared.tx.lock(|tx| {
            let tx = tx.borrow();
            let tx = tx.as_ref().ok_or(QueueError::Closed)?;
            let mut count = 0;
            for job in jobs {
                // Counted before sending so the receiver never sees it negative.
                self.shared.pending.fetch_add(1, Ordering::AcqRel);
                if tx.send(job).is_err() {
                    self.shared.pending.fetch_sub(1, Ordering::AcqRel);
                    return Err(QueueError::Closed);
                }
                count += 1;
            }
            Ok(count)
        })
    }

    /// Queue a two-minute run of `valve`, rejecting numbers the
    /// configuration does not map.
    pub fn test_valve(&self, config: &IrrigationConfig, valve: ValveNumber) -> Result<()> {
        config.pin_for_valve(valve)?;
        info!("Valve test requested for valve {}", valve);
        self.enqueue(IrrigationJob::valve_test(valve))?;
        Ok(())
    }

    /// Stop accepting jobs.  Already-queued jobs are still delivered.
    pub fn complete(&self) {
        if self.shared.tx.lock(|tx| tx.borrow_mut().take()).is_some() {
            info!("Job queue completed");
        }
    }

    pub fn is_completed(&self) -> bool {
        self.shared.tx.lock(|tx| tx.borrow().is_none())
    }

    /// Jobs waiting to be picked up.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// Consumer side
// ───────────────────────────────────────────────────────────────

/// Consumer handle.  There is exactly one per queue.
pub struct JobReceiver {
    rx: UnboundedReceiver<IrrigationJob>,
    shared: Arc<Shared>,
}

impl JobReceiver {
    fn taken(&self, job: IrrigationJob) -> IrrigationJob {
        self.shared.pending.fetch_sub(1, Ordering::AcqRel);
        job
    }

    /// Wait for the next job.  `None` once the queue is completed and empty.
    pub async fn next(&mut self) -> Option<IrrigationJob> {
        let job = self.rx.recv().await?;
        Some(self.taken(job))
    }

    /// Take the oldest job without waiting.
    pub fn try_next(&mut self) -> Option<IrrigationJob> {
        let job = self.rx.try_recv().ok()?;
        Some(self.taken(job))
    }

    /// Throw away every queued job.  Returns how many were dropped.
    pub fn discard_pending(&mut self) -> usize {
        core::iter::from_fn(|| self.try_next()).count()
    }

    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }
}
