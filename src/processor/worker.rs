//! Dedicated worker thread for the processor.
//!
//! The processor future runs on an `edge_executor::LocalExecutor` driven
//! by `futures_lite::future::block_on`, on its own named thread, so
//! producers and the stop broadcast never share a thread with sequencing.

use std::thread::JoinHandle;

use edge_executor::LocalExecutor;
use futures_lite::future;
use log::info;

use crate::app::ports::PinDriver;
use crate::sync::cancel::CancellationToken;

use super::{IrrigationProcessor, RunSummary};

const THREAD_NAME: &str = "irrigation";
const STACK_SIZE: usize = 64 * 1024;

/// Spawn `processor` on its worker thread.  The handle yields the run summary.
pub fn spawn<D: PinDriver + 'static>(
    processor: IrrigationProcessor<D>,
    lifecycle: CancellationToken,
) -> std::io::Result<JoinHandle<RunSummary>> {
    info!("Spawning '{}' worker thread", THREAD_NAME);
    std::thread::Builder::new()
        .name(THREAD_NAME.into())
        .stack_size(STACK_SIZE)
        .spawn(move || run_blocking(processor, lifecycle))
}

/// Drive `processor` to completion on the current thread.
pub fn run_blocking<D: PinDriver + 'static>(
    processor: IrrigationProcessor<D>,
    lifecycle: CancellationToken,
) -> RunSummary {
    let executor: LocalExecutor<'_, 4> = LocalExecutor::new();
    let task = executor.spawn(processor.run(lifecycle));
    future::block_on(executor.run(task))
}
