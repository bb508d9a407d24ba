//! Processor liveness flag.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, read-mostly view of whether the processor loop is running.
///
/// Clones observe the same flag.  Only the processor writes it.
#[derive(Debug, Clone, Default)]
pub struct IrrigationProcessorStatus {
    running: Arc<AtomicBool>,
}

impl IrrigationProcessorStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }
}
