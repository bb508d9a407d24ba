//! Inbound operator commands.
//!
//! Produced by the console adapter, interpreted by the host binary
//! against an [`IrrigationSystem`](super::service::IrrigationSystem).

use super::job::IrrigationJob;
use crate::pins::ValveNumber;

/// Requests the operator console can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Queue one irrigation job.
    Run(IrrigationJob),

    /// Queue the fixed-length valve test for one valve.
    TestValve(ValveNumber),

    /// Stop the running job and discard the queue.
    Stop,

    /// Report whether the processor is running and how many jobs wait.
    Status,

    /// Print every health check.
    Health,

    /// Print the active configuration.
    ShowConfig,

    /// Finish the queued work and exit.
    Quit,
}
