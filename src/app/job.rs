//! Irrigation job records.
//!
//! Created by the request layer, consumed exactly once by the
//! [`IrrigationProcessor`](crate::processor::IrrigationProcessor).

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pins::ValveNumber;

/// Run one zone for a fixed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrigationJob {
    /// Zone to irrigate, by valve number.
    pub valve: ValveNumber,
    /// How long the zone stays open.
    #[serde(rename = "duration_ms", with = "crate::config::duration_ms")]
    pub duration: Duration,
}

impl IrrigationJob {
    pub const fn new(valve: ValveNumber, duration: Duration) -> Self {
        Self { valve, duration }
    }

    /// Fixed-length job used to exercise a single valve from the console.
    pub const fn valve_test(valve: ValveNumber) -> Self {
        Self::new(valve, VALVE_TEST_DURATION)
    }
}

/// Duration of an operator-requested valve test.
pub const VALVE_TEST_DURATION: Duration = Duration::from_secs(120);
