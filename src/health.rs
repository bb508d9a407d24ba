//! Health reporting.
//!
//! Two checks feed the overall status: the application itself (healthy
//! whenever it can answer) and the irrigation processor (healthy only
//! while its loop is running).  Reports serialise to JSON for the
//! operator console.

use serde::Serialize;

use crate::processor::IrrigationProcessorStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of one health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub name: &'static str,
    pub status: HealthStatus,
    pub description: &'static str,
}

/// Liveness of the process itself.
pub fn application() -> HealthReport {
    HealthReport {
        name: "application",
        status: HealthStatus::Healthy,
        description: "Application is running",
    }
}

/// Liveness of the irrigation processor loop.
pub fn processor(status: &IrrigationProcessorStatus) -> HealthReport {
    if status.is_running() {
        HealthReport {
            name: "irrigation_processor",
            status: HealthStatus::Healthy,
            description: "Irrigation processor is running",
        }
    } else {
        HealthReport {
            name: "irrigation_processor",
            status: HealthStatus::Unhealthy,
            description: "Irrigation processor is not running",
        }
    }
}

/// Worst status among `reports`; healthy when there are none.
pub fn overall(reports: &[HealthReport]) -> HealthStatus {
    if reports.iter().any(|r| r.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else {
        HealthStatus::Healthy
    }
}

/// Every check, in display order.
pub fn check_all(status: &IrrigationProcessorStatus) -> [HealthReport; 2] {
    [application(), processor(status)]
}
