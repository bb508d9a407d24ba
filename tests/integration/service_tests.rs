//! IrrigationSystem lifecycle: initializer, worker thread, shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use irrigation::app::service::IrrigationSystem;
use irrigation::drivers::memory_pins::MemoryPinDriver;
use irrigation::error::{ConfigError, Error};
use irrigation::health::{self, HealthStatus};
use irrigation::sync::cancel::CancellationToken;

use super::harness::*;

fn system() -> (IrrigationSystem<MemoryPinDriver>, Arc<MemoryPinDriver>) {
    let driver = Arc::new(MemoryPinDriver::new(16));
    let system = IrrigationSystem::new(config(), driver.clone()).unwrap();
    (system, driver)
}

#[test]
fn start_closes_valves_before_processing() {
    let (mut system, driver) = system();
    system.start(&CancellationToken::new()).unwrap();

    for pin in core::iter::once(MCV).chain(ZONES) {
        assert_eq!(driver.level(pin), OFF);
        assert!(driver.is_open(pin));
    }
    assert!(wait_until(PROMPTLY, || system.status().is_running()));
    system.shutdown().unwrap();
}

#[test]
fn finish_drains_queue_and_releases_pins() {
    let (mut system, driver) = system();
    system.start(&CancellationToken::new()).unwrap();
    let jobs = system.jobs();
    jobs.enqueue_all([job_ms(1, 5), job_ms(3, 5)]).unwrap();

    let summary = system.finish().unwrap();

    assert_eq!(summary.executed, 2);
    for pin in core::iter::once(MCV).chain(ZONES) {
        assert!(!driver.is_open(pin), "pin {pin} still open");
        assert_eq!(driver.close_count(pin), 1);
    }
    assert!(jobs.enqueue(job_ms(1, 5)).is_err());
}

#[test]
fn shutdown_cancels_long_job_promptly() {
    let (mut system, driver) = system();
    system.start(&CancellationToken::new()).unwrap();
    system.jobs().enqueue(job_ms(2, 60_000)).unwrap();
    assert!(wait_until(PROMPTLY, || driver.level(3) == ON));

    let started = Instant::now();
    let summary = system.shutdown().unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(summary.executed, 1);
    assert_eq!(driver.level(3), OFF);
    assert_eq!(driver.level(MCV), OFF);
}

#[test]
fn parent_lifecycle_cancels_processor() {
    let (mut system, _driver) = system();
    let lifecycle = CancellationToken::new();
    system.start(&lifecycle).unwrap();
    let status = system.status();
    assert!(wait_until(PROMPTLY, || status.is_running()));

    lifecycle.cancel();

    assert!(wait_until(PROMPTLY, || !status.is_running()));
    system.shutdown().unwrap();
}

#[test]
fn second_start_is_noop() {
    let (mut system, _driver) = system();
    let lifecycle = CancellationToken::new();
    system.start(&lifecycle).unwrap();
    system.start(&lifecycle).unwrap();
    system.shutdown().unwrap();
}

#[test]
fn request_stop_reaches_processor() {
    let (mut system, driver) = system();
    system.start(&CancellationToken::new()).unwrap();
    let jobs = system.jobs();
    jobs.enqueue_all([job_ms(1, 60_000), job_ms(2, 60_000)]).unwrap();
    assert!(wait_until(PROMPTLY, || driver.level(2) == ON));

    system.request_stop();

    assert!(wait_until(PROMPTLY, || driver.level(2) == OFF && jobs.pending() == 0));
    assert!(system.status().is_running());
    let summary = system.finish().unwrap();
    assert_eq!(summary.discarded, 1);
    assert!(!driver.writes_to(3).contains(&ON));
}

#[test]
fn health_follows_processor() {
    let (mut system, _driver) = system();
    assert_eq!(health::overall(&system.health()), HealthStatus::Unhealthy);

    system.start(&CancellationToken::new()).unwrap();
    assert!(wait_until(PROMPTLY, || system.status().is_running()));
    assert_eq!(health::overall(&system.health()), HealthStatus::Healthy);
    system.shutdown().unwrap();
}

#[test]
fn invalid_config_rejected_before_touching_pins() {
    let driver = Arc::new(MemoryPinDriver::new(16));
    let mut config = config();
    config.valves[1].pin = MCV;

    let result = IrrigationSystem::new(config, driver.clone());

    assert!(matches!(result, Err(Error::Config(ConfigError::DuplicatePin(MCV)))));
    assert!(!driver.is_open(MCV));
}

#[test]
fn drop_without_shutdown_stops_worker() {
    let (mut system, driver) = system();
    system.start(&CancellationToken::new()).unwrap();
    let status = system.status();
    assert!(wait_until(PROMPTLY, || status.is_running()));

    drop(system);

    assert!(!status.is_running());
    assert!(!driver.is_open(MCV));
}
