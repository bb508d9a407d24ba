//! Processor sequencing against the in-memory pin driver.

use std::time::{Duration, Instant};

use irrigation::error::{ConfigError, Error};
use irrigation::processor::IrrigationProcessor;
use irrigation::sync::queue::job_queue;
use irrigation::drivers::memory_pins::PinWrite;

use super::harness::*;

fn w(pin: u8, level: embedded_hal::digital::PinState) -> PinWrite {
    PinWrite { pin, level }
}

// ── Single job: MCV brackets the zone, then the zone bleeds ──

#[test]
fn single_job_full_sequence() {
    let mut rig = Rig::new();
    rig.jobs.enqueue(job_ms(1, 20)).unwrap();
    rig.jobs.complete();

    let summary = rig.run_to_end();

    assert_eq!(summary.batches, 1);
    assert_eq!(summary.executed, 1);
    assert_eq!(
        rig.driver.history(),
        vec![
            w(MCV, ON),
            w(2, ON),
            w(2, OFF),
            w(MCV, OFF),
            // pressure bleed, MCV stays closed
            w(2, ON),
            w(2, OFF),
        ]
    );
    assert!(rig.all_off());
    assert!(!rig.status.is_running());
}

// ── Jobs run in FIFO order; bleed covers each zone once ──────

#[test]
fn jobs_run_in_order_and_bleed_is_distinct() {
    let mut rig = Rig::new();
    rig.jobs
        .enqueue_all([job_ms(2, 5), job_ms(1, 5), job_ms(2, 5)])
        .unwrap();
    rig.jobs.complete();

    let summary = rig.run_to_end();

    assert_eq!(summary.executed, 3);
    // three jobs, then one bleed pulse per distinct zone
    assert_eq!(rig.zones_energised(), vec![3, 2, 3, 3, 2]);
    assert_eq!(rig.driver.writes_to(MCV).iter().filter(|&&l| l == ON).count(), 3);
    assert!(rig.all_off());
}

// ── Zone-switch delay separates consecutive zones ────────────

#[test]
fn zone_switch_delay_holds_mcv_closed_between_zones() {
    const DELAY: Duration = Duration::from_millis(200);
    let mut config = config();
    config.zone_switch_delay = DELAY;
    let mut rig = Rig::with_config(config);
    rig.jobs.enqueue_all([job_ms(1, 5), job_ms(2, 5)]).unwrap();
    rig.jobs.complete();
    let started = Instant::now();
    let handle = rig.spawn();

    let mcv_writes = |n: usize| {
        let deadline = Instant::now() + PROMPTLY;
        while rig.driver.writes_to(MCV).len() < n {
            assert!(Instant::now() < deadline, "MCV never reached {n} writes");
            std::thread::yield_now();
        }
        Instant::now()
    };
    let first_closed = mcv_writes(2);
    let reopened = mcv_writes(3);
    let summary = handle.join().unwrap();

    assert_eq!(summary.executed, 2);
    assert!(started.elapsed() >= DELAY);
    // spin-polled, so allow a little observation lag on the first edge
    assert!(reopened - first_closed >= DELAY - Duration::from_millis(50));
    assert_eq!(
        rig.driver.history()[..6],
        [w(MCV, ON), w(2, ON), w(2, OFF), w(MCV, OFF), w(MCV, ON), w(3, ON)]
    );
}

// ── Unmapped valve: skipped before the MCV is touched ────────

#[test]
fn unmapped_valve_is_skipped_and_batch_continues() {
    let mut rig = Rig::new();
    rig.jobs.enqueue_all([job_ms(9, 5), job_ms(3, 5)]).unwrap();
    rig.jobs.complete();

    let summary = rig.run_to_end();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.executed, 1);
    assert_eq!(rig.driver.history()[..2], [w(MCV, ON), w(4, ON)]);
    assert_eq!(rig.zones_energised(), vec![4, 4]);
}

#[test]
fn batch_of_only_unmapped_jobs_skips_bleed() {
    let mut rig = Rig::new();
    rig.jobs.enqueue(job_ms(7, 5)).unwrap();
    rig.jobs.complete();

    let summary = rig.run_to_end();

    assert_eq!(summary.skipped, 1);
    assert!(rig.driver.history().is_empty());
}

// ── Completed empty queue ends the loop ──────────────────────

#[test]
fn completed_empty_queue_exits_cleanly() {
    let mut rig = Rig::new();
    rig.jobs.complete();
    let summary = rig.run_to_end();
    assert_eq!(summary.batches, 0);
    assert!(!rig.status.is_running());
}

// ── Stop request: current job cut short, queue discarded ─────

#[test]
fn stop_cuts_running_job_and_discards_queue() {
    let mut rig = Rig::new();
    rig.jobs
        .enqueue_all([job_ms(1, 60_000), job_ms(2, 60_000)])
        .unwrap();
    let started = Instant::now();
    let handle = rig.spawn();

    assert!(wait_until(PROMPTLY, || rig.is_on(2)));
    rig.stopper.request_stop();
    assert!(wait_until(PROMPTLY, || !rig.is_on(2) && !rig.is_on(MCV)));

    rig.jobs.complete();
    let summary = handle.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.discarded, 1);
    assert!(!rig.driver.writes_to(3).contains(&ON), "second zone must never open");
    // bleed still ran for the zone that irrigated
    assert_eq!(rig.zones_energised(), vec![2, 2]);
    assert!(rig.all_off());
}

#[test]
fn stop_during_zone_switch_delay_opens_no_further_zone() {
    let mut config = config();
    config.zone_switch_delay = Duration::from_secs(2);
    let mut rig = Rig::with_config(config);
    rig.jobs
        .enqueue_all([job_ms(1, 10), job_ms(2, 60_000)])
        .unwrap();
    let started = Instant::now();
    let handle = rig.spawn();

    // MCV closed after the first job: the processor is now in the delay
    assert!(wait_until(PROMPTLY, || rig.driver.writes_to(MCV) == vec![ON, OFF]));
    rig.stopper.request_stop();

    rig.jobs.complete();
    let summary = handle.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.discarded, 1);
    assert!(!rig.driver.writes_to(3).contains(&ON), "second zone must never open");
    assert_eq!(rig.driver.writes_to(MCV).iter().filter(|&&l| l == ON).count(), 1);
    assert_eq!(rig.zones_energised(), vec![2, 2]);
    assert!(rig.all_off());
}

#[test]
fn processor_keeps_serving_after_stop() {
    let mut rig = Rig::new();
    rig.jobs.enqueue(job_ms(1, 60_000)).unwrap();
    let handle = rig.spawn();

    assert!(wait_until(PROMPTLY, || rig.is_on(2)));
    rig.stopper.request_stop();
    assert!(wait_until(PROMPTLY, || rig.jobs.pending() == 0 && rig.all_off()));

    rig.jobs.enqueue(job_ms(3, 5)).unwrap();
    rig.jobs.complete();
    let summary = handle.join().unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.executed, 2);
    assert!(rig.driver.writes_to(4).contains(&ON));
}

#[test]
fn stop_while_idle_is_harmless() {
    let mut rig = Rig::new();
    let handle = rig.spawn();

    rig.stopper.request_stop();
    rig.jobs.enqueue(job_ms(2, 5)).unwrap();
    rig.jobs.complete();
    let summary = handle.join().unwrap();

    assert_eq!(summary.executed, 1);
    assert_eq!(summary.discarded, 0);
}

// ── Lifecycle cancellation ends everything promptly ──────────

#[test]
fn lifecycle_cancel_closes_valves_and_exits() {
    let mut config = config();
    config.pressure_bleed_time = Duration::from_secs(60);
    let mut rig = Rig::with_config(config);
    rig.jobs
        .enqueue_all([job_ms(1, 60_000), job_ms(2, 60_000)])
        .unwrap();
    let started = Instant::now();
    let handle = rig.spawn();

    assert!(wait_until(PROMPTLY, || rig.is_on(2)));
    rig.lifecycle.cancel();
    let summary = handle.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.discarded, 1);
    assert!(rig.all_off());
    assert!(!rig.status.is_running());
    assert_eq!(rig.stopper.subscriber_count(), 0);
}

#[test]
fn lifecycle_cancel_while_idle_exits() {
    let mut rig = Rig::new();
    let handle = rig.spawn();
    assert_eq!(rig.stopper.subscriber_count(), 1);

    rig.lifecycle.cancel();
    let summary = handle.join().unwrap();

    assert_eq!(summary.batches, 0);
    assert!(!rig.status.is_running());
    assert!(rig.driver.history().is_empty());
}

// ── Pin failure: batch aborted, board driven off, loop survives

#[test]
fn pin_failure_aborts_batch_and_later_jobs_still_run() {
    let mut rig = Rig::new();
    rig.driver.fail_pin(3, true);
    rig.jobs.enqueue_all([job_ms(2, 5), job_ms(1, 5)]).unwrap();
    rig.jobs.complete();

    let summary = rig.run_to_end();

    assert_eq!(summary.failed_batches, 1);
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.batches, 2);
    assert!(rig.driver.writes_to(2).contains(&ON));
    assert_eq!(rig.driver.level(MCV), OFF);
    assert_eq!(rig.driver.level(2), OFF);
}

// ── Construction ─────────────────────────────────────────────

#[test]
fn processor_rejects_board_missing_config_pins() {
    let rig = Rig::new();
    let mut config = config();
    config.valves[0].pin = 9;
    let (_tx, rx) = job_queue();

    let result = IrrigationProcessor::new(
        rx,
        rig.board.clone(),
        rig.stopper.clone(),
        rig.status.clone(),
        config,
    );

    assert!(matches!(result, Err(Error::Config(ConfigError::UnknownPin(9)))));
}
