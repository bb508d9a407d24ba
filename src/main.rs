//! Irrigation sequencer: host simulation entry point.
//!
//! Runs the full sequencer against the in-memory pin driver and takes
//! operator commands from stdin.
//!
//! ```text
//!   stdin ──▶ console::parse_line ──▶ Command
//!                                       │
//!            ┌──────────────────────────┼─────────────────────┐
//!            ▼                          ▼                     ▼
//!        JobSender               IrrigationStopper      status / health
//!            │                          │
//!            ▼                          ▼
//!   ┌──────────────────── IrrigationSystem ─────────────────────┐
//!   │  PinInitializer · IrrigationProcessor (worker thread)     │
//!   │  RelayBoard ──▶ MemoryPinDriver                           │
//!   └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `irrigation-sim [config.json]`.  EOF or `quit` lets the queue
//! drain before exiting.
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use irrigation::adapters::{console, console_log};
use irrigation::app::commands::Command;
use irrigation::app::service::IrrigationSystem;
use irrigation::config::IrrigationConfig;
use irrigation::drivers::memory_pins::MemoryPinDriver;
use irrigation::health;
use irrigation::pins::SIM_PIN_COUNT;
use irrigation::sync::cancel::CancellationToken;

fn load_config() -> Result<IrrigationConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            let config = IrrigationConfig::from_json(&text)
                .with_context(|| format!("loading config {path}"))?;
            info!("Config loaded from {}", path);
            Ok(config)
        }
        None => {
            info!("No config path given, using defaults");
            Ok(IrrigationConfig::default())
        }
    }
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    console_log::init().map_err(|e| anyhow!(e))?;
    info!("Irrigation sequencer v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config + hardware ─────────────────────────────────
    let config = load_config()?;
    let driver = Arc::new(MemoryPinDriver::new(SIM_PIN_COUNT));
    let mut system = IrrigationSystem::new(config, driver)?;

    // ── 3. Start the processor ───────────────────────────────
    let lifecycle = CancellationToken::new();
    system.start(&lifecycle)?;
    let jobs = system.jobs();

    // ── 4. Operator console ──────────────────────────────────
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let command = match console::parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match command {
            Command::Run(job) => {
                if let Err(e) = jobs.enqueue(job) {
                    warn!("Job rejected: {}", e);
                }
            }
            Command::TestValve(valve) => {
                if let Err(e) = jobs.test_valve(system.config(), valve) {
                    warn!("Valve test rejected: {}", e);
                }
            }
            Command::Stop => system.request_stop(),
            Command::Status => info!(
                "Processor running: {}, {} jobs queued",
                system.status().is_running(),
                jobs.pending()
            ),
            Command::Health => {
                let reports = system.health();
                for report in &reports {
                    info!("{}: {:?} ({})", report.name, report.status, report.description);
                }
                info!("Overall: {:?}", health::overall(&reports));
            }
            Command::ShowConfig => match system.config().to_json() {
                Ok(json) => info!("Active config:\n{}", json),
                Err(e) => warn!("Config read-back failed: {}", e),
            },
            Command::Quit => break,
        }
    }

    // ── 5. Drain and release ─────────────────────────────────
    info!("Input closed, waiting for queued jobs");
    let summary = system.finish()?;
    info!(
        "Done: {} batches, {} jobs run, {} skipped, {} discarded, {} failed batches",
        summary.batches,
        summary.executed,
        summary.skipped,
        summary.discarded,
        summary.failed_batches
    );
    Ok(())
}
