//! Fuzz target: `IrrigationConfig::from_json`
//!
//! Any document the loader accepts must be buildable: its pins fit a
//! relay board without duplicates, and every configured valve resolves.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use std::sync::Arc;

use irrigation::config::IrrigationConfig;
use irrigation::drivers::memory_pins::MemoryPinDriver;
use irrigation::drivers::relay::RelayBoard;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = IrrigationConfig::from_json(text) else {
        return;
    };

    let driver = Arc::new(MemoryPinDriver::new(u8::MAX));
    let board = RelayBoard::create(config.relay_wiring, driver, config.board_pins());
    if let Ok(board) = board {
        assert_eq!(board.len(), config.valves.len() + 1);
    }
    for valve in &config.valves {
        assert_eq!(config.pin_for_valve(valve.valve_number), Ok(valve.pin));
    }
});
