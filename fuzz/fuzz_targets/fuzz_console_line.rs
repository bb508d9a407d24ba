//! Fuzz target: `console::parse_line`
//!
//! Feeds arbitrary UTF-8 lines to the operator console parser.
//!
//! Invariants checked:
//! - No panics under any input
//! - A parsed `Run` command round-trips through its JSON job form
//!
//! cargo fuzz run fuzz_console_line

#![no_main]

use irrigation::adapters::console::parse_line;
use irrigation::app::commands::Command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(Some(Command::Run(job))) = parse_line(line) {
        let json = serde_json::to_string(&job).unwrap();
        assert_eq!(parse_line(&json), Ok(Some(Command::Run(job))));
    }
});
