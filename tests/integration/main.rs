//! Integration test driver for `tests/integration/`.
//!
//! Each `mod` below exercises one layer against the in-memory pin
//! driver.  All tests run on the host with no real hardware required.

mod harness;
mod processor_tests;
mod service_tests;
