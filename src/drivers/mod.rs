//! Pin drivers, relays and valve initialisation.

pub mod hal_pins;
pub mod memory_pins;
pub mod pin_init;
pub mod relay;
