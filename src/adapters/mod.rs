//! Adapters: host-side plumbing around the application core.
//!
//! | Adapter       | Role                                 |
//! |---------------|--------------------------------------|
//! | `console`     | Parses operator commands from stdin  |
//! | `console_log` | stderr subscriber for `log` records  |

pub mod console;
pub mod console_log;
