//! Signalling primitives shared by the request layer and the processor.
//!
//! ```text
//!  ┌──────────────┐  IrrigationJob  ┌───────────────────────┐
//!  │ Request layer│────────────────▶│                       │
//!  │ (producers)  │   JobSender     │  IrrigationProcessor  │
//!  │              │────────────────▶│  (single consumer)    │
//!  └──────────────┘ IrrigationStopper└───────────────────────┘
//!                                       ▲
//!           lifecycle CancellationToken ──┘
//! ```

pub mod cancel;
pub mod queue;
pub mod stopper;
