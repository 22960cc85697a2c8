//! Relative-time service.
//!
//! # Data Flow
//! ```text
//! start():   wall now - 2s → start_reference, current = 2
//! ticker:    every 1s → tick() → current = wall now - start_reference
//! readers:   current() / to_expiry_relative(exptime)
//! stop():    cancel ticker → wait for in-flight tick
//! ```
//!
//! # Design Decisions
//! - Expiration math never depends on wall-clock adjustments after start
//! - Wall time is injected so tests drive the clock by hand

pub mod service;
pub mod wall;

pub use service::{ClockError, ClockService, HORIZON_SECS, START_BACKDATE_SECS, TICK_INTERVAL};
pub use wall::{ManualClock, SystemClock, WallClock};
