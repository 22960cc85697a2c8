//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Load (startup.rs):
//!     Build services → Assemble sequence → Open control channel → Register handler
//!
//! Start (activator.rs):
//!     Start delivered → Spawn worker → Run bring-up → Report outcome
//!
//! Unload (shutdown.rs):
//!     Read status → Full teardown or unregister → Release control channel
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger unload
//! ```
//!
//! # Design Decisions
//! - Ordered startup, exact reverse shutdown
//! - The delivery context only spawns; blocking work stays on the worker
//! - Control channel is the first thing opened and the last released

pub mod activator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use activator::{Activator, ThreadSpawner, WorkerSpawner};
pub use shutdown::{ShutdownOrchestrator, ShutdownPath};
pub use startup::{CacheCore, CacheCoreBuilder, StartupError};
