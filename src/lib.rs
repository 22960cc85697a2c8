//! In-memory cache server core: bring-up, tear-down and relative time.

pub mod bringup;
pub mod clock;
pub mod config;
pub mod control;
pub mod lifecycle;
pub mod observability;
pub mod pools;

pub use bringup::{Collaborators, ModuleStatus, Subsystem, SubsystemError};
pub use clock::ClockService;
pub use config::CoreConfig;
pub use control::{ControlChannel, ControlPeer};
pub use lifecycle::{CacheCore, ShutdownPath};
pub use pools::ObjectPoolRegistry;
