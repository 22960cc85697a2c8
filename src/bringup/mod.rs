//! Bring-up subsystem.
//!
//! # Data Flow
//! ```text
//! Activator worker:
//!     BringupContext::new(services)
//!     → machine.rs BringupSequence::run
//!         → settings.rs (settings into context)
//!         → steps.rs owned steps (pools, clock) + external collaborators
//!         → first failure: exit() every earlier step in reverse
//!     → status.rs ModuleStatus published (Succeeded | Failed)
//!
//! Shutdown (status == Succeeded):
//!     BringupSequence::teardown → exit() every step in reverse
//! ```
//!
//! # Design Decisions
//! - All-or-nothing: the core never runs partially bootstrapped
//! - Steps run strictly sequentially on the worker thread
//! - The step order is the dependency graph

pub mod machine;
pub mod settings;
pub mod status;
pub mod steps;
pub mod subsystem;

pub use machine::{BringupError, BringupMachine, BringupSequence, BringupState};
pub use settings::{Settings, SettingsStep};
pub use status::{ModuleStatus, StatusCell};
pub use steps::{standard_sequence, Collaborators, Unlinked};
pub use subsystem::{BringupContext, CoreServices, Subsystem, SubsystemError};
