//! Control plane.
//!
//! # Data Flow
//! ```text
//! peer.rs send_start()
//!     → delivery task (channel.rs)
//!     → registered StartHandler (activator: spawn worker, return)
//!
//! worker finishes bring-up
//!     → channel.report(ok, starts_seen)
//!     → peer.rs wait_report() (bounded by control.timeout_secs,
//!       skips reports produced before its latest Start arrived)
//! ```
//!
//! # Design Decisions
//! - One opaque Start command, one boolean reply
//! - The delivery context never performs subsystem work

pub mod channel;
pub mod message;
pub mod peer;

pub use channel::{ControlChannel, ControlError, StartHandler};
pub use message::{ControlMessage, ControlReport};
pub use peer::ControlPeer;
