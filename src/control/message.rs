//! Control-plane messages.

/// Inbound command. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    Start,
}

/// Outbound bring-up outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlReport {
    pub succeeded: bool,
    /// Starts the core had accepted when the outcome was produced.
    ///
    /// A report answers every Start up to and including this count.
    pub starts_seen: u64,
}
