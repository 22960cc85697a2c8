//! Unload coordination for the cache core.
//!
//! # Policy
//! ```text
//! Succeeded → teardown all steps in reverse → release transport
//! Failed    → unregister start handler      → release transport
//! Unknown   → unregister start handler      → release transport
//! ```
//!
//! A failed attempt already rolled itself back, so only the control plane is
//! touched. The transport is released last on every path.

use std::sync::Arc;

use crate::bringup::{BringupSequence, ModuleStatus, StatusCell};
use crate::control::ControlChannel;

/// Which teardown path an unload took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPath {
    /// Every subsystem was stopped.
    Full,
    /// Only the control plane was touched.
    ControlOnly,
}

pub struct ShutdownOrchestrator {
    sequence: Arc<BringupSequence>,
    status: Arc<StatusCell>,
    channel: Arc<ControlChannel>,
}

impl ShutdownOrchestrator {
    pub fn new(
        sequence: Arc<BringupSequence>,
        status: Arc<StatusCell>,
        channel: Arc<ControlChannel>,
    ) -> Self {
        Self {
            sequence,
            status,
            channel,
        }
    }

    /// Tear down according to the last recorded bring-up outcome.
    ///
    /// Blocks while subsystems exit; call from a blocking context.
    pub fn unload(&self) -> ShutdownPath {
        let status = self.status.get();
        tracing::info!(?status, "Unloading cache core");

        let path = match status {
            ModuleStatus::Succeeded => {
                self.sequence.teardown();
                tracing::info!(steps = self.sequence.len(), "Server stopped");
                ShutdownPath::Full
            }
            ModuleStatus::Failed | ModuleStatus::Unknown => {
                self.channel.unregister();
                ShutdownPath::ControlOnly
            }
        };

        self.channel.release();
        tracing::info!(?path, "Cache core unloaded");
        path
    }
}
