//! Module status shared between bring-up and shutdown.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::observability::metrics;

/// Outcome of the last bring-up attempt.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Unknown = 0,
    Succeeded = 1,
    Failed = 2,
}

impl From<u8> for ModuleStatus {
    fn from(val: u8) -> Self {
        match val {
            1 => ModuleStatus::Succeeded,
            2 => ModuleStatus::Failed,
            _ => ModuleStatus::Unknown,
        }
    }
}

/// Single-writer, multi-reader cell holding the [`ModuleStatus`].
///
/// Only the bring-up driver publishes; the activator resets it to `Unknown`
/// when a new attempt begins.
#[derive(Debug, Default)]
pub struct StatusCell {
    value: AtomicU8,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ModuleStatus {
        ModuleStatus::from(self.value.load(Ordering::Acquire))
    }

    /// Record the terminal outcome of an attempt.
    pub fn publish(&self, status: ModuleStatus) {
        self.value.store(status as u8, Ordering::Release);
        metrics::record_module_status(status as u8);
    }

    /// Mark the start of a new attempt.
    pub fn begin_attempt(&self) {
        self.publish(ModuleStatus::Unknown);
    }
}
