//! Runtime settings derived at bring-up.
//!
//! The settings step turns the static configuration and the host's memory
//! size into the values later steps consume (memory budget, growth factor,
//! initial hash table size).

use parking_lot::Mutex;
use sysinfo::System;

use crate::bringup::subsystem::{BringupContext, Subsystem, SubsystemError};
use crate::config::CoreConfig;

/// Values produced by the settings step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Memory budget of the slab allocator in bytes.
    pub max_bytes: u64,
    pub factor_numerator: u32,
    pub factor_denominator: u32,
    pub hashpower_init: u32,
    pub preallocate: bool,
}

impl Settings {
    pub fn derive(config: &CoreConfig, total_memory: u64) -> Self {
        let budget = u128::from(total_memory) * u128::from(config.memory.slab_percent) / 100;
        Self {
            max_bytes: u64::try_from(budget).unwrap_or(u64::MAX),
            factor_numerator: config.cache.factor_numerator,
            factor_denominator: config.cache.factor_denominator,
            hashpower_init: config.cache.hashpower_init,
            preallocate: config.cache.preallocate,
        }
    }
}

/// Total physical memory of the host in bytes.
pub fn total_system_memory() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.total_memory()
}

/// First bring-up step: publishes [`Settings`] into the context.
#[derive(Debug, Default)]
pub struct SettingsStep {
    total_memory: Option<u64>,
    current: Mutex<Option<Settings>>,
}

impl SettingsStep {
    /// Probe host memory at init time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed memory size instead of probing the host.
    pub fn with_total_memory(total_memory: u64) -> Self {
        Self {
            total_memory: Some(total_memory),
            current: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Option<Settings> {
        self.current.lock().clone()
    }
}

impl Subsystem for SettingsStep {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn init(&self, ctx: &mut BringupContext) -> Result<(), SubsystemError> {
        let total = self.total_memory.unwrap_or_else(total_system_memory);
        if total == 0 {
            return Err(SubsystemError::MemoryUnavailable);
        }

        let settings = Settings::derive(&ctx.config, total);
        tracing::info!(
            total_memory = total,
            max_bytes = settings.max_bytes,
            factor = %format_args!("{}/{}", settings.factor_numerator, settings.factor_denominator),
            hashpower_init = settings.hashpower_init,
            preallocate = settings.preallocate,
            "Settings derived"
        );

        *self.current.lock() = Some(settings.clone());
        ctx.set_settings(settings);
        Ok(())
    }

    fn exit(&self) {
        self.current.lock().take();
    }
}
