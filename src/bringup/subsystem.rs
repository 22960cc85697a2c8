//! Subsystem contract and the per-attempt context handed to it.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::bringup::settings::Settings;
use crate::bringup::status::StatusCell;
use crate::clock::{ClockError, ClockService};
use crate::config::CoreConfig;
use crate::pools::{ObjectPoolRegistry, PoolError};

/// Errors a subsystem reports from `init`.
#[derive(Debug, Error)]
pub enum SubsystemError {
    #[error("pool creation failed: {0}")]
    Pool(#[from] PoolError),

    #[error("clock start failed: {0}")]
    Clock(#[from] ClockError),

    #[error("settings have not been produced yet")]
    MissingSettings,

    /// Opaque error code from an external collaborator.
    #[error("init failed with code {0}")]
    Code(i32),

    #[error("total system memory unavailable")]
    MemoryUnavailable,

    /// The step panicked; carries the panic message.
    #[error("panicked: {0}")]
    Panicked(String),
}

/// One step of the bring-up sequence.
///
/// `init` must clean up any partial state it created before returning an
/// error; `exit` is only called after a successful `init`.
pub trait Subsystem: Send + Sync {
    fn name(&self) -> &'static str;

    fn init(&self, ctx: &mut BringupContext) -> Result<(), SubsystemError>;

    fn exit(&self);
}

/// Long-lived services owned by the cache core.
#[derive(Clone)]
pub struct CoreServices {
    pub config: Arc<CoreConfig>,
    pub clock: Arc<ClockService>,
    pub pools: Arc<ObjectPoolRegistry>,
    pub status: Arc<StatusCell>,
}

/// Context threaded through every `init` of one attempt.
pub struct BringupContext {
    pub attempt: Uuid,
    pub config: Arc<CoreConfig>,
    pub clock: Arc<ClockService>,
    pub pools: Arc<ObjectPoolRegistry>,
    pub status: Arc<StatusCell>,
    settings: Option<Settings>,
}

impl BringupContext {
    pub fn new(services: &CoreServices) -> Self {
        Self {
            attempt: Uuid::new_v4(),
            config: services.config.clone(),
            clock: services.clock.clone(),
            pools: services.pools.clone(),
            status: services.status.clone(),
            settings: None,
        }
    }

    /// Settings produced by the settings step.
    pub fn settings(&self) -> Result<&Settings, SubsystemError> {
        self.settings.as_ref().ok_or(SubsystemError::MissingSettings)
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = Some(settings);
    }
}
