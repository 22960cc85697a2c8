//! Load orchestration.
//!
//! # Responsibilities
//! - Build the shared services (clock, pools, status)
//! - Assemble the bring-up sequence
//! - Open the control transport and register the start handler
//!
//! # Design Decisions
//! - Loading does no subsystem work; bring-up waits for a Start
//! - If handler registration fails the transport is released again

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;

use crate::bringup::{
    standard_sequence, BringupSequence, Collaborators, CoreServices, ModuleStatus, SettingsStep,
    StatusCell,
};
use crate::clock::{ClockService, SystemClock, WallClock, TICK_INTERVAL};
use crate::config::CoreConfig;
use crate::control::{ControlChannel, ControlError, ControlPeer};
use crate::lifecycle::activator::{Activator, ThreadSpawner, WorkerSpawner};
use crate::lifecycle::shutdown::{ShutdownOrchestrator, ShutdownPath};
use crate::pools::{standard_descriptors, HeapPoolFactory, ObjectPoolRegistry, PoolFactory};

/// Errors raised while loading the cache core.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no tokio runtime available")]
    NoRuntime,

    #[error("failed to register start handler: {0}")]
    Register(#[source] ControlError),
}

/// Configures how the cache core is assembled.
pub struct CacheCoreBuilder {
    config: CoreConfig,
    collaborators: Option<Collaborators>,
    wall: Arc<dyn WallClock>,
    tick_interval: Duration,
    pool_factory: Arc<dyn PoolFactory>,
    spawner: Arc<dyn WorkerSpawner>,
    total_memory: Option<u64>,
}

impl CacheCoreBuilder {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            collaborators: None,
            wall: Arc::new(SystemClock),
            tick_interval: TICK_INTERVAL,
            pool_factory: Arc::new(HeapPoolFactory),
            spawner: Arc::new(ThreadSpawner),
            total_memory: None,
        }
    }

    /// External collaborators; unlinked stand-ins are used when unset.
    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    pub fn wall_clock(mut self, wall: Arc<dyn WallClock>) -> Self {
        self.wall = wall;
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn pool_factory(mut self, factory: Arc<dyn PoolFactory>) -> Self {
        self.pool_factory = factory;
        self
    }

    pub fn spawner(mut self, spawner: Arc<dyn WorkerSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Fix the host memory size instead of probing it.
    pub fn total_memory(mut self, bytes: u64) -> Self {
        self.total_memory = Some(bytes);
        self
    }

    /// Open the control plane and register the start handler.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load(self) -> Result<(CacheCore, ControlPeer), StartupError> {
        let runtime = Handle::try_current().map_err(|_| StartupError::NoRuntime)?;

        let services = CoreServices {
            clock: Arc::new(
                ClockService::new(self.wall, runtime).with_interval(self.tick_interval),
            ),
            pools: Arc::new(ObjectPoolRegistry::with_factory(
                standard_descriptors(),
                self.pool_factory,
            )),
            status: Arc::new(StatusCell::new()),
            config: Arc::new(self.config),
        };

        let settings = Arc::new(match self.total_memory {
            Some(bytes) => SettingsStep::with_total_memory(bytes),
            None => SettingsStep::new(),
        });
        let collaborators = self.collaborators.unwrap_or_else(Collaborators::unlinked);
        let sequence = Arc::new(standard_sequence(&services, settings, collaborators));

        let timeout = Duration::from_secs(services.config.control.timeout_secs);
        let (channel, peer) = ControlChannel::open(timeout);

        let activator = Arc::new(Activator::new(
            sequence.clone(),
            services.clone(),
            channel.clone(),
            self.spawner,
        ));
        if let Err(e) = channel.register(activator.handler()) {
            tracing::error!(error = %e, "Failed to register start handler");
            channel.release();
            return Err(StartupError::Register(e));
        }

        let orchestrator =
            ShutdownOrchestrator::new(sequence.clone(), services.status.clone(), channel.clone());

        tracing::info!(steps = sequence.len(), "Cache core loaded, waiting for start");
        Ok((
            CacheCore {
                services,
                sequence,
                channel,
                activator,
                orchestrator,
            },
            peer,
        ))
    }
}

/// A loaded cache core.
pub struct CacheCore {
    services: CoreServices,
    sequence: Arc<BringupSequence>,
    channel: Arc<ControlChannel>,
    activator: Arc<Activator>,
    orchestrator: ShutdownOrchestrator,
}

impl CacheCore {
    pub fn builder(config: CoreConfig) -> CacheCoreBuilder {
        CacheCoreBuilder::new(config)
    }

    /// Load with default wiring and the given collaborators.
    pub fn load(
        config: CoreConfig,
        collaborators: Collaborators,
    ) -> Result<(Self, ControlPeer), StartupError> {
        Self::builder(config).collaborators(collaborators).load()
    }

    pub fn status(&self) -> ModuleStatus {
        self.services.status.get()
    }

    pub fn services(&self) -> &CoreServices {
        &self.services
    }

    pub fn clock(&self) -> &Arc<ClockService> {
        &self.services.clock
    }

    pub fn pools(&self) -> &Arc<ObjectPoolRegistry> {
        &self.services.pools
    }

    pub fn sequence(&self) -> &BringupSequence {
        &self.sequence
    }

    pub fn channel(&self) -> &Arc<ControlChannel> {
        &self.channel
    }

    pub fn activator(&self) -> &Arc<Activator> {
        &self.activator
    }

    /// Tear the core down according to its status. Blocking.
    pub fn unload(self) -> ShutdownPath {
        self.orchestrator.unload()
    }
}
