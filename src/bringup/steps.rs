//! The standard bring-up order and the steps the core owns itself.
//!
//! Order, with the dependency that fixes it:
//! ```text
//!  0 settings         produces memory budget, growth factor, hashpower
//!  1 object_pools     fixed-size pools used by every later subsystem
//!  2 statistics
//!  3 allocator        reads max_bytes and growth factor
//!  4 hash_table       reads hashpower_init
//!  5 workers
//!  6 slab_maintainer  background task over the allocator
//!  7 hash_maintainer  background task over the hash table
//!  8 clock            relative time for expiration
//!  9 dispatcher       starts accepting requests
//! 10 oom_handler
//! ```

use std::sync::Arc;

use crate::bringup::machine::BringupSequence;
use crate::bringup::settings::SettingsStep;
use crate::bringup::subsystem::{BringupContext, CoreServices, Subsystem, SubsystemError};
use crate::clock::ClockService;
use crate::pools::ObjectPoolRegistry;

pub const STATISTICS: &str = "statistics";
pub const ALLOCATOR: &str = "allocator";
pub const HASH_TABLE: &str = "hash_table";
pub const WORKERS: &str = "workers";
pub const SLAB_MAINTAINER: &str = "slab_maintainer";
pub const HASH_MAINTAINER: &str = "hash_maintainer";
pub const DISPATCHER: &str = "dispatcher";
pub const OOM_HANDLER: &str = "oom_handler";

/// Creates the object pools; destroys them on exit.
pub struct PoolsStep {
    pools: Arc<ObjectPoolRegistry>,
}

impl PoolsStep {
    pub fn new(pools: Arc<ObjectPoolRegistry>) -> Self {
        Self { pools }
    }
}

impl Subsystem for PoolsStep {
    fn name(&self) -> &'static str {
        "object_pools"
    }

    fn init(&self, _ctx: &mut BringupContext) -> Result<(), SubsystemError> {
        self.pools.create_all()?;
        Ok(())
    }

    fn exit(&self) {
        self.pools.destroy_all();
    }
}

/// Starts the relative clock; stops it on exit.
pub struct ClockStep {
    clock: Arc<ClockService>,
}

impl ClockStep {
    pub fn new(clock: Arc<ClockService>) -> Self {
        Self { clock }
    }
}

impl Subsystem for ClockStep {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn init(&self, _ctx: &mut BringupContext) -> Result<(), SubsystemError> {
        self.clock.start()?;
        Ok(())
    }

    fn exit(&self) {
        self.clock.stop();
    }
}

/// Stand-in for a collaborator that is not linked into this build.
///
/// Always initializes; both calls are logged so the bring-up order stays
/// visible in the logs.
pub struct Unlinked {
    name: &'static str,
}

impl Unlinked {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Subsystem for Unlinked {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&self, ctx: &mut BringupContext) -> Result<(), SubsystemError> {
        tracing::debug!(step = self.name, attempt = %ctx.attempt, "Collaborator not linked, skipping init");
        Ok(())
    }

    fn exit(&self) {
        tracing::debug!(step = self.name, "Collaborator not linked, skipping exit");
    }
}

/// External collaborators of the cache core, in no particular order.
pub struct Collaborators {
    pub statistics: Arc<dyn Subsystem>,
    pub allocator: Arc<dyn Subsystem>,
    pub hash_table: Arc<dyn Subsystem>,
    pub workers: Arc<dyn Subsystem>,
    pub slab_maintainer: Arc<dyn Subsystem>,
    pub hash_maintainer: Arc<dyn Subsystem>,
    pub dispatcher: Arc<dyn Subsystem>,
    pub oom_handler: Arc<dyn Subsystem>,
}

impl Collaborators {
    /// Every collaborator replaced by [`Unlinked`].
    pub fn unlinked() -> Self {
        Self {
            statistics: Arc::new(Unlinked::new(STATISTICS)),
            allocator: Arc::new(Unlinked::new(ALLOCATOR)),
            hash_table: Arc::new(Unlinked::new(HASH_TABLE)),
            workers: Arc::new(Unlinked::new(WORKERS)),
            slab_maintainer: Arc::new(Unlinked::new(SLAB_MAINTAINER)),
            hash_maintainer: Arc::new(Unlinked::new(HASH_MAINTAINER)),
            dispatcher: Arc::new(Unlinked::new(DISPATCHER)),
            oom_handler: Arc::new(Unlinked::new(OOM_HANDLER)),
        }
    }
}

/// Assemble the standard eleven-step sequence.
pub fn standard_sequence(
    services: &CoreServices,
    settings: Arc<SettingsStep>,
    collaborators: Collaborators,
) -> BringupSequence {
    let steps: Vec<Arc<dyn Subsystem>> = vec![
        settings as Arc<dyn Subsystem>,
        Arc::new(PoolsStep::new(services.pools.clone())),
        collaborators.statistics,
        collaborators.allocator,
        collaborators.hash_table,
        collaborators.workers,
        collaborators.slab_maintainer,
        collaborators.hash_maintainer,
        Arc::new(ClockStep::new(services.clock.clone())),
        collaborators.dispatcher,
        collaborators.oom_handler,
    ];
    BringupSequence::new(steps)
}
