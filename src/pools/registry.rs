//! Pool registry.
//!
//! # Responsibilities
//! - Create the fixed pool set in order, all-or-nothing
//! - Destroy every live pool (idempotent)
//! - Look pools up by name for other subsystems

use std::sync::Arc;

use parking_lot::RwLock;

use crate::pools::pool::{ObjectPool, PoolDescriptor, PoolError};

/// Creates a pool from its descriptor.
pub trait PoolFactory: Send + Sync {
    fn create(&self, desc: &PoolDescriptor) -> Result<ObjectPool, PoolError>;
}

/// Default factory backed by the global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapPoolFactory;

impl PoolFactory for HeapPoolFactory {
    fn create(&self, desc: &PoolDescriptor) -> Result<ObjectPool, PoolError> {
        ObjectPool::new(desc)
    }
}

/// Per-prefix statistics record.
pub const PREFIX_STATS_POOL: &str = "prefix_stats";
/// Key suffix buffers.
pub const KEY_SUFFIX_POOL: &str = "key_suffix";
/// Pending connection requests.
pub const CONN_REQ_POOL: &str = "conn_req";
/// Lock exchange requests between workers.
pub const LOCK_XCHG_REQ_POOL: &str = "lock_xchg_req";
/// Client connection state.
pub const CONN_POOL: &str = "conn";

/// The pool set the cache core runs with.
pub fn standard_descriptors() -> Vec<PoolDescriptor> {
    vec![
        PoolDescriptor::new(PREFIX_STATS_POOL, 96),
        PoolDescriptor::new(KEY_SUFFIX_POOL, 48),
        PoolDescriptor::new(CONN_REQ_POOL, 64),
        PoolDescriptor::new(LOCK_XCHG_REQ_POOL, 48),
        PoolDescriptor::new(CONN_POOL, 512),
    ]
}

/// Owns one handle slot per descriptor.
///
/// A slot is either empty or holds a fully created pool.
pub struct ObjectPoolRegistry {
    descriptors: Vec<PoolDescriptor>,
    factory: Arc<dyn PoolFactory>,
    handles: RwLock<Vec<Option<Arc<ObjectPool>>>>,
}

impl ObjectPoolRegistry {
    pub fn new(descriptors: Vec<PoolDescriptor>) -> Self {
        Self::with_factory(descriptors, Arc::new(HeapPoolFactory))
    }

    pub fn with_factory(descriptors: Vec<PoolDescriptor>, factory: Arc<dyn PoolFactory>) -> Self {
        let handles = vec![None; descriptors.len()];
        Self {
            descriptors,
            factory,
            handles: RwLock::new(handles),
        }
    }

    /// Registry over [`standard_descriptors`].
    pub fn standard() -> Self {
        Self::new(standard_descriptors())
    }

    /// Create every pool in order.
    ///
    /// On the first failure all pools created so far are destroyed before the
    /// error is returned.
    pub fn create_all(&self) -> Result<(), PoolError> {
        let mut handles = self.handles.write();
        if handles.iter().any(Option::is_some) {
            return Err(PoolError::AlreadyCreated);
        }

        for (slot, desc) in handles.iter_mut().zip(&self.descriptors) {
            match self.factory.create(desc) {
                Ok(pool) => {
                    tracing::debug!(pool = desc.name, object_size = pool.object_size(), "Pool created");
                    *slot = Some(Arc::new(pool));
                }
                Err(e) => {
                    tracing::error!(pool = desc.name, error = %e, "Pool creation failed");
                    Self::release(&mut handles);
                    return Err(e);
                }
            }
        }

        tracing::info!(pools = self.descriptors.len(), "Object pools created");
        Ok(())
    }

    /// Destroy every live pool. Safe to call repeatedly.
    pub fn destroy_all(&self) {
        let mut handles = self.handles.write();
        let destroyed = Self::release(&mut handles);
        if destroyed > 0 {
            tracing::info!(pools = destroyed, "Object pools destroyed");
        }
    }

    fn release(handles: &mut [Option<Arc<ObjectPool>>]) -> usize {
        let mut destroyed = 0;
        for slot in handles.iter_mut() {
            if let Some(pool) = slot.take() {
                if pool.outstanding() > 0 {
                    tracing::warn!(
                        pool = pool.name(),
                        outstanding = pool.outstanding(),
                        "Destroying pool with objects still checked out"
                    );
                }
                destroyed += 1;
            }
        }
        destroyed
    }

    /// Look up a live pool by name.
    pub fn get(&self, name: &str) -> Option<Arc<ObjectPool>> {
        self.handles
            .read()
            .iter()
            .flatten()
            .find(|pool| pool.name() == name)
            .cloned()
    }

    /// Number of live pools.
    pub fn live(&self) -> usize {
        self.handles.read().iter().flatten().count()
    }

    /// True when every described pool is live.
    pub fn is_ready(&self) -> bool {
        self.handles.read().iter().all(Option::is_some)
    }

    pub fn descriptors(&self) -> &[PoolDescriptor] {
        &self.descriptors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Fails on the named pool and records every create call.
    struct FailingFactory {
        fail_on: &'static str,
        attempts: Mutex<Vec<&'static str>>,
    }

    impl PoolFactory for FailingFactory {
        fn create(&self, desc: &PoolDescriptor) -> Result<ObjectPool, PoolError> {
            self.attempts.lock().push(desc.name);
            if desc.name == self.fail_on {
                return Err(PoolError::Create {
                    name: desc.name,
                    reason: "out of memory".into(),
                });
            }
            ObjectPool::new(desc)
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let registry = ObjectPoolRegistry::standard();
        registry.create_all().unwrap();

        assert!(registry.is_ready());
        assert_eq!(registry.live(), 5);
        let conn = registry.get(CONN_POOL).unwrap();
        assert_eq!(conn.object_size(), 512);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_failure_destroys_created_pools() {
        let factory = Arc::new(FailingFactory {
            fail_on: LOCK_XCHG_REQ_POOL,
            attempts: Mutex::new(Vec::new()),
        });
        let registry = ObjectPoolRegistry::with_factory(standard_descriptors(), factory.clone());

        let err = registry.create_all().unwrap_err();
        assert!(matches!(err, PoolError::Create { name: LOCK_XCHG_REQ_POOL, .. }));

        // Stops at the failing pool, never attempts the rest.
        assert_eq!(
            *factory.attempts.lock(),
            vec![PREFIX_STATS_POOL, KEY_SUFFIX_POOL, CONN_REQ_POOL, LOCK_XCHG_REQ_POOL]
        );
        assert_eq!(registry.live(), 0);
        assert!(registry.get(PREFIX_STATS_POOL).is_none());
        assert!(!registry.is_ready());
    }

    #[test]
    fn test_failure_on_first_pool() {
        let factory = Arc::new(FailingFactory {
            fail_on: PREFIX_STATS_POOL,
            attempts: Mutex::new(Vec::new()),
        });
        let registry = ObjectPoolRegistry::with_factory(standard_descriptors(), factory);
        assert!(registry.create_all().is_err());
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let registry = ObjectPoolRegistry::standard();
        registry.destroy_all();

        registry.create_all().unwrap();
        registry.destroy_all();
        registry.destroy_all();
        assert_eq!(registry.live(), 0);

        // Recreate after destroy.
        registry.create_all().unwrap();
        assert!(registry.is_ready());
    }

    #[test]
    fn test_double_create_rejected() {
        let registry = ObjectPoolRegistry::standard();
        registry.create_all().unwrap();
        assert!(matches!(registry.create_all(), Err(PoolError::AlreadyCreated)));
        assert!(registry.is_ready());
    }

    #[test]
    fn test_outstanding_object_survives_destroy() {
        let registry = ObjectPoolRegistry::standard();
        registry.create_all().unwrap();
        let obj = registry.get(CONN_POOL).unwrap().alloc();

        registry.destroy_all();
        assert!(registry.get(CONN_POOL).is_none());
        assert_eq!(obj.len(), 512);
    }
}
