//! Fixed-size object pool.
//!
//! # Responsibilities
//! - Hand out objects of one fixed, cache-line-rounded size
//! - Run the constructor hook on freshly allocated objects
//! - Recycle returned objects
//! - Track outstanding objects

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::observability::metrics;

/// Object sizes are rounded up to a multiple of this.
pub const CACHE_LINE: usize = 64;

/// Largest object a pool may serve.
pub const MAX_OBJECT_SIZE: usize = 1 << 20;

/// Hook run once on every freshly allocated object.
pub type Constructor = fn(&mut [u8]);

/// Errors raised while creating pools.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool '{name}': object size must be non-zero")]
    ZeroSize { name: &'static str },

    #[error("pool '{name}': object size {size} exceeds {limit} bytes")]
    TooLarge {
        name: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("pool '{name}' could not be created: {reason}")]
    Create { name: &'static str, reason: String },

    #[error("pools are already created")]
    AlreadyCreated,
}

/// Static description of a pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolDescriptor {
    pub name: &'static str,
    pub object_size: usize,
    pub ctor: Option<Constructor>,
}

impl PoolDescriptor {
    pub const fn new(name: &'static str, object_size: usize) -> Self {
        Self {
            name,
            object_size,
            ctor: None,
        }
    }

    pub const fn with_ctor(mut self, ctor: Constructor) -> Self {
        self.ctor = Some(ctor);
        self
    }
}

/// A pool of same-sized objects.
#[derive(Debug)]
pub struct ObjectPool {
    name: &'static str,
    object_size: usize,
    ctor: Option<Constructor>,
    free: Mutex<Vec<Box<[u8]>>>,
    outstanding: AtomicUsize,
}

impl ObjectPool {
    /// Create a pool from its descriptor.
    pub fn new(desc: &PoolDescriptor) -> Result<Self, PoolError> {
        if desc.object_size == 0 {
            return Err(PoolError::ZeroSize { name: desc.name });
        }
        if desc.object_size > MAX_OBJECT_SIZE {
            return Err(PoolError::TooLarge {
                name: desc.name,
                size: desc.object_size,
                limit: MAX_OBJECT_SIZE,
            });
        }

        Ok(Self {
            name: desc.name,
            object_size: desc.object_size.next_multiple_of(CACHE_LINE),
            ctor: desc.ctor,
            free: Mutex::new(Vec::new()),
            outstanding: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Size of every object, after rounding.
    pub fn object_size(&self) -> usize {
        self.object_size
    }

    /// Objects currently checked out.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }

    /// Objects waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Check out an object. It returns to the pool when dropped.
    pub fn alloc(self: &Arc<Self>) -> PooledObject {
        let recycled = self.free.lock().pop();
        let buf = recycled.unwrap_or_else(|| {
            let mut fresh = vec![0u8; self.object_size].into_boxed_slice();
            if let Some(ctor) = self.ctor {
                ctor(&mut fresh);
            }
            fresh
        });

        let outstanding = self.outstanding.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::record_pool_outstanding(self.name, outstanding);

        PooledObject {
            pool: self.clone(),
            buf: Some(buf),
        }
    }

    fn recycle(&self, buf: Box<[u8]>) {
        self.free.lock().push(buf);
        let outstanding = self.outstanding.fetch_sub(1, Ordering::Relaxed) - 1;
        metrics::record_pool_outstanding(self.name, outstanding);
    }
}

/// A RAII guard over an object checked out of a pool.
///
/// Holds its pool alive, so an object can never outlive the pool it came from.
#[derive(Debug)]
pub struct PooledObject {
    pool: Arc<ObjectPool>,
    buf: Option<Box<[u8]>>,
}

impl PooledObject {
    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }
}

impl Deref for PooledObject {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledObject {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledObject {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.recycle(buf);
        }
    }
}
