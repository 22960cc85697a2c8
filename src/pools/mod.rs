//! Object pool subsystem.
//!
//! # Data Flow
//! ```text
//! bring-up step "object pools":
//!     registry.rs create_all()
//!     → pool.rs ObjectPool per descriptor (in order)
//!     → first failure destroys the pools created so far
//!
//! collaborators:
//!     registry.get(name) → pool.alloc() → PooledObject (returns on drop)
//!
//! teardown / rollback:
//!     registry.destroy_all()
//! ```

pub mod pool;
pub mod registry;

pub use pool::{Constructor, ObjectPool, PoolDescriptor, PoolError, PooledObject};
pub use registry::{standard_descriptors, HeapPoolFactory, ObjectPoolRegistry, PoolFactory};
