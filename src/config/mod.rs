//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CoreConfig (validated, immutable)
//!     → shared via Arc to the bring-up context
//! ```
//!
//! # Design Decisions
//! - Read once at process start; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::CacheConfig;
pub use schema::ControlConfig;
pub use schema::CoreConfig;
pub use schema::LogFormat;
pub use schema::MemoryConfig;
pub use schema::ObservabilityConfig;
