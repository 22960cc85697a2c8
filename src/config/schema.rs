//! Configuration schema definitions.
//!
//! This module defines the process-start configuration of the cache core.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the cache core.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CoreConfig {
    /// Control-plane settings (response timeout).
    pub control: ControlConfig,

    /// Memory budget settings.
    pub memory: MemoryConfig,

    /// Initial cache geometry handed to the allocator and hash table.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Control-plane configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Seconds a peer waits for the bring-up report.
    pub timeout_secs: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

/// Memory budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Percent of total system memory the slab allocator may use.
    pub slab_percent: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { slab_percent: 95 }
    }
}

/// Cache geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Slab class growth factor numerator.
    pub factor_numerator: u32,

    /// Slab class growth factor denominator.
    pub factor_denominator: u32,

    /// Initial hash table size as a power of two.
    pub hashpower_init: u32,

    /// Preallocate the whole memory budget at bring-up.
    pub preallocate: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            factor_numerator: 5,
            factor_denominator: 4,
            hashpower_init: 16,
            preallocate: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "memcore=info".to_string(),
            log_format: LogFormat::Compact,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
