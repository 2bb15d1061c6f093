//! Configuration type definitions with auto-tuning based on system resources.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use sysinfo::System;
use tracing::info;

/// System resource information for auto-tuning.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total RAM in bytes.
    pub total_memory_bytes: u64,
    /// Total RAM in GB.
    pub total_memory_gb: f64,
    /// Number of CPU cores.
    pub cpu_cores: usize,
}

impl SystemResources {
    /// Detect system resources.
    pub fn detect() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        let total_memory_bytes = sys.total_memory();
        let total_memory_gb = total_memory_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
        let cpu_cores = sys.cpus().len();

        Self {
            total_memory_bytes,
            total_memory_gb,
            cpu_cores,
        }
    }

    /// Log detected system resources.
    pub fn log(&self) {
        info!(
            "System resources: {:.1} GB RAM, {} CPU cores",
            self.total_memory_gb, self.cpu_cores
        );
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (expected values).
    pub source: StoreConfig,

    /// Target database configuration (materialized values under test).
    pub target: StoreConfig,

    /// Reconciliation behavior configuration.
    #[serde(default)]
    pub recon: ReconConfig,
}

impl Config {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that weren't explicitly set in the config file.
    pub fn with_auto_tuning(mut self) -> Self {
        let resources = SystemResources::detect();
        resources.log();
        self.recon = self.recon.with_auto_tuning(&resources);
        self
    }
}

/// Connection settings for one PostgreSQL store.
///
/// Source and target may point at the same server; they address
/// different tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Schema holding the tables (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,
}

/// Reconciliation behavior configuration.
/// All performance-related fields use Option<T> to distinguish between
/// "not set" (use auto-tuned default) and "explicitly set" (use provided value).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconConfig {
    /// Number of parallel workers. Auto-tuned to the CPU core count if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Target rows fetched per page. Auto-tuned based on RAM if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,

    /// Maximum connections per store pool. Auto-tuned from workers if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<usize>,

    /// Directory result files are written to (default: current directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl ReconConfig {
    /// Apply auto-tuned defaults based on system resources.
    /// Only fills in values that are None (not explicitly set).
    pub fn with_auto_tuning(mut self, resources: &SystemResources) -> Self {
        let ram_gb = resources.total_memory_gb;
        let cores = resources.cpu_cores;

        // Workers: one per core, capped to keep pool sizes sane.
        if self.workers.is_none() {
            let workers = cores.max(1).min(32);
            self.workers = Some(workers);
        }
        let workers = self.workers.unwrap();

        // Page size: scale with RAM. Base 500 rows, +500 per 4GB, cap at 5000.
        if self.page_size.is_none() {
            let page = 500 + ((ram_gb / 4.0) as usize * 500);
            self.page_size = Some(page.max(500).min(5_000));
        }

        // Every worker holds one connection per store for its lifetime,
        // plus one for the coordinator's count query.
        if self.max_connections.is_none() {
            self.max_connections = Some((workers + 1).min(64));
        }

        info!(
            "Auto-tuned config: workers={}, page_size={}, max_connections={}",
            self.workers.unwrap(),
            self.page_size.unwrap(),
            self.max_connections.unwrap(),
        );

        self
    }

    // Accessor methods that return the effective value (with fallback defaults)
    // These are used when the config hasn't been auto-tuned yet

    pub fn get_workers(&self) -> usize {
        self.workers.unwrap_or(4)
    }

    pub fn get_page_size(&self) -> usize {
        self.page_size.unwrap_or(1_000)
    }

    pub fn get_max_connections(&self) -> usize {
        self.max_connections.unwrap_or(8)
    }

    pub fn get_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}
