//! # domain-recon
//!
//! Concurrent reconciliation of denormalized organization email domains
//! against their source-of-truth tables.
//!
//! The target store holds one row per organization with a comma-joined
//! list of email domains; the source store holds the contacts those
//! domains are derived from. A run partitions the target's row space
//! into balanced ranges, dispatches one worker per range, and writes
//! every expected-but-missing domain to a per-range CSV report:
//!
//! - **Balanced partitioning** of the 1-based row-number space
//! - **Parallel workers**, each with dedicated store connections
//! - **Completion barrier** joining all workers before the run ends
//! - **Whole-token comparison** of expected domains against the
//!   materialized list (substring matches never count)
//!
//! ## Example
//!
//! ```rust,no_run
//! use domain_recon::{Config, Coordinator, PgStores};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> domain_recon::Result<()> {
//!     let config = Config::load("config.yaml")?.with_auto_tuning();
//!     let stores = Arc::new(PgStores::connect(&config).await?);
//!     let summary = Coordinator::new(config, stores)
//!         .run(CancellationToken::new())
//!         .await?;
//!     println!("{} discrepancies found", summary.discrepancies);
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod partition;
pub mod report;
pub mod store;
pub mod worker;

// Re-exports for convenient access
pub use config::{Config, ReconConfig, StoreConfig};
pub use coordinator::{Coordinator, RunStatus, RunSummary, WaitGroup};
pub use error::{ReconError, Result};
pub use partition::{partition, RowRange};
pub use report::{CsvSink, ResultSink};
pub use store::{PgStores, SourceReader, StoreConnector, TargetReader, TargetRecord};
pub use worker::{ReconWorker, WorkerStats};
