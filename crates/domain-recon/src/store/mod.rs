//! Store access traits for the source and target databases.
//!
//! The reconciliation engine only sees these traits; the PostgreSQL
//! implementation lives in [`postgres`]. Each worker acquires its own
//! readers so no two workers ever share a store connection.

mod postgres;

pub use postgres::PgStores;

use crate::error::Result;
use crate::partition::RowRange;
use async_trait::async_trait;

/// One row fetched from the target's materialized table.
///
/// `actual_value` is a comma-joined list of domains, not a scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    /// Organization key.
    pub key: String,

    /// Comma-joined domain list materialized for the key.
    pub actual_value: String,
}

/// Factory for per-worker store access.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Probe both stores. Run once at startup; failure aborts the whole
    /// run before any work is dispatched.
    async fn health_check(&self) -> Result<()>;

    /// Total number of rows in the target's materialized table.
    async fn count_target_rows(&self) -> Result<u64>;

    /// Acquire a dedicated target-store reader for one worker.
    async fn target_reader(&self) -> Result<Box<dyn TargetReader>>;

    /// Acquire a dedicated source-store reader for one worker.
    async fn source_reader(&self) -> Result<Box<dyn SourceReader>>;
}

/// Pages rows out of the target's materialized table.
#[async_trait]
pub trait TargetReader: Send {
    /// Fetch the records whose row number (ordered by key) falls within
    /// `range`, inclusive on both ends, in key order.
    async fn fetch_rows(&self, range: RowRange) -> Result<Vec<TargetRecord>>;
}

/// Looks up the expected domain set per organization key.
#[async_trait]
pub trait SourceReader: Send {
    /// Distinct domains the source declares for `key`, in store order.
    async fn expected_domains(&self, key: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store doubles shared by worker and coordinator tests.

    use super::*;
    use crate::error::ReconError;
    use std::collections::HashMap;

    /// In-memory source/target pair backed by plain collections.
    #[derive(Default)]
    pub struct MemoryStores {
        /// Target rows in key order; position + 1 is the logical row number.
        pub target_rows: Vec<TargetRecord>,

        /// Expected domain sets by organization key.
        pub expected: HashMap<String, Vec<String>>,

        /// Force `count_target_rows` to fail.
        pub fail_count: bool,

        /// Force `source_reader` acquisition to fail.
        pub fail_source_connect: bool,

        /// Force every expected-domain lookup to fail.
        pub fail_expected_query: bool,

        /// Delay applied to every expected-domain lookup, for tests
        /// that need workers still in flight.
        pub source_delay: Option<std::time::Duration>,
    }

    impl MemoryStores {
        pub fn new(target: &[(&str, &str)], expected: &[(&str, &[&str])]) -> Self {
            let mut target_rows: Vec<TargetRecord> = target
                .iter()
                .map(|(k, v)| TargetRecord {
                    key: k.to_string(),
                    actual_value: v.to_string(),
                })
                .collect();
            target_rows.sort_by(|a, b| a.key.cmp(&b.key));

            let expected = expected
                .iter()
                .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
                .collect();

            Self {
                target_rows,
                expected,
                ..Default::default()
            }
        }
    }

    struct MemoryTargetReader {
        rows: Vec<TargetRecord>,
    }

    #[async_trait]
    impl TargetReader for MemoryTargetReader {
        async fn fetch_rows(&self, range: RowRange) -> Result<Vec<TargetRecord>> {
            let start = (range.start - 1) as usize;
            let end = (range.end as usize).min(self.rows.len());
            if start >= self.rows.len() {
                return Ok(Vec::new());
            }
            Ok(self.rows[start..end].to_vec())
        }
    }

    struct MemorySourceReader {
        expected: HashMap<String, Vec<String>>,
        fail_query: bool,
        delay: Option<std::time::Duration>,
    }

    #[async_trait]
    impl SourceReader for MemorySourceReader {
        async fn expected_domains(&self, key: &str) -> Result<Vec<String>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_query {
                return Err(ReconError::query("SELECT expected", "simulated failure"));
            }
            Ok(self.expected.get(key).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl StoreConnector for MemoryStores {
        async fn health_check(&self) -> Result<()> {
            Ok(())
        }

        async fn count_target_rows(&self) -> Result<u64> {
            if self.fail_count {
                return Err(ReconError::query("SELECT COUNT(*)", "simulated failure"));
            }
            Ok(self.target_rows.len() as u64)
        }

        async fn target_reader(&self) -> Result<Box<dyn TargetReader>> {
            Ok(Box::new(MemoryTargetReader {
                rows: self.target_rows.clone(),
            }))
        }

        async fn source_reader(&self) -> Result<Box<dyn SourceReader>> {
            if self.fail_source_connect {
                return Err(ReconError::connection("source", "simulated failure"));
            }
            Ok(Box::new(MemorySourceReader {
                expected: self.expected.clone(),
                fail_query: self.fail_expected_query,
                delay: self.source_delay,
            }))
        }
    }
}
