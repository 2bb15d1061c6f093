//! PostgreSQL store access over deadpool connection pools.

use super::{SourceReader, StoreConnector, TargetReader, TargetRecord};
use crate::config::{Config, StoreConfig};
use crate::error::{ReconError, Result};
use crate::partition::RowRange;
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::{Config as PgConfig, NoTls, Statement};
use tracing::{debug, info};

/// Connection pools for the source and target stores.
///
/// The pools exist so each worker can hold a dedicated connection per
/// store for its whole lifetime; workers never share connections.
pub struct PgStores {
    source: Pool,
    target: Pool,
    source_schema: String,
    target_schema: String,
}

impl PgStores {
    /// Build both pools and probe them with `SELECT 1`.
    ///
    /// The probe stands in for a driver-availability check: if either
    /// store cannot be reached here, the run aborts before any worker
    /// is dispatched.
    pub async fn connect(config: &Config) -> Result<Self> {
        let max_conns = config.recon.get_max_connections();
        let source = build_pool(&config.source, max_conns)?;
        let target = build_pool(&config.target, max_conns)?;

        let stores = Self {
            source,
            target,
            source_schema: config.source.schema.clone(),
            target_schema: config.target.schema.clone(),
        };
        stores.health_check().await?;

        info!(
            "Connected to source {}:{}/{} and target {}:{}/{}",
            config.source.host,
            config.source.port,
            config.source.database,
            config.target.host,
            config.target.port,
            config.target.database
        );

        Ok(stores)
    }

    fn count_query(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM \"{}\".organization_domains",
            self.target_schema
        )
    }

    /// Windowed page over the materialized table. Row numbers are
    /// 1-based and ordered by key, matching the partitioner's space.
    fn page_query(&self) -> String {
        format!(
            "SELECT org_key, domains FROM ( \
               SELECT org_key, domains, \
                      ROW_NUMBER() OVER (ORDER BY org_key) AS row_num \
               FROM \"{}\".organization_domains \
             ) q WHERE row_num BETWEEN $1 AND $2",
            self.target_schema
        )
    }

    /// Distinct email domains the source declares for one organization.
    /// Domain = everything after the '@' of each contact email address.
    fn expected_query(&self) -> String {
        format!(
            "SELECT DISTINCT substr(c.email_addr, position('@' in c.email_addr) + 1) AS domain \
             FROM \"{schema}\".contact c \
             INNER JOIN \"{schema}\".contact_organization co ON co.contact_id = c.contact_id \
             INNER JOIN \"{schema}\".organization o ON o.organization_id = co.organization_id \
             WHERE o.org_key = $1",
            schema = self.source_schema
        )
    }

    async fn get(&self, pool: &Pool, store: &'static str) -> Result<Object> {
        pool.get()
            .await
            .map_err(|e| ReconError::connection(store, e.to_string()))
    }
}

fn build_pool(config: &StoreConfig, max_conns: usize) -> Result<Pool> {
    let mut pg_config = PgConfig::new();
    pg_config.host(&config.host);
    pg_config.port(config.port);
    pg_config.dbname(&config.database);
    pg_config.user(&config.user);
    pg_config.password(&config.password);

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
    Pool::builder(mgr)
        .max_size(max_conns)
        .build()
        .map_err(|e| {
            ReconError::pool(
                format!("Failed to create pool: {}", e),
                format!("{}:{}/{}", config.host, config.port, config.database),
            )
        })
}

#[async_trait]
impl StoreConnector for PgStores {
    async fn health_check(&self) -> Result<()> {
        for (pool, store) in [(&self.source, "source"), (&self.target, "target")] {
            let client = self
                .get(pool, store)
                .await
                .map_err(|e| ReconError::StoreUnavailable(e.to_string()))?;
            client
                .simple_query("SELECT 1")
                .await
                .map_err(|e| ReconError::StoreUnavailable(format!("{}: {}", store, e)))?;
        }
        Ok(())
    }

    async fn count_target_rows(&self) -> Result<u64> {
        let query = self.count_query();
        let client = self.get(&self.target, "target").await?;
        let row = client
            .query_one(query.as_str(), &[])
            .await
            .map_err(|e| ReconError::query(&query, e.to_string()))?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| ReconError::Fetch(e.to_string()))?;
        Ok(count.max(0) as u64)
    }

    async fn target_reader(&self) -> Result<Box<dyn TargetReader>> {
        let client = self.get(&self.target, "target").await?;
        let query = self.page_query();
        let statement = client
            .prepare(&query)
            .await
            .map_err(|e| ReconError::prepare(&query, e.to_string()))?;
        Ok(Box::new(PgTargetReader {
            client,
            statement,
            query,
        }))
    }

    async fn source_reader(&self) -> Result<Box<dyn SourceReader>> {
        let client = self.get(&self.source, "source").await?;
        let query = self.expected_query();
        let statement = client
            .prepare(&query)
            .await
            .map_err(|e| ReconError::prepare(&query, e.to_string()))?;
        Ok(Box::new(PgSourceReader {
            client,
            statement,
            query,
        }))
    }
}

/// Target reader bound to one pooled connection.
struct PgTargetReader {
    client: Object,
    statement: Statement,
    query: String,
}

#[async_trait]
impl TargetReader for PgTargetReader {
    async fn fetch_rows(&self, range: RowRange) -> Result<Vec<TargetRecord>> {
        debug!("Fetching target rows {}", range);
        let rows = self
            .client
            .query(
                &self.statement,
                &[&(range.start as i64), &(range.end as i64)],
            )
            .await
            .map_err(|e| {
                ReconError::query(
                    format!("{} [params: {}, {}]", self.query, range.start, range.end),
                    e.to_string(),
                )
            })?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(TargetRecord {
                key: row.try_get(0).map_err(|e| ReconError::Fetch(e.to_string()))?,
                actual_value: row.try_get(1).map_err(|e| ReconError::Fetch(e.to_string()))?,
            });
        }
        Ok(records)
    }
}

/// Source reader bound to one pooled connection.
struct PgSourceReader {
    client: Object,
    statement: Statement,
    query: String,
}

#[async_trait]
impl SourceReader for PgSourceReader {
    async fn expected_domains(&self, key: &str) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(&self.statement, &[&key])
            .await
            .map_err(|e| {
                ReconError::query(format!("{} [param: {}]", self.query, key), e.to_string())
            })?;

        let mut domains = Vec::with_capacity(rows.len());
        for row in rows {
            domains.push(row.try_get(0).map_err(|e| ReconError::Fetch(e.to_string()))?);
        }
        Ok(domains)
    }
}
