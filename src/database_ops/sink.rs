use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::db::Db;
use super::rows::SinkRow;

/// Destination for batched rows.
///
/// The batch loader drives every write through this seam so the same phase
/// code runs against PostgreSQL, the dry-run counter, or a test double.
#[async_trait::async_trait]
pub trait RowSink: Send {
    /// Cheap liveness probe run before every batch; reestablishes the session
    /// when the probe fails. An error here is fatal.
    async fn keep_alive(&mut self) -> Result<()>;

    /// Unconditionally reestablish the session after a failed write.
    async fn reconnect(&mut self) -> Result<()>;

    /// Write one batch in its own transaction and commit it.
    async fn write_batch<R: SinkRow>(&mut self, rows: &[R]) -> Result<u64>;
}

#[async_trait::async_trait]
impl RowSink for Db {
    async fn keep_alive(&mut self) -> Result<()> {
        if let Err(e) = self.ping().await {
            warn!(error = %e, "session looks dead; reconnecting");
            self.reconnect().await?;
        }
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        Db::reconnect(self).await
    }

    async fn write_batch<R: SinkRow>(&mut self, rows: &[R]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut qb = R::statement(rows);
        let mut tx = self.pool.begin().await?;
        let done = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("bulk write into {}", R::TABLE))?;
        tx.commit().await?;
        debug!(table = R::TABLE, rows = rows.len(), affected = done.rows_affected(), "batch committed");
        Ok(done.rows_affected())
    }
}

/// Sink that only counts rows per table; used by `--dry-run` to exercise
/// every phase without a database.
#[derive(Debug, Default)]
pub struct DryRunSink {
    tables: BTreeMap<&'static str, u64>,
    batches: u64,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: &str) -> u64 {
        self.tables.get(table).copied().unwrap_or(0)
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn tables(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.tables.iter().map(|(t, n)| (*t, *n))
    }
}

#[async_trait::async_trait]
impl RowSink for DryRunSink {
    async fn keep_alive(&mut self) -> Result<()> {
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn write_batch<R: SinkRow>(&mut self, rows: &[R]) -> Result<u64> {
        *self.tables.entry(R::TABLE).or_default() += rows.len() as u64;
        self.batches += 1;
        Ok(rows.len() as u64)
    }
}
