use anyhow::Result;
use std::ops::AddAssign;
use tracing::{debug, info, warn};

use super::rows::SinkRow;
use super::sink::RowSink;

/// Outcome counters for one or more `BatchLoader::load` calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_written: u64,
    pub batches_written: u64,
    pub batches_retried: u64,
    pub batches_skipped: u64,
    pub rows_skipped: u64,
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, rhs: Self) {
        self.rows_written += rhs.rows_written;
        self.batches_written += rhs.batches_written;
        self.batches_retried += rhs.batches_retried;
        self.batches_skipped += rhs.batches_skipped;
        self.rows_skipped += rhs.rows_skipped;
    }
}

/// Writes rows in fixed-size contiguous batches.
///
/// Each batch is preceded by a keep-alive. A failed batch gets exactly one
/// reconnect-and-retry; if the retry fails too the batch is abandoned and the
/// loader moves on. Already committed batches are never rolled back, so the
/// guarantee is best-effort rather than exactly-once. Only a failed
/// keep-alive or reconnect (the session cannot be reestablished) aborts.
#[derive(Debug, Clone, Copy)]
pub struct BatchLoader {
    batch_size: usize,
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Batch size actually used for `R`, clamped to the bind-parameter limit.
    pub fn effective_batch_size<R: SinkRow>(&self) -> usize {
        self.batch_size.min(R::max_rows_per_statement())
    }

    pub async fn load<R, S>(&self, sink: &mut S, rows: &[R]) -> Result<LoadReport>
    where
        R: SinkRow,
        S: RowSink,
    {
        let mut report = LoadReport::default();
        if rows.is_empty() {
            return Ok(report);
        }
        let size = self.effective_batch_size::<R>();
        if size < self.batch_size {
            debug!(table = R::TABLE, configured = self.batch_size, size, "batch size clamped to bind limit");
        }

        for (idx, batch) in rows.chunks(size).enumerate() {
            sink.keep_alive().await?;
            match sink.write_batch(batch).await {
                Ok(_) => report.record_written(batch.len()),
                Err(first) => {
                    warn!(table = R::TABLE, batch = idx, error = %first, "batch failed; reconnecting for one retry");
                    sink.reconnect().await?;
                    report.batches_retried += 1;
                    match sink.write_batch(batch).await {
                        Ok(_) => report.record_written(batch.len()),
                        Err(second) => {
                            warn!(table = R::TABLE, batch = idx, rows = batch.len(), error = %second, "retry failed; skipping batch");
                            report.batches_skipped += 1;
                            report.rows_skipped += batch.len() as u64;
                        }
                    }
                }
            }
        }
        info!(
            table = R::TABLE,
            rows = report.rows_written,
            skipped = report.rows_skipped,
            "rows written"
        );
        Ok(report)
    }
}

impl LoadReport {
    fn record_written(&mut self, rows: usize) {
        self.rows_written += rows as u64;
        self.batches_written += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::rows::insert_if_absent;
    use anyhow::anyhow;
    use sqlx::{Postgres, QueryBuilder};
    use std::collections::HashSet;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Pair {
        pub key: i64,
        pub value: i32,
    }

    impl SinkRow for Pair {
        const TABLE: &'static str = "pairs";
        const WIDTH: usize = 2;

        fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
            insert_if_absent(Self::TABLE, "key, value", "key", rows, |mut b, r| {
                b.push_bind(r.key).push_bind(r.value);
            })
        }
    }

    /// Records every write attempt and fails the attempts listed in `fail_calls`
    /// (1-based call numbers).
    #[derive(Default)]
    pub struct FlakySink {
        pub fail_calls: HashSet<usize>,
        pub calls: Vec<usize>,
        pub stored: Vec<String>,
        pub reconnects: usize,
        pub keep_alives: usize,
        pub reconnect_fails: bool,
    }

    #[async_trait::async_trait]
    impl RowSink for FlakySink {
        async fn keep_alive(&mut self) -> Result<()> {
            self.keep_alives += 1;
            Ok(())
        }

        async fn reconnect(&mut self) -> Result<()> {
            self.reconnects += 1;
            if self.reconnect_fails {
                return Err(anyhow!("server gone"));
            }
            Ok(())
        }

        async fn write_batch<R: SinkRow>(&mut self, rows: &[R]) -> Result<u64> {
            self.calls.push(rows.len());
            if self.fail_calls.contains(&self.calls.len()) {
                return Err(anyhow!("forced failure on call {}", self.calls.len()));
            }
            self.stored.extend(rows.iter().map(|r| format!("{r:?}")));
            Ok(rows.len() as u64)
        }
    }

    fn pairs(n: i64) -> Vec<Pair> {
        (1..=n).map(|key| Pair { key, value: key as i32 * 10 }).collect()
    }

    #[tokio::test]
    async fn partitions_into_contiguous_batches() {
        let mut sink = FlakySink::default();
        let report = BatchLoader::new(2).load(&mut sink, &pairs(5)).await.unwrap();
        assert_eq!(sink.calls, vec![2, 2, 1]);
        assert_eq!(sink.keep_alives, 3);
        assert_eq!(report.rows_written, 5);
        assert_eq!(report.batches_written, 3);
        assert_eq!(report.batches_skipped, 0);
    }

    #[tokio::test]
    async fn retry_after_failure_recovers_batch() {
        let mut sink = FlakySink {
            fail_calls: HashSet::from([2]),
            ..Default::default()
        };
        let rows = pairs(5);
        let report = BatchLoader::new(2).load(&mut sink, &rows).await.unwrap();
        assert_eq!(sink.calls, vec![2, 2, 2, 1]);
        assert_eq!(sink.reconnects, 1);
        assert_eq!(sink.stored.len(), 5);
        for row in &rows {
            assert!(sink.stored.contains(&format!("{row:?}")));
        }
        assert_eq!(report.batches_retried, 1);
        assert_eq!(report.batches_skipped, 0);
        assert_eq!(report.rows_written, 5);
    }

    #[tokio::test]
    async fn failed_retry_skips_only_that_batch() {
        let mut sink = FlakySink {
            fail_calls: HashSet::from([2, 3]),
            ..Default::default()
        };
        let rows = pairs(5);
        let report = BatchLoader::new(2).load(&mut sink, &rows).await.unwrap();
        let expected: Vec<String> = [&rows[0], &rows[1], &rows[4]]
            .iter()
            .map(|r| format!("{r:?}"))
            .collect();
        assert_eq!(sink.stored, expected);
        assert_eq!(report.rows_written, 3);
        assert_eq!(report.batches_skipped, 1);
        assert_eq!(report.rows_skipped, 2);
    }

    #[tokio::test]
    async fn exhausted_reconnect_is_fatal() {
        let mut sink = FlakySink {
            fail_calls: HashSet::from([1]),
            reconnect_fails: true,
            ..Default::default()
        };
        let err = BatchLoader::new(2).load(&mut sink, &pairs(3)).await.unwrap_err();
        assert!(err.to_string().contains("server gone"));
        assert_eq!(sink.calls, vec![2]);
    }

    #[tokio::test]
    async fn empty_input_issues_no_writes() {
        let mut sink = FlakySink::default();
        let report = BatchLoader::new(10).load::<Pair, _>(&mut sink, &[]).await.unwrap();
        assert!(sink.calls.is_empty());
        assert_eq!(report, LoadReport::default());
    }

    #[test]
    fn zero_batch_size_is_bumped_to_one() {
        assert_eq!(BatchLoader::new(0).batch_size, 1);
    }
}
