use anyhow::Result;
use std::fmt;
use std::io::Read;
use tracing::{info, warn};

use super::batch_loader::{BatchLoader, LoadReport};
use super::rows::SinkRow;
use super::sink::RowSink;
use super::source::{DelimitedReader, SourceRow};

/// How a phase ended. Only fatal connection loss aborts a run; everything else
/// is folded into one of these so degraded runs are visible to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed,
    Partial { reason: String },
    Failed { cause: String },
}

impl PhaseOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Partial { reason } => write!(f, "partial ({reason})"),
            Self::Failed { cause } => write!(f, "failed ({cause})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: &'static str,
    pub outcome: PhaseOutcome,
    pub load: LoadReport,
    /// Source rows dropped because an identifier or required value did not parse.
    pub rows_dropped: u64,
}

/// Accumulates what happened while a phase ran and turns it into a report.
#[derive(Debug)]
pub struct PhaseTracker {
    phase: &'static str,
    load: LoadReport,
    rows_dropped: u64,
    sources_ok: usize,
    problems: Vec<String>,
}

impl PhaseTracker {
    pub fn new(phase: &'static str) -> Self {
        info!(phase, "phase started");
        Self {
            phase,
            load: LoadReport::default(),
            rows_dropped: 0,
            sources_ok: 0,
            problems: Vec::new(),
        }
    }

    /// The source could not be opened; the phase continues with other sources.
    pub fn source_missing(&mut self, source: &str, err: &anyhow::Error) {
        warn!(phase = self.phase, source, error = %err, "source unavailable; skipping");
        self.problems.push(format!("{source} unavailable: {err:#}"));
    }

    /// The source broke mid-read; rows read so far are kept.
    pub fn source_failed(&mut self, source: &str, err: &anyhow::Error) {
        warn!(phase = self.phase, source, error = %err, "source read failed; keeping rows read so far");
        self.problems.push(format!("{source} truncated: {err:#}"));
    }

    pub fn source_done(&mut self) {
        self.sources_ok += 1;
    }

    pub fn rows_dropped(&mut self, n: u64) {
        self.rows_dropped += n;
    }

    pub fn absorb(&mut self, load: LoadReport) {
        self.load += load;
    }

    pub fn finish(self) -> PhaseReport {
        let outcome = if self.sources_ok == 0 && !self.problems.is_empty() {
            PhaseOutcome::Failed {
                cause: self.problems.join("; "),
            }
        } else if !self.problems.is_empty() || self.load.batches_skipped > 0 {
            let mut reasons = self.problems;
            if self.load.batches_skipped > 0 {
                reasons.push(format!(
                    "{} batches ({} rows) skipped after retry",
                    self.load.batches_skipped, self.load.rows_skipped
                ));
            }
            PhaseOutcome::Partial {
                reason: reasons.join("; "),
            }
        } else {
            PhaseOutcome::Completed
        };
        let report = PhaseReport {
            phase: self.phase,
            outcome,
            load: self.load,
            rows_dropped: self.rows_dropped,
        };
        match &report.outcome {
            PhaseOutcome::Completed => info!(
                phase = report.phase,
                rows = report.load.rows_written,
                dropped = report.rows_dropped,
                "phase completed"
            ),
            other => warn!(
                phase = report.phase,
                rows = report.load.rows_written,
                dropped = report.rows_dropped,
                outcome = %other,
                "phase degraded"
            ),
        }
        report
    }
}

/// Stream a source through `map`, flushing to the loader every `chunk_rows`
/// materialized rows. `map` returns `false` when it had to drop the row.
///
/// Read failures are recorded on the tracker; only sink errors propagate.
pub async fn drain_source<IO, T, S, F>(
    reader: &mut DelimitedReader<IO>,
    chunk_rows: usize,
    loader: &BatchLoader,
    sink: &mut S,
    tracker: &mut PhaseTracker,
    mut map: F,
) -> Result<()>
where
    IO: Read,
    T: SinkRow,
    S: RowSink,
    F: FnMut(&SourceRow<'_>, &mut Vec<T>) -> bool,
{
    let name = reader.name().to_string();
    let chunk_rows = chunk_rows.max(1);
    let mut buffer: Vec<T> = Vec::with_capacity(chunk_rows.min(1 << 16));
    loop {
        match reader.next_row() {
            Ok(Some(row)) => {
                if !map(&row, &mut buffer) {
                    tracker.rows_dropped(1);
                }
            }
            Ok(None) => {
                tracker.source_done();
                break;
            }
            Err(e) => {
                tracker.source_failed(&name, &e);
                break;
            }
        }
        if buffer.len() >= chunk_rows {
            tracker.absorb(loader.load(sink, &buffer).await?);
            buffer.clear();
        }
    }
    tracker.rows_dropped(reader.malformed());
    tracker.absorb(loader.load(sink, &buffer).await?);
    Ok(())
}

/// Ordered record of every phase in a run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub phases: Vec<PhaseReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: PhaseReport) {
        self.phases.push(report);
    }

    pub fn get(&self, phase: &str) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn is_complete(&self) -> bool {
        self.phases.iter().all(|p| p.outcome.is_completed())
    }

    pub fn degraded(&self) -> impl Iterator<Item = &PhaseReport> {
        self.phases.iter().filter(|p| !p.outcome.is_completed())
    }

    pub fn rows_written(&self) -> u64 {
        self.phases.iter().map(|p| p.load.rows_written).sum()
    }

    pub fn log(&self) {
        for p in &self.phases {
            info!(
                phase = p.phase,
                outcome = %p.outcome,
                rows = p.load.rows_written,
                skipped = p.load.rows_skipped,
                dropped = p.rows_dropped,
                "phase summary"
            );
        }
        let degraded = self.degraded().count();
        if degraded == 0 {
            info!(rows = self.rows_written(), "run completed");
        } else {
            warn!(
                rows = self.rows_written(),
                degraded,
                "run completed with degraded phases; the database may be partially loaded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn clean_phase_completes() {
        let mut t = PhaseTracker::new("genres");
        t.source_done();
        t.absorb(LoadReport {
            rows_written: 3,
            batches_written: 1,
            ..Default::default()
        });
        let report = t.finish();
        assert_eq!(report.outcome, PhaseOutcome::Completed);
        assert_eq!(report.load.rows_written, 3);
    }

    #[test]
    fn all_sources_missing_fails() {
        let mut t = PhaseTracker::new("persons");
        t.source_missing("name.basics.tsv", &anyhow!("no such file"));
        let report = t.finish();
        assert!(matches!(report.outcome, PhaseOutcome::Failed { ref cause } if cause.contains("name.basics.tsv")));
    }

    #[test]
    fn some_sources_missing_is_partial() {
        let mut t = PhaseTracker::new("persons");
        t.source_done();
        t.source_missing("title.crew.tsv", &anyhow!("no such file"));
        assert!(matches!(t.finish().outcome, PhaseOutcome::Partial { .. }));
    }

    #[test]
    fn skipped_batches_are_partial() {
        let mut t = PhaseTracker::new("titles");
        t.source_done();
        t.absorb(LoadReport {
            rows_written: 2,
            batches_written: 1,
            batches_skipped: 1,
            rows_skipped: 2,
            ..Default::default()
        });
        match t.finish().outcome {
            PhaseOutcome::Partial { reason } => assert!(reason.contains("1 batches (2 rows)")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn summary_reports_degraded_phases() {
        let mut summary = RunSummary::default();
        let mut ok = PhaseTracker::new("genres");
        ok.source_done();
        summary.push(ok.finish());
        let mut bad = PhaseTracker::new("episodes");
        bad.source_missing("title.episode.tsv", &anyhow!("gone"));
        summary.push(bad.finish());
        assert!(!summary.is_complete());
        assert_eq!(summary.degraded().map(|p| p.phase).collect::<Vec<_>>(), vec!["episodes"]);
        assert!(summary.get("genres").unwrap().outcome.is_completed());
    }
}
