use anyhow::Result;

use super::files::{SourceDir, SourceFile, SourceReader};
use crate::database_ops::batch_loader::BatchLoader;
use crate::database_ops::phase::{drain_source, PhaseTracker};
use crate::database_ops::rows::SinkRow;
use crate::database_ops::sink::RowSink;
use crate::database_ops::source::SourceRow;

/// Everything a phase needs to read sources and write rows.
pub struct Stage<'a, S> {
    pub sources: &'a SourceDir,
    pub sink: &'a mut S,
    /// Junctions, dictionaries and updates.
    pub loader: BatchLoader,
    /// Persons and titles.
    pub entity_loader: BatchLoader,
    pub chunk_rows: usize,
}

impl<S: RowSink> Stage<'_, S> {
    /// Open a source, recording it on the tracker when it is unavailable.
    pub fn open(&self, file: SourceFile, tracker: &mut PhaseTracker) -> Option<SourceReader> {
        match self.sources.open(file) {
            Ok(reader) => Some(reader),
            Err(e) => {
                tracker.source_missing(file.file_name(), &e);
                None
            }
        }
    }

    /// Visit every row of a source without writing anything.
    pub fn scan<F>(&self, file: SourceFile, tracker: &mut PhaseTracker, mut visit: F)
    where
        F: FnMut(&SourceRow<'_>),
    {
        let Some(mut reader) = self.open(file, tracker) else {
            return;
        };
        loop {
            match reader.next_row() {
                Ok(Some(row)) => visit(&row),
                Ok(None) => {
                    tracker.source_done();
                    break;
                }
                Err(e) => {
                    tracker.source_failed(file.file_name(), &e);
                    break;
                }
            }
        }
        tracker.rows_dropped(reader.malformed());
    }

    /// Stream a source through `map` into the sink, chunk by chunk.
    pub async fn stream<T, F>(
        &mut self,
        file: SourceFile,
        loader: BatchLoader,
        tracker: &mut PhaseTracker,
        map: F,
    ) -> Result<()>
    where
        T: SinkRow,
        F: FnMut(&SourceRow<'_>, &mut Vec<T>) -> bool,
    {
        let Some(mut reader) = self.open(file, tracker) else {
            return Ok(());
        };
        drain_source(&mut reader, self.chunk_rows, &loader, &mut *self.sink, tracker, map).await
    }

    /// Write rows that were materialized in memory.
    pub async fn write<T: SinkRow>(
        &mut self,
        loader: BatchLoader,
        rows: &[T],
        tracker: &mut PhaseTracker,
    ) -> Result<()> {
        for chunk in rows.chunks(self.chunk_rows.max(1)) {
            tracker.absorb(loader.load(&mut *self.sink, chunk).await?);
        }
        Ok(())
    }
}
