use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// How a delimited source is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    pub delimiter: u8,
    pub quoting: bool,
    /// Token meaning "absent"; `None` means only empty fields are absent.
    pub null_marker: Option<&'static str>,
}

impl SourceFormat {
    /// IMDB dumps: tab separated, no quoting, `\N` for null.
    pub const TSV: Self = Self {
        delimiter: b'\t',
        quoting: false,
        null_marker: Some(crate::normalization::NULL_MARKER),
    };

    /// Catalog exports: comma separated, RFC 4180 quoting, empty for null.
    pub const CSV: Self = Self {
        delimiter: b',',
        quoting: true,
        null_marker: None,
    };
}

/// Streaming reader over a headered delimited file.
///
/// Every column is read as a string; conversion happens in the materializers so
/// nothing is coerced before the null-marker has been checked.
pub struct DelimitedReader<R: Read> {
    name: String,
    format: SourceFormat,
    inner: csv::Reader<R>,
    columns: HashMap<String, usize>,
    record: StringRecord,
    rows_read: u64,
    malformed: u64,
}

impl DelimitedReader<BufReader<File>> {
    pub fn open(path: &Path, format: SourceFormat) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("source")
            .to_string();
        info!(source = %name, "reading source");
        Self::from_reader(name, BufReader::with_capacity(8 << 20, file), format)
    }
}

impl<R: Read> DelimitedReader<R> {
    pub fn from_reader(name: impl Into<String>, reader: R, format: SourceFormat) -> Result<Self> {
        let name = name.into();
        let mut inner = ReaderBuilder::new()
            .delimiter(format.delimiter)
            .quoting(format.quoting)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::None)
            .from_reader(reader);
        let columns = inner
            .headers()
            .with_context(|| format!("read header of {name}"))?
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.trim().to_string(), idx))
            .collect();
        Ok(Self {
            name,
            format,
            inner,
            columns,
            record: StringRecord::new(),
            rows_read: 0,
            malformed: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records the parser rejected (bad UTF-8, broken quoting) and skipped.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    /// Advance to the next record. Malformed records are skipped; only I/O
    /// failures surface as errors.
    pub fn next_row(&mut self) -> Result<Option<SourceRow<'_>>> {
        loop {
            match self.inner.read_record(&mut self.record) {
                Ok(true) => {
                    self.rows_read += 1;
                    if self.rows_read % 1_000_000 == 0 {
                        debug!(source = %self.name, rows = self.rows_read, "reading");
                    }
                    return Ok(Some(SourceRow {
                        record: &self.record,
                        columns: &self.columns,
                        null_marker: self.format.null_marker,
                    }));
                }
                Ok(false) => {
                    info!(source = %self.name, rows = self.rows_read, malformed = self.malformed, "source exhausted");
                    return Ok(None);
                }
                Err(e) if e.is_io_error() => {
                    return Err(anyhow::Error::new(e).context(format!("read {}", self.name)));
                }
                Err(e) => {
                    self.malformed += 1;
                    warn!(source = %self.name, error = %e, "skipping malformed record");
                }
            }
        }
    }
}

/// Borrowed view of one record, addressed by header name.
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    record: &'a StringRecord,
    columns: &'a HashMap<String, usize>,
    null_marker: Option<&'static str>,
}

impl<'a> SourceRow<'a> {
    /// Field value, or `None` when the column is missing, empty or the null-marker.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = *self.columns.get(column)?;
        let value = self.record.get(idx)?;
        if value.is_empty() || Some(value) == self.null_marker {
            None
        } else {
            Some(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_tsv_with_null_marker() {
        let data = "tconst\tgenres\tstartYear\ntt0000001\tDocumentary,Short\t1894\ntt0000002\t\\N\t\n";
        let mut reader = DelimitedReader::from_reader("basics", data.as_bytes(), SourceFormat::TSV).unwrap();
        assert!(reader.columns.contains_key("genres"));

        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.get("tconst"), Some("tt0000001"));
        assert_eq!(row.get("genres"), Some("Documentary,Short"));
        assert_eq!(row.get("missing"), None);

        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.get("genres"), None);
        assert_eq!(row.get("startYear"), None);

        assert!(reader.next_row().unwrap().is_none());
        assert_eq!(reader.rows_read, 2);
    }

    #[test]
    fn tsv_quotes_are_literal() {
        let data = "titleId\ttitle\ntt1\t\"Quoted\" Title\n";
        let mut reader = DelimitedReader::from_reader("akas", data.as_bytes(), SourceFormat::TSV).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.get("title"), Some("\"Quoted\" Title"));
    }

    #[test]
    fn short_records_are_tolerated() {
        let data = "a\tb\tc\n1\t2\n";
        let mut reader = DelimitedReader::from_reader("short", data.as_bytes(), SourceFormat::TSV).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.get("b"), Some("2"));
        assert_eq!(row.get("c"), None);
    }

    #[test]
    fn csv_uses_empty_as_null() {
        let data = "show_id,director,cast\ns1,,\"A, B\"\n";
        let mut reader = DelimitedReader::from_reader("catalog", data.as_bytes(), SourceFormat::CSV).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.get("director"), None);
        assert_eq!(row.get("cast"), Some("A, B"));
    }

    #[test]
    fn open_missing_file_is_an_error() {
        assert!(DelimitedReader::open(Path::new("/nonexistent/name.basics.tsv"), SourceFormat::TSV).is_err());
    }
}
