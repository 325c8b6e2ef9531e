use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input: PathBuf,
    /// Defaults to the input path with `.tsv` swapped for `.csv`.
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    pub output: PathBuf,
    pub rows: u64,
    pub columns: usize,
}

/// `name.basics.tsv` -> `name.basics.csv`; any other name gets `.csv` appended.
pub fn default_output(input: &Path) -> PathBuf {
    let raw = input.to_string_lossy();
    match raw.strip_suffix(".tsv") {
        Some(stem) => PathBuf::from(format!("{stem}.csv")),
        None => PathBuf::from(format!("{raw}.csv")),
    }
}

/// Rewrite a tab-separated dump as RFC 4180 CSV. Values are copied verbatim,
/// including the `\N` null-marker.
pub fn run(cfg: ConvertConfig) -> Result<ConvertReport> {
    if !cfg.input.is_file() {
        bail!("input {} does not exist", cfg.input.display());
    }
    let output = cfg.output.unwrap_or_else(|| default_output(&cfg.input));
    info!(input = %cfg.input.display(), output = %output.display(), "converting");

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_path(&cfg.input)
        .with_context(|| format!("open {}", cfg.input.display()))?;
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_path(&output)
        .with_context(|| format!("create {}", output.display()))?;

    let headers = reader.headers()?.clone();
    writer.write_record(&headers)?;
    let mut record = StringRecord::new();
    let mut rows = 0u64;
    while reader.read_record(&mut record)? {
        writer.write_record(&record)?;
        rows += 1;
    }
    writer.flush()?;

    let report = ConvertReport {
        output,
        rows,
        columns: headers.len(),
    };
    info!(rows = report.rows, columns = report.columns, "conversion finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_swaps_extension() {
        assert_eq!(
            default_output(Path::new("data/title.basics.tsv")),
            PathBuf::from("data/title.basics.csv")
        );
        assert_eq!(default_output(Path::new("dump.txt")), PathBuf::from("dump.txt.csv"));
    }

    #[test]
    fn converts_tabs_and_quotes_commas() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("title.akas.tsv");
        std::fs::write(&input, "titleId\ttitle\tregion\ntt1\tHello, World\t\\N\ntt2\tPlain\tUS\n").unwrap();

        let report = run(ConvertConfig {
            input: input.clone(),
            output: None,
        })
        .unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.columns, 3);
        assert_eq!(report.output, dir.path().join("title.akas.csv"));

        let written = std::fs::read_to_string(&report.output).unwrap();
        assert_eq!(written, "titleId,title,region\ntt1,\"Hello, World\",\\N\ntt2,Plain,US\n");
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(ConvertConfig {
            input: dir.path().join("nope.tsv"),
            output: None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
