//! Category dictionaries: professions, genres, title types and akas attributes.
//!
//! Each dictionary is collected from its source columns, gets its ids assigned
//! in sorted label order and is written before any entity references it.
use anyhow::Result;

use super::context::{RunContext, DIRECTOR, UNKNOWN_TITLE_TYPE, UNKNOWN_TITLE_TYPE_ID, WRITER};
use super::files::SourceFile;
use super::rows::{AttributeKey, AttributeRow, Genres, Professions, TitleTypes};
use super::stage::Stage;
use crate::database_ops::dictionary::DictionaryBuilder;
use crate::database_ops::phase::{PhaseReport, PhaseTracker};
use crate::database_ops::rows::LabelRow;
use crate::database_ops::sink::RowSink;
use crate::database_ops::source::SourceRow;
use crate::normalization::label::{clip, split_attribute_list, split_list};
use crate::normalization::normalize_label;

pub const ATTRIBUTE_CLASS: &str = "Title attribute";
pub const TYPE_CLASS: &str = "Title types";
const EXCLUDED_TYPES: [&str; 2] = ["imdbDisplay", "original"];
const ATTRIBUTE_MAX_CHARS: usize = 200;

pub async fn load_professions<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &mut RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("professions");
    let mut builder = DictionaryBuilder::new();
    // Crew credits are filed under these two even when no principal uses them.
    builder.insert(DIRECTOR.to_string());
    builder.insert(WRITER.to_string());

    stage.scan(SourceFile::NameBasics, &mut tracker, |row| {
        for (_, token) in split_list(row.get("primaryProfession"), ',') {
            if let Some(label) = normalize_label(token) {
                builder.insert(label);
            }
        }
    });
    stage.scan(SourceFile::TitlePrincipals, &mut tracker, |row| {
        if let Some(label) = row.get("category").and_then(normalize_label) {
            builder.insert(label);
        }
    });

    ctx.professions = builder.build();
    let rows = LabelRow::<Professions>::from_dictionary(&ctx.professions);
    let loader = stage.loader;
    stage.write(loader, &rows, &mut tracker).await?;
    Ok(tracker.finish())
}

pub async fn load_genres<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &mut RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("genres");
    let mut builder = DictionaryBuilder::new();
    stage.scan(SourceFile::TitleBasics, &mut tracker, |row| {
        for (_, token) in split_list(row.get("genres"), ',') {
            if let Some(label) = normalize_label(token) {
                builder.insert(label);
            }
        }
    });

    ctx.genres = builder.build();
    let rows = LabelRow::<Genres>::from_dictionary(&ctx.genres);
    let loader = stage.loader;
    stage.write(loader, &rows, &mut tracker).await?;
    Ok(tracker.finish())
}

/// Title types always contain the `Unknown` sentinel, even when the basics
/// dump cannot be read, because stub titles point at it.
pub async fn load_title_types<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &mut RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("title_types");
    let mut builder =
        DictionaryBuilder::new().pin(UNKNOWN_TITLE_TYPE.to_string(), UNKNOWN_TITLE_TYPE_ID);
    stage.scan(SourceFile::TitleBasics, &mut tracker, |row| {
        if let Some(label) = row.get("titleType").and_then(normalize_label) {
            builder.insert(label);
        }
    });

    ctx.title_types = builder.build();
    let rows = LabelRow::<TitleTypes>::from_dictionary(&ctx.title_types);
    let loader = stage.loader;
    stage.write(loader, &rows, &mut tracker).await?;
    Ok(tracker.finish())
}

pub async fn load_attributes<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &mut RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("attributes");
    let mut builder = DictionaryBuilder::new();
    stage.scan(SourceFile::TitleAkas, &mut tracker, |row| {
        for key in akas_attribute_keys(row) {
            builder.insert(key);
        }
    });

    ctx.attributes = builder.build();
    let rows = AttributeRow::from_dictionary(&ctx.attributes);
    let loader = stage.loader;
    stage.write(loader, &rows, &mut tracker).await?;
    Ok(tracker.finish())
}

/// (class, value) pairs named by one akas row: every entry of `attributes`
/// and every entry of `types` except the display/original markers.
pub fn akas_attribute_keys(row: &SourceRow<'_>) -> Vec<AttributeKey> {
    let attributes = split_attribute_list(row.get("attributes"))
        .into_iter()
        .map(|v| (ATTRIBUTE_CLASS, v));
    let types = split_attribute_list(row.get("types"))
        .into_iter()
        .filter(|v| !EXCLUDED_TYPES.iter().any(|x| x.eq_ignore_ascii_case(v)))
        .map(|v| (TYPE_CLASS, v));

    attributes
        .chain(types)
        .filter_map(|(class, value)| {
            let label = normalize_label(value)?;
            Some((class.to_string(), clip(&label, ATTRIBUTE_MAX_CHARS).to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::batch_loader::BatchLoader;
    use crate::database_ops::imdb::files::SourceDir;
    use crate::database_ops::phase::PhaseOutcome;
    use crate::database_ops::sink::DryRunSink;
    use crate::database_ops::source::{DelimitedReader, SourceFormat};

    #[tokio::test]
    async fn professions_survive_a_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SourceFile::NameBasics.file_name()),
            "nconst\tprimaryName\tprimaryProfession\nnm0000001\tFred Astaire\tactor,soundtrack\n",
        )
        .unwrap();
        let sources = SourceDir::new(dir.path());
        let mut sink = DryRunSink::new();
        let mut stage = Stage {
            sources: &sources,
            sink: &mut sink,
            loader: BatchLoader::new(10),
            entity_loader: BatchLoader::new(10),
            chunk_rows: 10,
        };
        let mut ctx = RunContext::new();

        let report = load_professions(&mut stage, &mut ctx).await.unwrap();
        match report.outcome {
            PhaseOutcome::Partial { reason } => assert!(reason.contains("title.principals.tsv")),
            other => panic!("unexpected outcome {other:?}"),
        }
        for label in ["Actor", "Soundtrack", DIRECTOR, WRITER] {
            assert!(ctx.professions.get(label).is_some(), "{label}");
        }
        assert_eq!(ctx.professions.len(), 4);
        assert_eq!(sink.rows("professions"), 4);
    }

    fn keys_for(attributes: &str, types: &str) -> Vec<AttributeKey> {
        let data = format!("titleId\tattributes\ttypes\ntt1\t{attributes}\t{types}\n");
        let mut reader =
            DelimitedReader::from_reader("akas", data.as_bytes(), SourceFormat::TSV).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        akas_attribute_keys(&row)
    }

    #[test]
    fn akas_keys_split_both_columns() {
        let keys = keys_for("literal English title\u{2}complete title", "working|festival");
        assert_eq!(
            keys,
            vec![
                (ATTRIBUTE_CLASS.to_string(), "Literal english title".to_string()),
                (ATTRIBUTE_CLASS.to_string(), "Complete title".to_string()),
                (TYPE_CLASS.to_string(), "Working".to_string()),
                (TYPE_CLASS.to_string(), "Festival".to_string()),
            ]
        );
    }

    #[test]
    fn display_and_original_types_are_excluded() {
        let keys = keys_for("\\N", "imdbDisplay\u{2}original\u{2}alternative");
        assert_eq!(keys, vec![(TYPE_CLASS.to_string(), "Alternative".to_string())]);
    }

    #[test]
    fn long_attribute_values_are_clipped() {
        let long = "x".repeat(300);
        let keys = keys_for(&long, "\\N");
        assert_eq!(keys[0].1.chars().count(), 200);
    }
}
