//! Persons and titles.
//!
//! The authoritative dump for each entity is read first; every later source
//! that merely references an id contributes a placeholder row, and only for
//! ids nobody emitted yet. Each id reaches the sink exactly once.
use anyhow::Result;

use super::context::{EmittedSet, RunContext};
use super::files::SourceFile;
use super::rows::{PersonRow, TitleRow};
use super::stage::Stage;
use crate::database_ops::phase::{PhaseReport, PhaseTracker};
use crate::database_ops::sink::RowSink;
use crate::database_ops::source::SourceRow;
use crate::normalization::identifier::{parse_flag, parse_int, year_to_date, YearBound};
use crate::normalization::label::{clip, split_list};
use crate::normalization::{extract_id, normalize_label};

const PERSON_NAME_MAX_CHARS: usize = 200;
const PRIMARY_TITLE_MAX_CHARS: usize = 500;

pub fn person_from_basics(row: &SourceRow<'_>) -> Option<PersonRow> {
    let id = extract_id(row.get("nconst")?)?;
    let name = row
        .get("primaryName")
        .map(|n| clip(n.trim(), PERSON_NAME_MAX_CHARS).to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| PersonRow::UNKNOWN_NAME.to_string());
    Some(PersonRow {
        id,
        name,
        birth_date: year_to_date(row.get("birthYear"), YearBound::Start),
        death_date: year_to_date(row.get("deathYear"), YearBound::End),
    })
}

pub fn title_from_basics(row: &SourceRow<'_>, ctx: &RunContext) -> Option<TitleRow> {
    let id = extract_id(row.get("tconst")?)?;
    let title_type = row.get("titleType").and_then(normalize_label);
    Some(TitleRow {
        id,
        title_type_id: ctx.title_type_or_unknown(title_type.as_deref()),
        is_adult: parse_flag(row.get("isAdult")),
        primary_title: row
            .get("primaryTitle")
            .map(|t| clip(t, PRIMARY_TITLE_MAX_CHARS).to_string()),
        start_date: year_to_date(row.get("startYear"), YearBound::Start),
        end_date: year_to_date(row.get("endYear"), YearBound::End),
        runtime_minutes: parse_int(row.get("runtimeMinutes")),
    })
}

/// Push a stub for every id in `column` (a single code or a comma list) that
/// was not emitted yet. Returns `false` when a code was present but unparseable.
fn stub_ids<T>(
    row: &SourceRow<'_>,
    column: &str,
    emitted: &mut EmittedSet,
    out: &mut Vec<T>,
    stub: impl Fn(i64) -> T,
) -> bool {
    let mut clean = true;
    for (_, code) in split_list(row.get(column), ',') {
        match extract_id(code) {
            Some(id) => {
                if emitted.insert(id) {
                    out.push(stub(id));
                }
            }
            None => clean = false,
        }
    }
    clean
}

pub async fn load_persons<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &mut RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("persons");
    let loader = stage.entity_loader;
    let persons = &mut ctx.persons;

    stage
        .stream(SourceFile::NameBasics, loader, &mut tracker, |row, out| {
            match person_from_basics(row) {
                Some(person) => {
                    if persons.insert(person.id) {
                        out.push(person);
                    }
                    true
                }
                None => false,
            }
        })
        .await?;

    stage
        .stream(SourceFile::TitlePrincipals, loader, &mut tracker, |row, out| {
            stub_ids(row, "nconst", persons, out, PersonRow::stub)
        })
        .await?;

    stage
        .stream(SourceFile::TitleCrew, loader, &mut tracker, |row, out| {
            let directors = stub_ids(row, "directors", persons, out, PersonRow::stub);
            let writers = stub_ids(row, "writers", persons, out, PersonRow::stub);
            directors && writers
        })
        .await?;

    Ok(tracker.finish())
}

pub async fn load_titles<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &mut RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("titles");
    let loader = stage.entity_loader;
    let unknown = ctx.title_type_or_unknown(None);
    let stub = move |id| TitleRow::stub(id, unknown);

    // Basics rows need the title type dictionary while the emitted set is
    // being updated, so the set is moved out for the duration of the phase.
    let mut titles = std::mem::take(&mut ctx.titles);
    let lookup: &RunContext = ctx;
    stage
        .stream(SourceFile::TitleBasics, loader, &mut tracker, |row, out| {
            match title_from_basics(row, lookup) {
                Some(title) => {
                    if titles.insert(title.id) {
                        out.push(title);
                    }
                    true
                }
                None => false,
            }
        })
        .await?;

    for (file, columns) in [
        (SourceFile::TitleAkas, &["titleId"][..]),
        (SourceFile::TitlePrincipals, &["tconst"][..]),
        (SourceFile::TitleCrew, &["tconst"][..]),
        (SourceFile::TitleEpisode, &["tconst", "parentTconst"][..]),
    ] {
        stage
            .stream(file, loader, &mut tracker, |row, out| {
                let mut clean = true;
                for column in columns {
                    clean &= stub_ids(row, column, &mut titles, out, stub);
                }
                clean
            })
            .await?;
    }

    ctx.titles = titles;
    Ok(tracker.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::dictionary::DictionaryBuilder;
    use crate::database_ops::source::{DelimitedReader, SourceFormat};
    use chrono::NaiveDate;

    fn first_row<T>(data: &str, f: impl FnOnce(&SourceRow<'_>) -> T) -> T {
        let mut reader =
            DelimitedReader::from_reader("fixture", data.as_bytes(), SourceFormat::TSV).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        f(&row)
    }

    #[test]
    fn person_years_map_to_bounds() {
        let data = "nconst\tprimaryName\tbirthYear\tdeathYear\nnm0000001\tFred Astaire\t1899\t1987\n";
        let person = first_row(data, person_from_basics).unwrap();
        assert_eq!(person.id, 1);
        assert_eq!(person.name, "Fred Astaire");
        assert_eq!(person.birth_date, NaiveDate::from_ymd_opt(1899, 1, 1));
        assert_eq!(person.death_date, NaiveDate::from_ymd_opt(1987, 12, 31));
    }

    #[test]
    fn person_without_name_is_unknown() {
        let data = "nconst\tprimaryName\tbirthYear\tdeathYear\nnm0000009\t\\N\t\\N\t\\N\n";
        let person = first_row(data, person_from_basics).unwrap();
        assert_eq!(person.name, "Unknown");
        assert!(person.birth_date.is_none());
    }

    #[test]
    fn unparseable_person_id_is_dropped() {
        let data = "nconst\tprimaryName\nnmXYZ\tNobody\n";
        assert!(first_row(data, person_from_basics).is_none());
    }

    #[test]
    fn title_type_falls_back_to_sentinel() {
        let mut ctx = RunContext::new();
        let mut types = DictionaryBuilder::new().pin("Unknown".to_string(), 0);
        types.insert("Short".to_string());
        ctx.title_types = types.build();

        let data = "tconst\ttitleType\tprimaryTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\n\
                    tt0000001\tshort\tCarmencita\t0\t1894\t\\N\t1\n\
                    tt0000002\tvideoGame\tPong\t1\t1972\t1973\t\\N\n";
        let mut reader =
            DelimitedReader::from_reader("basics", data.as_bytes(), SourceFormat::TSV).unwrap();

        let first = title_from_basics(&reader.next_row().unwrap().unwrap(), &ctx).unwrap();
        assert_eq!(first.title_type_id, 1);
        assert_eq!(first.primary_title.as_deref(), Some("Carmencita"));
        assert_eq!(first.runtime_minutes, Some(1));
        assert!(!first.is_adult);

        let second = title_from_basics(&reader.next_row().unwrap().unwrap(), &ctx).unwrap();
        assert_eq!(second.title_type_id, 0);
        assert!(second.is_adult);
        assert_eq!(second.end_date, NaiveDate::from_ymd_opt(1973, 12, 31));
    }
}
