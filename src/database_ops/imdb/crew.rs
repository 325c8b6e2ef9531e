//! Title credits: principal cast and crew from `title.principals`, then the
//! directors and writers of `title.crew` that the principals dump left out.
use anyhow::Result;
use std::collections::BTreeSet;
use tracing::info;

use super::context::{CreditIndex, RunContext, DEFAULT_ORDERING, DIRECTOR, WRITER};
use super::files::SourceFile;
use super::rows::CreditRow;
use super::stage::Stage;
use crate::database_ops::dictionary::CategoryId;
use crate::database_ops::phase::{PhaseReport, PhaseTracker};
use crate::database_ops::sink::RowSink;
use crate::database_ops::source::SourceRow;
use crate::normalization::identifier::parse_int;
use crate::normalization::label::split_list;
use crate::normalization::{extract_id, normalize_label, EntityId};

/// A crew credit waiting for an ordinal: (title, role, person). The tuple order
/// is the numbering order.
pub type StagedCredit = (EntityId, CategoryId, EntityId);

pub fn principal_credit(row: &SourceRow<'_>, ctx: &RunContext) -> Option<CreditRow> {
    let title_id = extract_id(row.get("tconst")?).filter(|id| ctx.titles.contains(*id))?;
    let person_id = extract_id(row.get("nconst")?).filter(|id| ctx.persons.contains(*id))?;
    let ordinal = parse_int(row.get("ordering")).unwrap_or(DEFAULT_ORDERING);
    let profession_id = ctx
        .professions
        .get(normalize_label(row.get("category")?)?.as_str())?;
    Some(CreditRow {
        title_id,
        ordinal,
        person_id,
        profession_id,
    })
}

pub async fn load_principal_credits<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &mut RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("title_credits");
    let loader = stage.loader;
    let mut credits = std::mem::take(&mut ctx.credits);
    let lookup: &RunContext = ctx;
    stage
        .stream(SourceFile::TitlePrincipals, loader, &mut tracker, |row, out| {
            match principal_credit(row, lookup) {
                Some(credit) if credits.record(credit.title_id, credit.person_id, credit.ordinal) => {
                    out.push(credit);
                    true
                }
                _ => false,
            }
        })
        .await?;
    ctx.credits = credits;
    Ok(tracker.finish())
}

/// Stage every director and writer of one crew row whose (title, person) pair
/// has no credit yet. Returns `false` when the row had to be dropped.
pub fn stage_crew_row(
    row: &SourceRow<'_>,
    ctx: &RunContext,
    roles: (CategoryId, CategoryId),
    staged: &mut BTreeSet<StagedCredit>,
) -> bool {
    let Some(title_id) = row
        .get("tconst")
        .and_then(extract_id)
        .filter(|id| ctx.titles.contains(*id))
    else {
        return false;
    };
    let (director, writer) = roles;
    for (column, role) in [("directors", director), ("writers", writer)] {
        for (_, code) in split_list(row.get(column), ',') {
            let Some(person_id) = extract_id(code).filter(|id| ctx.persons.contains(*id)) else {
                continue;
            };
            if !ctx.credits.contains(title_id, person_id) {
                staged.insert((title_id, role, person_id));
            }
        }
    }
    true
}

/// Number staged crew credits so they continue each title's existing ordinals.
///
/// The set iterates in (title, role, person) order; the counter restarts at the
/// title's highest recorded ordinal whenever the title changes.
pub fn assign_gap_ordinals(staged: &BTreeSet<StagedCredit>, index: &CreditIndex) -> Vec<CreditRow> {
    let mut rows = Vec::with_capacity(staged.len());
    let mut current: Option<EntityId> = None;
    let mut counter = 0;
    for &(title_id, profession_id, person_id) in staged {
        if current != Some(title_id) {
            current = Some(title_id);
            counter = index.max_ordinal(title_id);
        }
        counter += 1;
        rows.push(CreditRow {
            title_id,
            ordinal: counter,
            person_id,
            profession_id,
        });
    }
    rows
}

pub async fn load_crew_credits<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &mut RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("crew_credits");
    let (Some(director), Some(writer)) = (ctx.professions.get(DIRECTOR), ctx.professions.get(WRITER))
    else {
        tracker.source_missing(
            "professions",
            &anyhow::anyhow!("director/writer professions were never loaded"),
        );
        return Ok(tracker.finish());
    };

    let mut staged = BTreeSet::new();
    let mut dropped = 0u64;
    let lookup: &RunContext = ctx;
    stage.scan(SourceFile::TitleCrew, &mut tracker, |row| {
        if !stage_crew_row(row, lookup, (director, writer), &mut staged) {
            dropped += 1;
        }
    });
    tracker.rows_dropped(dropped);

    let rows = assign_gap_ordinals(&staged, &ctx.credits);
    info!(staged = rows.len(), "crew credits missing from principals");
    for row in &rows {
        ctx.credits.record(row.title_id, row.person_id, row.ordinal);
    }
    let loader = stage.loader;
    stage.write(loader, &rows, &mut tracker).await?;
    Ok(tracker.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::dictionary::DictionaryBuilder;
    use crate::database_ops::source::{DelimitedReader, SourceFormat};

    #[test]
    fn principal_without_ordering_takes_the_default() {
        let mut ctx = RunContext::new();
        ctx.titles.insert(1);
        ctx.persons.insert(10);
        let mut professions = DictionaryBuilder::new();
        professions.insert("Actor".to_string());
        ctx.professions = professions.build();

        let data = "tconst\tordering\tnconst\tcategory\ntt0000001\t\\N\tnm0000010\tactor\n";
        let mut reader =
            DelimitedReader::from_reader("principals", data.as_bytes(), SourceFormat::TSV).unwrap();
        let credit = principal_credit(&reader.next_row().unwrap().unwrap(), &ctx).unwrap();
        assert_eq!(credit.ordinal, DEFAULT_ORDERING);
        assert_eq!((credit.title_id, credit.person_id, credit.profession_id), (1, 10, 1));
    }

    #[test]
    fn gap_rows_continue_after_existing_ordinals() {
        let mut index = CreditIndex::default();
        index.record(1, 100, 1);
        index.record(1, 101, 3);
        let staged = BTreeSet::from([(1, 2, 300), (1, 1, 200)]);

        let rows = assign_gap_ordinals(&staged, &index);
        let got: Vec<(i32, CategoryId, EntityId)> =
            rows.iter().map(|r| (r.ordinal, r.profession_id, r.person_id)).collect();
        assert_eq!(got, vec![(4, 1, 200), (5, 2, 300)]);
    }

    #[test]
    fn counter_resets_per_title() {
        let mut index = CreditIndex::default();
        index.record(2, 100, 7);
        let staged = BTreeSet::from([(1, 1, 10), (1, 1, 11), (2, 1, 12), (3, 2, 13)]);
        let rows = assign_gap_ordinals(&staged, &index);
        let got: Vec<(EntityId, i32)> = rows.iter().map(|r| (r.title_id, r.ordinal)).collect();
        assert_eq!(got, vec![(1, 1), (1, 2), (2, 8), (3, 1)]);
    }

    #[test]
    fn crew_already_credited_is_not_staged() {
        let mut ctx = RunContext::new();
        ctx.titles.insert(1);
        for p in [10, 11, 12] {
            ctx.persons.insert(p);
        }
        ctx.credits.record(1, 10, 1);

        let data = "tconst\tdirectors\twriters\ntt0000001\tnm0000010,nm0000011\tnm0000011,nm0000012,nm0000099\n";
        let mut reader =
            DelimitedReader::from_reader("crew", data.as_bytes(), SourceFormat::TSV).unwrap();
        let row = reader.next_row().unwrap().unwrap();
        let mut staged = BTreeSet::new();
        assert!(stage_crew_row(&row, &ctx, (5, 9), &mut staged));
        assert_eq!(
            staged.into_iter().collect::<Vec<_>>(),
            vec![(1, 5, 11), (1, 9, 11), (1, 9, 12)]
        );
    }
}
