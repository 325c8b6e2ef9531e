use anyhow::Result;

use super::context::RunContext;
use super::files::SourceFile;
use super::rows::{KnownForUpdate, RatingUpdate};
use super::stage::Stage;
use crate::database_ops::phase::{PhaseReport, PhaseTracker};
use crate::database_ops::sink::RowSink;
use crate::database_ops::source::SourceRow;
use crate::normalization::extract_id;
use crate::normalization::identifier::{parse_float, parse_int};
use crate::normalization::label::split_list;

/// Ratings row; dropped when the id or either number does not parse.
pub fn rating(row: &SourceRow<'_>, ctx: &RunContext) -> Option<RatingUpdate> {
    let title_id = extract_id(row.get("tconst")?).filter(|id| ctx.titles.contains(*id))?;
    Some(RatingUpdate {
        title_id,
        votes: Some(parse_int(row.get("numVotes"))?),
        average_rating: Some(parse_float(row.get("averageRating"))?),
    })
}

/// `knownForTitles` entries as (person, title, 1-based position).
pub fn known_for(row: &SourceRow<'_>, ctx: &RunContext) -> Option<Vec<KnownForUpdate>> {
    let person_id = extract_id(row.get("nconst")?).filter(|id| ctx.persons.contains(*id))?;
    Some(
        split_list(row.get("knownForTitles"), ',')
            .into_iter()
            .filter_map(|(ordinal, code)| {
                Some(KnownForUpdate {
                    person_id,
                    title_id: extract_id(code)?,
                    ordinal,
                })
            })
            .collect(),
    )
}

pub async fn apply_ratings<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("ratings");
    let loader = stage.loader;
    stage
        .stream(SourceFile::TitleRatings, loader, &mut tracker, |row, out| {
            match rating(row, ctx) {
                Some(update) => {
                    out.push(update);
                    true
                }
                None => false,
            }
        })
        .await?;
    Ok(tracker.finish())
}

pub async fn apply_known_for<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("known_for");
    let loader = stage.loader;
    stage
        .stream(SourceFile::NameBasics, loader, &mut tracker, |row, out| {
            match known_for(row, ctx) {
                Some(updates) => {
                    out.extend(updates);
                    true
                }
                None => false,
            }
        })
        .await?;
    Ok(tracker.finish())
}
