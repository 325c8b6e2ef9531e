//! Junction rows linking persons and titles to dictionaries and to each other.
//!
//! A row is only materialized when every entity it points at was emitted by an
//! earlier phase; tokens without a dictionary hit are dropped silently.
use anyhow::Result;

use super::catalogs::akas_attribute_keys;
use super::context::{RunContext, DEFAULT_ORDERING};
use super::files::SourceFile;
use super::rows::{
    CharacterRow, EpisodeRow, PersonProfessionRow, TitleGenreRow, TitleNameAttributeRow,
    TitleNameRow,
};
use super::stage::Stage;
use crate::database_ops::phase::{PhaseReport, PhaseTracker};
use crate::database_ops::sink::RowSink;
use crate::database_ops::source::SourceRow;
use crate::normalization::identifier::{parse_flag, parse_int};
use crate::normalization::label::{clip, parse_characters, split_list};
use crate::normalization::{extract_id, normalize_label, EntityId};

const NAME_MAX_CHARS: usize = 500;
const REGION_MAX_CHARS: usize = 100;
const LANGUAGE_MAX_CHARS: usize = 100;
const CHARACTER_MAX_CHARS: usize = 200;

fn known_title(row: &SourceRow<'_>, column: &str, ctx: &RunContext) -> Option<EntityId> {
    extract_id(row.get(column)?).filter(|id| ctx.titles.contains(*id))
}

fn known_person(row: &SourceRow<'_>, column: &str, ctx: &RunContext) -> Option<EntityId> {
    extract_id(row.get(column)?).filter(|id| ctx.persons.contains(*id))
}

/// `primaryProfession` entries, keeping their 1-based position in the list.
pub fn top_professions(row: &SourceRow<'_>, ctx: &RunContext) -> Option<Vec<PersonProfessionRow>> {
    let person_id = known_person(row, "nconst", ctx)?;
    Some(
        split_list(row.get("primaryProfession"), ',')
            .into_iter()
            .filter_map(|(ordinal, token)| {
                let profession_id = ctx.professions.get(normalize_label(token)?.as_str())?;
                Some(PersonProfessionRow {
                    person_id,
                    profession_id,
                    ordinal,
                })
            })
            .collect(),
    )
}

pub fn title_genres(row: &SourceRow<'_>, ctx: &RunContext) -> Option<Vec<TitleGenreRow>> {
    let title_id = known_title(row, "tconst", ctx)?;
    Some(
        split_list(row.get("genres"), ',')
            .into_iter()
            .filter_map(|(_, token)| {
                let genre_id = ctx.genres.get(normalize_label(token)?.as_str())?;
                Some(TitleGenreRow { title_id, genre_id })
            })
            .collect(),
    )
}

pub fn title_name(row: &SourceRow<'_>, ctx: &RunContext) -> Option<TitleNameRow> {
    let title_id = known_title(row, "titleId", ctx)?;
    let clipped = |column: &str, max: usize| {
        row.get(column)
            .map(|v| clip(v.trim(), max).to_string())
            .unwrap_or_default()
    };
    let name = clipped("title", NAME_MAX_CHARS);
    Some(TitleNameRow {
        title_id,
        ordering: parse_int(row.get("ordering")).unwrap_or(DEFAULT_ORDERING),
        name: if name.is_empty() {
            "Unknown".to_string()
        } else {
            name
        },
        region: clipped("region", REGION_MAX_CHARS),
        language: clipped("language", LANGUAGE_MAX_CHARS),
        is_original: parse_flag(row.get("isOriginalTitle")),
    })
}

pub fn title_name_attributes(
    row: &SourceRow<'_>,
    ctx: &RunContext,
) -> Option<Vec<TitleNameAttributeRow>> {
    let title_id = known_title(row, "titleId", ctx)?;
    let ordering = parse_int(row.get("ordering")).unwrap_or(DEFAULT_ORDERING);
    Some(
        akas_attribute_keys(row)
            .into_iter()
            .filter_map(|key| {
                Some(TitleNameAttributeRow {
                    title_id,
                    ordering,
                    attribute_id: ctx.attributes.get(&key)?,
                })
            })
            .collect(),
    )
}

pub fn characters(row: &SourceRow<'_>, ctx: &RunContext) -> Option<Vec<CharacterRow>> {
    let title_id = known_title(row, "tconst", ctx)?;
    let person_id = known_person(row, "nconst", ctx)?;
    Some(
        parse_characters(row.get("characters"))
            .into_iter()
            .map(|name| CharacterRow {
                title_id,
                person_id,
                name: clip(&name, CHARACTER_MAX_CHARS).to_string(),
            })
            .collect(),
    )
}

pub fn episode(row: &SourceRow<'_>, ctx: &RunContext) -> Option<EpisodeRow> {
    Some(EpisodeRow {
        episode_id: known_title(row, "tconst", ctx)?,
        series_id: known_title(row, "parentTconst", ctx)?,
        season: parse_int(row.get("seasonNumber")),
        episode: parse_int(row.get("episodeNumber")),
    })
}

/// Adapt a per-row materializer that yields many rows to the stream callback.
fn extend_with<T>(produced: Option<Vec<T>>, out: &mut Vec<T>) -> bool {
    match produced {
        Some(rows) => {
            out.extend(rows);
            true
        }
        None => false,
    }
}

fn push_with<T>(produced: Option<T>, out: &mut Vec<T>) -> bool {
    match produced {
        Some(row) => {
            out.push(row);
            true
        }
        None => false,
    }
}

pub async fn load_person_professions<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("person_professions");
    let loader = stage.loader;
    stage
        .stream(SourceFile::NameBasics, loader, &mut tracker, |row, out| {
            extend_with(top_professions(row, ctx), out)
        })
        .await?;
    Ok(tracker.finish())
}

pub async fn load_title_genres<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("title_genres");
    let loader = stage.loader;
    stage
        .stream(SourceFile::TitleBasics, loader, &mut tracker, |row, out| {
            extend_with(title_genres(row, ctx), out)
        })
        .await?;
    Ok(tracker.finish())
}

pub async fn load_title_names<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("title_names");
    let loader = stage.loader;
    stage
        .stream(SourceFile::TitleAkas, loader, &mut tracker, |row, out| {
            push_with(title_name(row, ctx), out)
        })
        .await?;
    Ok(tracker.finish())
}

pub async fn load_title_name_attributes<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("title_name_attributes");
    let loader = stage.loader;
    stage
        .stream(SourceFile::TitleAkas, loader, &mut tracker, |row, out| {
            extend_with(title_name_attributes(row, ctx), out)
        })
        .await?;
    Ok(tracker.finish())
}

pub async fn load_characters<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("characters");
    let loader = stage.loader;
    stage
        .stream(SourceFile::TitlePrincipals, loader, &mut tracker, |row, out| {
            extend_with(characters(row, ctx), out)
        })
        .await?;
    Ok(tracker.finish())
}

pub async fn load_episodes<S: RowSink>(
    stage: &mut Stage<'_, S>,
    ctx: &RunContext,
) -> Result<PhaseReport> {
    let mut tracker = PhaseTracker::new("episodes");
    let loader = stage.loader;
    stage
        .stream(SourceFile::TitleEpisode, loader, &mut tracker, |row, out| {
            push_with(episode(row, ctx), out)
        })
        .await?;
    Ok(tracker.finish())
}
