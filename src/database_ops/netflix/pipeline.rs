use anyhow::Result;
use itertools::Itertools;
use std::path::PathBuf;
use tracing::{debug, instrument};

use super::record::{Catalog, CatalogRecord};
use super::rows::{
    Actors, Categories, Countries, Directors, ShowActors, ShowCategories, ShowCountries,
    ShowDirectors, ShowLink, ShowLinkRow, ShowRatingRow, ShowRow, ShowTypes,
};
use crate::database_ops::batch_loader::BatchLoader;
use crate::database_ops::dictionary::{Dictionary, DictionaryBuilder};
use crate::database_ops::imdb::context::EmittedSet;
use crate::database_ops::phase::{PhaseReport, PhaseTracker, RunSummary};
use crate::database_ops::rows::{LabelRow, LabelTable, SinkRow};
use crate::database_ops::sink::RowSink;

pub const SHOW_TYPES: [(&str, i32); 2] = [("Movie", 1), ("TV Show", 2)];

/// The standard content ratings, pinned to ids 1..=13 in this order.
pub const STANDARD_RATINGS: [(&str, &str); 13] = [
    ("G", "General Audiences"),
    ("PG", "Parental Guidance Suggested"),
    ("PG-13", "Parents Strongly Cautioned"),
    ("R", "Restricted"),
    ("NC-17", "Adults Only"),
    ("TV-Y", "All Children"),
    ("TV-Y7", "Directed to Older Children"),
    ("TV-G", "General Audience"),
    ("TV-PG", "Parental Guidance Suggested"),
    ("TV-14", "Parents Strongly Cautioned"),
    ("TV-MA", "Mature Audience Only"),
    ("NR", "Not Rated"),
    ("UR", "Unrated"),
];

pub fn rating_description(name: &str) -> String {
    STANDARD_RATINGS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, d)| d.to_string())
        .unwrap_or_else(|| format!("Rating {name}"))
}

#[derive(Debug, Clone)]
pub struct NetflixSettings {
    pub csv_path: PathBuf,
    pub batch_size: usize,
}

/// Dictionaries of one catalog import.
#[derive(Debug, Default)]
pub struct CatalogDictionaries {
    pub show_types: Dictionary<String>,
    pub ratings: Dictionary<String>,
    pub categories: Dictionary<String>,
    pub countries: Dictionary<String>,
    pub directors: Dictionary<String>,
    pub actors: Dictionary<String>,
}

impl CatalogDictionaries {
    pub fn build(records: &[CatalogRecord]) -> Self {
        let show_types = SHOW_TYPES
            .iter()
            .fold(DictionaryBuilder::new(), |b, (name, id)| b.pin(name.to_string(), *id));
        let mut ratings = STANDARD_RATINGS
            .iter()
            .zip(1..)
            .fold(DictionaryBuilder::new(), |b, ((name, _), id)| b.pin(name.to_string(), id));
        let mut categories = DictionaryBuilder::new();
        let mut countries = DictionaryBuilder::new();
        let mut directors = DictionaryBuilder::new();
        let mut actors = DictionaryBuilder::new();

        for record in records {
            if let Some(rating) = record.rating() {
                ratings.insert(rating.to_string());
            }
            for (builder, tokens) in [
                (&mut categories, record.categories()),
                (&mut countries, record.countries()),
                (&mut directors, record.directors()),
                (&mut actors, record.actors()),
            ] {
                for (_, token) in tokens {
                    builder.insert(token.to_string());
                }
            }
        }

        Self {
            show_types: show_types.build(),
            ratings: ratings.build(),
            categories: categories.build(),
            countries: countries.build(),
            directors: directors.build(),
            actors: actors.build(),
        }
    }
}

/// Build the show row for a record. `None` when the id or show type is unusable.
pub fn show_row(record: &CatalogRecord, dicts: &CatalogDictionaries) -> Option<ShowRow> {
    let id = record.id()?;
    let show_type_id = dicts.show_types.get(record.show_type()?)?;
    let first = |tokens: Vec<(i32, &str)>, dict: &Dictionary<String>| {
        tokens.first().and_then(|(_, t)| dict.get(*t))
    };
    Some(ShowRow {
        id,
        code: record.code()?.to_string(),
        title: record.title().map(str::to_string),
        show_type_id,
        rating_id: record.rating().and_then(|r| dicts.ratings.get(r)),
        category_id: first(record.categories(), &dicts.categories),
        country_id: first(record.countries(), &dicts.countries),
        director_id: first(record.directors(), &dicts.directors),
        date_added: record.date_added(),
        release_year: record.release_year(),
        duration: record.duration().map(str::to_string),
        description: record.description().map(str::to_string),
    })
}

/// Junction rows for one list column; repeated names keep their first position.
pub fn show_links<T: ShowLink>(
    show_id: i64,
    tokens: Vec<(i32, &str)>,
    dict: &Dictionary<String>,
) -> Vec<ShowLinkRow<T>> {
    tokens
        .into_iter()
        .unique_by(|(_, name)| *name)
        .filter_map(|(ordinal, name)| Some(ShowLinkRow::new(show_id, dict.get(name)?, ordinal)))
        .collect()
}

struct Phase<'a, S> {
    sink: &'a mut S,
    loader: BatchLoader,
    source: &'a str,
    read_error: Option<&'a anyhow::Error>,
    malformed: u64,
}

impl<S: RowSink> Phase<'_, S> {
    async fn write<T: SinkRow>(&mut self, name: &'static str, rows: &[T], dropped: u64) -> Result<PhaseReport> {
        let mut tracker = PhaseTracker::new(name);
        match self.read_error {
            Some(e) => tracker.source_missing(self.source, e),
            None => tracker.source_done(),
        }
        tracker.rows_dropped(dropped);
        tracker.absorb(self.loader.load(&mut *self.sink, rows).await?);
        Ok(tracker.finish())
    }

    async fn labels<T: LabelTable>(&mut self, name: &'static str, dict: &Dictionary<String>) -> Result<PhaseReport> {
        self.write(name, &LabelRow::<T>::from_dictionary(dict), 0).await
    }
}

/// Import the catalog: dictionaries first, then shows, then the junctions.
#[instrument(skip_all, fields(csv = %settings.csv_path.display()))]
pub async fn run<S: RowSink>(settings: &NetflixSettings, sink: &mut S) -> Result<RunSummary> {
    let source = settings.csv_path.display().to_string();
    let (catalog, read_error) = match Catalog::read(&settings.csv_path) {
        Ok(catalog) => (catalog, None),
        Err(e) => (Catalog::default(), Some(e)),
    };
    let dicts = CatalogDictionaries::build(&catalog.records);
    let mut phase = Phase {
        sink,
        loader: BatchLoader::new(settings.batch_size),
        source: &source,
        read_error: read_error.as_ref(),
        malformed: catalog.malformed,
    };
    let mut summary = RunSummary::default();

    summary.push(phase.labels::<ShowTypes>("show_types", &dicts.show_types).await?);
    let ratings = ShowRatingRow::from_dictionary(&dicts.ratings, rating_description);
    summary.push(phase.write("show_ratings", &ratings, 0).await?);
    summary.push(phase.labels::<Categories>("categories", &dicts.categories).await?);
    summary.push(phase.labels::<Countries>("countries", &dicts.countries).await?);
    summary.push(phase.labels::<Directors>("directors", &dicts.directors).await?);
    summary.push(phase.labels::<Actors>("actors", &dicts.actors).await?);

    let mut emitted = EmittedSet::default();
    let mut shows = Vec::new();
    let mut accepted = Vec::new();
    for record in &catalog.records {
        match show_row(record, &dicts) {
            Some(show) => {
                if emitted.insert(show.id) {
                    accepted.push((show.id, record));
                    shows.push(show);
                }
            }
            None => debug!(show_id = ?record.show_id, "dropping catalog record"),
        }
    }
    let dropped = catalog.records.len() as u64 - emitted.len() as u64;
    summary.push(phase.write("shows", &shows, dropped + phase.malformed).await?);

    let actors: Vec<ShowLinkRow<ShowActors>> = accepted
        .iter()
        .flat_map(|(id, r)| show_links(*id, r.actors(), &dicts.actors))
        .collect();
    summary.push(phase.write("show_actors", &actors, 0).await?);
    let categories: Vec<ShowLinkRow<ShowCategories>> = accepted
        .iter()
        .flat_map(|(id, r)| show_links(*id, r.categories(), &dicts.categories))
        .collect();
    summary.push(phase.write("show_categories", &categories, 0).await?);
    let countries: Vec<ShowLinkRow<ShowCountries>> = accepted
        .iter()
        .flat_map(|(id, r)| show_links(*id, r.countries(), &dicts.countries))
        .collect();
    summary.push(phase.write("show_countries", &countries, 0).await?);
    let directors: Vec<ShowLinkRow<ShowDirectors>> = accepted
        .iter()
        .flat_map(|(id, r)| show_links(*id, r.directors(), &dicts.directors))
        .collect();
    summary.push(phase.write("show_directors", &directors, 0).await?);

    summary.log();
    Ok(summary)
}
