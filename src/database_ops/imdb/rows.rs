use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};

use crate::database_ops::dictionary::{CategoryId, Dictionary};
use crate::database_ops::rows::{insert_if_absent, update_from_values, LabelTable, SinkRow};
use crate::normalization::EntityId;

pub enum Professions {}
impl LabelTable for Professions {
    const TABLE: &'static str = "professions";
    const LABEL_COLUMN: &'static str = "label";
}

pub enum Genres {}
impl LabelTable for Genres {
    const TABLE: &'static str = "genres";
    const LABEL_COLUMN: &'static str = "label";
}

pub enum TitleTypes {}
impl LabelTable for TitleTypes {
    const TABLE: &'static str = "title_types";
    const LABEL_COLUMN: &'static str = "label";
}

/// Key of the attribute dictionary: (class, value).
pub type AttributeKey = (String, String);

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRow {
    pub id: CategoryId,
    pub class: String,
    pub label: String,
}

impl AttributeRow {
    pub fn from_dictionary(dict: &Dictionary<AttributeKey>) -> Vec<Self> {
        dict.entries()
            .map(|(id, (class, label))| Self {
                id,
                class: class.clone(),
                label: label.clone(),
            })
            .collect()
    }
}

impl SinkRow for AttributeRow {
    const TABLE: &'static str = "attributes";
    const WIDTH: usize = 3;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(Self::TABLE, "id, class, label", "id", rows, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.class.as_str())
                .push_bind(r.label.as_str());
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonRow {
    pub id: EntityId,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
}

impl PersonRow {
    pub const UNKNOWN_NAME: &'static str = "Unknown";

    /// Placeholder emitted when a person is only referenced by id.
    pub fn stub(id: EntityId) -> Self {
        Self {
            id,
            name: Self::UNKNOWN_NAME.to_string(),
            birth_date: None,
            death_date: None,
        }
    }
}

impl SinkRow for PersonRow {
    const TABLE: &'static str = "persons";
    const WIDTH: usize = 4;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "id, name, birth_date, death_date",
            "id",
            rows,
            |mut b, r| {
                b.push_bind(r.id)
                    .push_bind(r.name.as_str())
                    .push_bind(r.birth_date)
                    .push_bind(r.death_date);
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleRow {
    pub id: EntityId,
    pub title_type_id: CategoryId,
    pub is_adult: bool,
    pub primary_title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub runtime_minutes: Option<i32>,
}

impl TitleRow {
    pub fn stub(id: EntityId, unknown_type: CategoryId) -> Self {
        Self {
            id,
            title_type_id: unknown_type,
            is_adult: false,
            primary_title: None,
            start_date: None,
            end_date: None,
            runtime_minutes: None,
        }
    }
}

impl SinkRow for TitleRow {
    const TABLE: &'static str = "titles";
    const WIDTH: usize = 7;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "id, title_type_id, is_adult, primary_title, start_date, end_date, runtime_minutes",
            "id",
            rows,
            |mut b, r| {
                b.push_bind(r.id)
                    .push_bind(r.title_type_id)
                    .push_bind(r.is_adult)
                    .push_bind(r.primary_title.as_deref())
                    .push_bind(r.start_date)
                    .push_bind(r.end_date)
                    .push_bind(r.runtime_minutes);
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonProfessionRow {
    pub person_id: EntityId,
    pub profession_id: CategoryId,
    pub ordinal: i32,
}

impl SinkRow for PersonProfessionRow {
    const TABLE: &'static str = "person_professions";
    const WIDTH: usize = 3;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "person_id, profession_id, ordinal",
            "person_id, profession_id",
            rows,
            |mut b, r| {
                b.push_bind(r.person_id)
                    .push_bind(r.profession_id)
                    .push_bind(r.ordinal);
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleGenreRow {
    pub title_id: EntityId,
    pub genre_id: CategoryId,
}

impl SinkRow for TitleGenreRow {
    const TABLE: &'static str = "title_genres";
    const WIDTH: usize = 2;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "title_id, genre_id",
            "title_id, genre_id",
            rows,
            |mut b, r| {
                b.push_bind(r.title_id).push_bind(r.genre_id);
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleNameRow {
    pub title_id: EntityId,
    pub ordering: i32,
    pub name: String,
    pub region: String,
    pub language: String,
    pub is_original: bool,
}

impl SinkRow for TitleNameRow {
    const TABLE: &'static str = "title_names";
    const WIDTH: usize = 6;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "title_id, ordering, name, region, language, is_original",
            "title_id, ordering",
            rows,
            |mut b, r| {
                b.push_bind(r.title_id)
                    .push_bind(r.ordering)
                    .push_bind(r.name.as_str())
                    .push_bind(r.region.as_str())
                    .push_bind(r.language.as_str())
                    .push_bind(r.is_original);
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleNameAttributeRow {
    pub title_id: EntityId,
    pub ordering: i32,
    pub attribute_id: CategoryId,
}

impl SinkRow for TitleNameAttributeRow {
    const TABLE: &'static str = "title_name_attributes";
    const WIDTH: usize = 3;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "title_id, ordering, attribute_id",
            "title_id, ordering, attribute_id",
            rows,
            |mut b, r| {
                b.push_bind(r.title_id)
                    .push_bind(r.ordering)
                    .push_bind(r.attribute_id);
            },
        )
    }
}

/// Person-to-title credit. `known_for` is filled later by the update phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditRow {
    pub title_id: EntityId,
    pub ordinal: i32,
    pub person_id: EntityId,
    pub profession_id: CategoryId,
}

impl SinkRow for CreditRow {
    const TABLE: &'static str = "title_credits";
    const WIDTH: usize = 4;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "title_id, ordinal, person_id, profession_id",
            "title_id, ordinal",
            rows,
            |mut b, r| {
                b.push_bind(r.title_id)
                    .push_bind(r.ordinal)
                    .push_bind(r.person_id)
                    .push_bind(r.profession_id);
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterRow {
    pub title_id: EntityId,
    pub person_id: EntityId,
    pub name: String,
}

impl SinkRow for CharacterRow {
    const TABLE: &'static str = "characters";
    const WIDTH: usize = 3;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "title_id, person_id, name",
            "title_id, person_id, name",
            rows,
            |mut b, r| {
                b.push_bind(r.title_id)
                    .push_bind(r.person_id)
                    .push_bind(r.name.as_str());
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRow {
    pub episode_id: EntityId,
    pub series_id: EntityId,
    pub season: Option<i32>,
    pub episode: Option<i32>,
}

impl SinkRow for EpisodeRow {
    const TABLE: &'static str = "episodes";
    const WIDTH: usize = 4;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "episode_id, series_id, season, episode",
            "episode_id",
            rows,
            |mut b, r| {
                b.push_bind(r.episode_id)
                    .push_bind(r.series_id)
                    .push_bind(r.season)
                    .push_bind(r.episode);
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    pub title_id: EntityId,
    pub votes: Option<i64>,
    pub average_rating: Option<f64>,
}

impl SinkRow for RatingUpdate {
    const TABLE: &'static str = "titles.ratings";
    const WIDTH: usize = 3;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        update_from_values(
            "UPDATE titles AS t SET votes = v.votes, average_rating = v.average_rating",
            "title_id, votes, average_rating",
            "t.id = v.title_id",
            rows,
            |mut b, r| {
                b.push_bind(r.title_id)
                    .push_bind(r.votes)
                    .push_bind(r.average_rating);
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownForUpdate {
    pub person_id: EntityId,
    pub title_id: EntityId,
    pub ordinal: i32,
}

impl SinkRow for KnownForUpdate {
    const TABLE: &'static str = "title_credits.known_for";
    const WIDTH: usize = 3;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        update_from_values(
            "UPDATE title_credits AS c SET known_for = v.ordinal",
            "person_id, title_id, ordinal",
            "c.person_id = v.person_id AND c.title_id = v.title_id",
            rows,
            |mut b, r| {
                b.push_bind(r.person_id)
                    .push_bind(r.title_id)
                    .push_bind(r.ordinal);
            },
        )
    }
}
