use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};
use std::fmt;
use std::marker::PhantomData;

use crate::database_ops::dictionary::{CategoryId, Dictionary};
use crate::database_ops::rows::{insert_if_absent, LabelTable, SinkRow};
use crate::normalization::EntityId;

macro_rules! name_table {
    ($marker:ident, $table:literal) => {
        pub enum $marker {}
        impl LabelTable for $marker {
            const TABLE: &'static str = $table;
            const LABEL_COLUMN: &'static str = "name";
        }
    };
}

name_table!(ShowTypes, "show_types");
name_table!(Categories, "categories");
name_table!(Countries, "countries");
name_table!(Directors, "directors");
name_table!(Actors, "actors");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowRatingRow {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

impl ShowRatingRow {
    pub fn from_dictionary(dict: &Dictionary<String>, describe: impl Fn(&str) -> String) -> Vec<Self> {
        dict.entries()
            .map(|(id, name)| Self {
                id,
                name: name.clone(),
                description: describe(name),
            })
            .collect()
    }
}

impl SinkRow for ShowRatingRow {
    const TABLE: &'static str = "show_ratings";
    const WIDTH: usize = 3;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(Self::TABLE, "id, name, description", "id", rows, |mut b, r| {
            b.push_bind(r.id)
                .push_bind(r.name.as_str())
                .push_bind(r.description.as_str());
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowRow {
    pub id: EntityId,
    pub code: String,
    pub title: Option<String>,
    pub show_type_id: CategoryId,
    pub rating_id: Option<CategoryId>,
    pub category_id: Option<CategoryId>,
    pub country_id: Option<CategoryId>,
    pub director_id: Option<CategoryId>,
    pub date_added: Option<NaiveDate>,
    pub release_year: Option<i32>,
    pub duration: Option<String>,
    pub description: Option<String>,
}

impl SinkRow for ShowRow {
    const TABLE: &'static str = "shows";
    const WIDTH: usize = 12;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            Self::TABLE,
            "id, code, title, show_type_id, rating_id, category_id, country_id, director_id, date_added, release_year, duration, description",
            "id",
            rows,
            |mut b, r| {
                b.push_bind(r.id)
                    .push_bind(r.code.as_str())
                    .push_bind(r.title.as_deref())
                    .push_bind(r.show_type_id)
                    .push_bind(r.rating_id)
                    .push_bind(r.category_id)
                    .push_bind(r.country_id)
                    .push_bind(r.director_id)
                    .push_bind(r.date_added)
                    .push_bind(r.release_year)
                    .push_bind(r.duration.as_deref())
                    .push_bind(r.description.as_deref());
            },
        )
    }
}

/// Marker for a `(show_id, <entity>_id, ordinal)` junction table.
pub trait ShowLink: Send + Sync + 'static {
    const TABLE: &'static str;
    const COLUMN: &'static str;
}

macro_rules! show_link {
    ($marker:ident, $table:literal, $column:literal) => {
        pub enum $marker {}
        impl ShowLink for $marker {
            const TABLE: &'static str = $table;
            const COLUMN: &'static str = $column;
        }
    };
}

show_link!(ShowActors, "show_actors", "actor_id");
show_link!(ShowCategories, "show_categories", "category_id");
show_link!(ShowCountries, "show_countries", "country_id");
show_link!(ShowDirectors, "show_directors", "director_id");

pub struct ShowLinkRow<T: ShowLink> {
    pub show_id: EntityId,
    pub target_id: CategoryId,
    pub ordinal: i32,
    link: PhantomData<T>,
}

impl<T: ShowLink> ShowLinkRow<T> {
    pub fn new(show_id: EntityId, target_id: CategoryId, ordinal: i32) -> Self {
        Self {
            show_id,
            target_id,
            ordinal,
            link: PhantomData,
        }
    }
}

impl<T: ShowLink> fmt::Debug for ShowLinkRow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShowLinkRow")
            .field("table", &T::TABLE)
            .field("show_id", &self.show_id)
            .field("target_id", &self.target_id)
            .field("ordinal", &self.ordinal)
            .finish()
    }
}

impl<T: ShowLink> SinkRow for ShowLinkRow<T> {
    const TABLE: &'static str = T::TABLE;
    const WIDTH: usize = 3;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            T::TABLE,
            &format!("show_id, {}, ordinal", T::COLUMN),
            &format!("show_id, {}", T::COLUMN),
            rows,
            |mut b, r| {
                b.push_bind(r.show_id)
                    .push_bind(r.target_id)
                    .push_bind(r.ordinal);
            },
        )
    }
}
