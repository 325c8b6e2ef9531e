use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder};
use std::fmt;
use std::marker::PhantomData;

use super::dictionary::{CategoryId, Dictionary};

/// PostgreSQL caps a single statement at 65535 bind parameters.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// A row type the batch loader can write. Each type knows its target table and
/// how to render a bulk statement for a slice of rows.
pub trait SinkRow: fmt::Debug + Send + Sync {
    /// Name rows are reported under. Inserts use the table name; updates use
    /// `<table>.<column>` so they are never counted as new rows.
    const TABLE: &'static str;
    /// Bound parameters per row.
    const WIDTH: usize;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres>
    where
        Self: Sized;

    fn max_rows_per_statement() -> usize
    where
        Self: Sized,
    {
        (MAX_BIND_PARAMS / Self::WIDTH).max(1)
    }
}

/// `INSERT ... VALUES ... ON CONFLICT (<key>) DO NOTHING`.
pub fn insert_if_absent<'a, R, F>(
    table: &str,
    columns: &str,
    conflict: &str,
    rows: &'a [R],
    bind: F,
) -> QueryBuilder<'a, Postgres>
where
    F: FnMut(Separated<'_, 'a, Postgres, &'static str>, &'a R),
{
    let mut qb: QueryBuilder<'a, Postgres> =
        QueryBuilder::new(format!("INSERT INTO {table} ({columns}) "));
    qb.push_values(rows, bind);
    qb.push(format!(" ON CONFLICT ({conflict}) DO NOTHING"));
    qb
}

/// `UPDATE <target> SET ... FROM (VALUES ...) AS v(<columns>) WHERE ...`.
pub fn update_from_values<'a, R, F>(
    head: &str,
    alias_columns: &str,
    predicate: &str,
    rows: &'a [R],
    bind: F,
) -> QueryBuilder<'a, Postgres>
where
    F: FnMut(Separated<'_, 'a, Postgres, &'static str>, &'a R),
{
    let mut qb: QueryBuilder<'a, Postgres> = QueryBuilder::new(format!("{head} FROM ("));
    qb.push_values(rows, bind);
    qb.push(format!(") AS v({alias_columns}) WHERE {predicate}"));
    qb
}

/// Marker for a two-column `(id, label)` category table.
pub trait LabelTable: Send + Sync + 'static {
    const TABLE: &'static str;
    const LABEL_COLUMN: &'static str;
}

pub struct LabelRow<T: LabelTable> {
    pub id: CategoryId,
    pub label: String,
    table: PhantomData<T>,
}

impl<T: LabelTable> LabelRow<T> {
    pub fn new(id: CategoryId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            table: PhantomData,
        }
    }

    pub fn from_dictionary(dict: &Dictionary<String>) -> Vec<Self> {
        dict.entries().map(|(id, label)| Self::new(id, label.as_str())).collect()
    }
}

impl<T: LabelTable> fmt::Debug for LabelRow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelRow")
            .field("table", &T::TABLE)
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

impl<T: LabelTable> SinkRow for LabelRow<T> {
    const TABLE: &'static str = T::TABLE;
    const WIDTH: usize = 2;

    fn statement(rows: &[Self]) -> QueryBuilder<'_, Postgres> {
        insert_if_absent(
            T::TABLE,
            &format!("id, {}", T::LABEL_COLUMN),
            "id",
            rows,
            |mut b, r| {
                b.push_bind(r.id).push_bind(r.label.as_str());
            },
        )
    }
}
