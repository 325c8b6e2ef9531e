use anyhow::Result;
use serde_json::json;
use std::fmt::Write as _;

use crate::database_ops::db::Db;
use crate::util::env as env_util;

/// Every table the loaders write, in load order.
pub const LOADER_TABLES: [&str; 24] = [
    "professions",
    "genres",
    "title_types",
    "attributes",
    "persons",
    "titles",
    "person_professions",
    "title_genres",
    "title_names",
    "title_name_attributes",
    "title_credits",
    "characters",
    "episodes",
    "show_types",
    "show_ratings",
    "categories",
    "countries",
    "directors",
    "actors",
    "shows",
    "show_actors",
    "show_categories",
    "show_countries",
    "show_directors",
];

/// Rows that should not exist after a clean run; the loader never emits them.
const ORPHAN_CHECKS: [(&str, &str); 4] = [
    (
        "credits_without_person",
        "SELECT count(*) FROM public.title_credits c WHERE NOT EXISTS (SELECT 1 FROM public.persons p WHERE p.id = c.person_id)",
    ),
    (
        "credits_without_title",
        "SELECT count(*) FROM public.title_credits c WHERE NOT EXISTS (SELECT 1 FROM public.titles t WHERE t.id = c.title_id)",
    ),
    (
        "episodes_without_series",
        "SELECT count(*) FROM public.episodes e WHERE NOT EXISTS (SELECT 1 FROM public.titles t WHERE t.id = e.series_id)",
    ),
    (
        "titles_without_type",
        "SELECT count(*) FROM public.titles t WHERE NOT EXISTS (SELECT 1 FROM public.title_types y WHERE y.id = t.title_type_id)",
    ),
];

#[derive(Debug, Clone, Default)]
pub struct DbCountsConfig {
    /// Optional override for the Postgres connection string.
    pub database_url: Option<String>,
    /// Print one JSON object instead of the text table.
    pub json: bool,
}

fn is_undefined_table_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("42P01"),
        _ => false,
    }
}

/// `None` when the table does not exist in this schema.
async fn count(db: &Db, sql: &str) -> Result<Option<i64>> {
    match sqlx::query_scalar::<_, i64>(sql)
        .persistent(false)
        .fetch_one(&db.pool)
        .await
    {
        Ok(val) => Ok(Some(val)),
        Err(e) if is_undefined_table_error(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn run(cfg: DbCountsConfig) -> Result<()> {
    env_util::init_env();
    let database_url = match cfg.database_url.clone() {
        Some(url) => url,
        None => env_util::db_url()?,
    };
    let db = Db::connect(&database_url, 2).await?;

    let mut tables = Vec::with_capacity(LOADER_TABLES.len());
    for table in LOADER_TABLES {
        let n = count(&db, &format!("SELECT count(*) FROM public.{table}")).await?;
        tables.push((table, n));
    }
    let mut orphans = Vec::with_capacity(ORPHAN_CHECKS.len());
    for (name, sql) in ORPHAN_CHECKS {
        orphans.push((name, count(&db, sql).await?));
    }

    if cfg.json {
        let out = json!({
            "tables": tables.iter().map(|(t, n)| (t.to_string(), json!(n))).collect::<serde_json::Map<_, _>>(),
            "orphans": orphans.iter().map(|(t, n)| (t.to_string(), json!(n))).collect::<serde_json::Map<_, _>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mut out = String::new();
    writeln!(out, "Loader table counts:").ok();
    for (table, n) in &tables {
        match n {
            Some(n) => writeln!(out, "  {table:<24}{n:>12}").ok(),
            None => writeln!(out, "  {table:<24}{:>12}", "missing").ok(),
        };
    }
    writeln!(out, "Integrity checks:").ok();
    for (name, n) in &orphans {
        let n = n.map_or_else(|| "n/a".to_string(), |n| n.to_string());
        writeln!(out, "  {name:<24}{n:>12}").ok();
    }
    println!("{out}");
    Ok(())
}
