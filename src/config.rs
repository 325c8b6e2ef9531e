//! Loader configuration: environment first, then command-line overrides.
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::database_ops::db::ReconnectPolicy;
use crate::database_ops::imdb::ImdbSettings;
use crate::database_ops::netflix::NetflixSettings;
use crate::util::env as env_util;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_ENTITY_BATCH_SIZE: usize = 50_000;
pub const DEFAULT_CHUNK_ROWS: usize = 500_000;

/// Keys logged (redacted) at startup.
pub const ENV_KEYS: [&str; 13] = [
    "DATABASE_URL",
    "IMDB_ETL_DB_URL",
    "IMDB_SOURCE_DIR",
    "NETFLIX_CSV",
    "LOADER_BATCH_SIZE",
    "LOADER_ENTITY_BATCH_SIZE",
    "LOADER_CHUNK_ROWS",
    "LOADER_RECONNECT_ATTEMPTS",
    "LOADER_RECONNECT_BACKOFF_MS",
    "USE_PREPARED",
    "FAST_INGEST",
    "FAST_INGEST_WORK_MEM_MB",
    "RUST_LOG",
];

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Explicit connection string; falls back to the env lookup in `util::env::db_url`.
    pub database_url: Option<String>,
    pub source_dir: PathBuf,
    pub netflix_csv: PathBuf,
    pub batch_size: usize,
    pub entity_batch_size: usize,
    pub chunk_rows: usize,
    pub reconnect: ReconnectPolicy,
    /// Materialize everything into a counting sink instead of the database.
    pub dry_run: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            source_dir: PathBuf::from("."),
            netflix_csv: PathBuf::from("netflix_titles.csv"),
            batch_size: DEFAULT_BATCH_SIZE,
            entity_batch_size: DEFAULT_ENTITY_BATCH_SIZE,
            chunk_rows: DEFAULT_CHUNK_ROWS,
            reconnect: ReconnectPolicy::default(),
            dry_run: false,
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backoff_ms: u64 = env_util::env_parse(
            "LOADER_RECONNECT_BACKOFF_MS",
            defaults.reconnect.backoff.as_millis() as u64,
        );
        Self {
            database_url: None,
            source_dir: env_util::env_opt("IMDB_SOURCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_dir),
            netflix_csv: env_util::env_opt("NETFLIX_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.netflix_csv),
            batch_size: env_util::env_parse("LOADER_BATCH_SIZE", defaults.batch_size),
            entity_batch_size: env_util::env_parse(
                "LOADER_ENTITY_BATCH_SIZE",
                defaults.entity_batch_size,
            ),
            chunk_rows: env_util::env_parse("LOADER_CHUNK_ROWS", defaults.chunk_rows),
            reconnect: ReconnectPolicy {
                attempts: env_util::env_parse(
                    "LOADER_RECONNECT_ATTEMPTS",
                    defaults.reconnect.attempts,
                ),
                backoff: Duration::from_millis(backoff_ms),
            },
            dry_run: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.entity_batch_size == 0 {
            bail!("batch sizes must be positive");
        }
        if self.chunk_rows == 0 {
            bail!("chunk_rows must be positive");
        }
        if self.reconnect.attempts == 0 {
            bail!("LOADER_RECONNECT_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn database_url(&self) -> Result<String> {
        match &self.database_url {
            Some(url) => Ok(url.clone()),
            None => env_util::db_url(),
        }
    }

    pub fn imdb_settings(&self) -> ImdbSettings {
        ImdbSettings {
            source_dir: self.source_dir.clone(),
            batch_size: self.batch_size,
            entity_batch_size: self.entity_batch_size,
            chunk_rows: self.chunk_rows,
        }
    }

    pub fn netflix_settings(&self) -> NetflixSettings {
        NetflixSettings {
            csv_path: self.netflix_csv.clone(),
            batch_size: self.batch_size,
        }
    }
}
