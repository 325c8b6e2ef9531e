use anyhow::{Context, Result};
use tracing::info;

use crate::config::LoaderConfig;
use crate::database_ops::db::Db;
use crate::database_ops::phase::RunSummary;
use crate::database_ops::sink::DryRunSink;
use crate::database_ops::{imdb, netflix};

/// The batch loader writes through a single session so batches commit in order.
const LOADER_CONNECTIONS: u32 = 1;

async fn connect(cfg: &LoaderConfig) -> Result<Db> {
    let url = cfg.database_url()?;
    Db::connect_with_policy(&url, LOADER_CONNECTIONS, cfg.reconnect)
        .await
        .context("connect loader session")
}

fn report_dry_run(sink: &DryRunSink) {
    for (table, rows) in sink.tables() {
        info!(table, rows, "dry-run rows");
    }
    info!(batches = sink.batches(), "dry-run finished; nothing was written");
}

pub async fn run_imdb(cfg: LoaderConfig) -> Result<RunSummary> {
    cfg.validate()?;
    let settings = cfg.imdb_settings();
    if cfg.dry_run {
        let mut sink = DryRunSink::new();
        let summary = imdb::run(&settings, &mut sink).await?;
        report_dry_run(&sink);
        return Ok(summary);
    }
    let mut db = connect(&cfg).await?;
    imdb::run(&settings, &mut db).await
}

pub async fn run_netflix(cfg: LoaderConfig) -> Result<RunSummary> {
    cfg.validate()?;
    let settings = cfg.netflix_settings();
    if cfg.dry_run {
        let mut sink = DryRunSink::new();
        let summary = netflix::run(&settings, &mut sink).await?;
        report_dry_run(&sink);
        return Ok(summary);
    }
    let mut db = connect(&cfg).await?;
    netflix::run(&settings, &mut db).await
}
