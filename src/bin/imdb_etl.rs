use anyhow::Result;
use clap::{Parser, Subcommand};
use imdb_etl::cli::convert::{self, ConvertConfig};
use imdb_etl::cli::db_counts::{self, DbCountsConfig};
use imdb_etl::cli::load;
use imdb_etl::config::{LoaderConfig, ENV_KEYS};
use imdb_etl::database_ops::phase::RunSummary;
use imdb_etl::logging::{init_tracing, DEFAULT_FILTER};
use imdb_etl::util::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "imdb-etl", version, about = "IMDB and Netflix catalog loader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Default)]
struct LoadArgs {
    /// Optional override for the database URL
    #[arg(long)]
    db_url: Option<String>,
    /// Rows per insert statement for junctions and dictionaries (default: LOADER_BATCH_SIZE or 10000)
    #[arg(long)]
    batch_size: Option<usize>,
    /// Materialize every phase without touching the database
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Load the IMDB TSV dumps
    Imdb {
        /// Directory holding name.basics.tsv, title.basics.tsv, ... (default: IMDB_SOURCE_DIR)
        #[arg(long)]
        source_dir: Option<PathBuf>,
        #[command(flatten)]
        load: LoadArgs,
        /// Rows per insert statement for persons and titles (default: LOADER_ENTITY_BATCH_SIZE or 50000)
        #[arg(long)]
        entity_batch_size: Option<usize>,
        /// Source rows buffered before flushing to the loader (default: LOADER_CHUNK_ROWS or 500000)
        #[arg(long)]
        chunk_rows: Option<usize>,
    },
    /// Load the Netflix catalog CSV
    Netflix {
        /// Catalog export (default: NETFLIX_CSV)
        #[arg(long)]
        csv: Option<PathBuf>,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Convert a TSV dump into CSV
    Convert {
        input: PathBuf,
        output: Option<PathBuf>,
    },
    /// Print row counts for every loader table
    DbCounts {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
        /// Emit JSON instead of a text table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn loader_config(load: LoadArgs) -> LoaderConfig {
    let mut cfg = LoaderConfig::from_env();
    if load.db_url.is_some() {
        cfg.database_url = load.db_url;
    }
    if let Some(n) = load.batch_size {
        cfg.batch_size = n;
    }
    cfg.dry_run = load.dry_run;
    cfg
}

fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.is_complete() {
        ExitCode::SUCCESS
    } else {
        for p in summary.degraded() {
            warn!(phase = p.phase, outcome = %p.outcome, "degraded phase");
        }
        ExitCode::from(2)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    env::init_env();
    init_tracing(DEFAULT_FILTER)?;
    env::log_snapshot("imdb-etl", &ENV_KEYS);

    let cli = Cli::parse();

    match cli.command {
        Commands::Imdb {
            source_dir,
            load,
            entity_batch_size,
            chunk_rows,
        } => {
            let mut cfg = loader_config(load);
            if let Some(dir) = source_dir {
                cfg.source_dir = dir;
            }
            if let Some(n) = entity_batch_size {
                cfg.entity_batch_size = n;
            }
            if let Some(n) = chunk_rows {
                cfg.chunk_rows = n;
            }
            info!(source_dir = %cfg.source_dir.display(), dry_run = cfg.dry_run, "imdb: starting");
            let summary = load::run_imdb(cfg).await?;
            Ok(exit_code(&summary))
        }
        Commands::Netflix { csv, load } => {
            let mut cfg = loader_config(load);
            if let Some(path) = csv {
                cfg.netflix_csv = path;
            }
            info!(csv = %cfg.netflix_csv.display(), dry_run = cfg.dry_run, "netflix: starting");
            let summary = load::run_netflix(cfg).await?;
            Ok(exit_code(&summary))
        }
        Commands::Convert { input, output } => {
            let report = convert::run(ConvertConfig { input, output })?;
            println!(
                "{} rows, {} columns -> {}",
                report.rows,
                report.columns,
                report.output.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        Commands::DbCounts { db_url, json } => {
            db_counts::run(DbCountsConfig {
                database_url: db_url,
                json,
            })
            .await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
