//! xref CLI - feed a front-end event stream into the cross-reference store

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xref::config::{self, IndexerConfig};
use xref::storage::SqliteStore;
use xref::ui;
use xref::{EventReader, Session, SessionContext, SessionOptions};

#[derive(Parser)]
#[command(name = "xref")]
#[command(version)]
#[command(about = "Symbol resolution and deferred persistence for code indexing")]
#[command(long_about = r#"
xref consumes the declaration/usage events a front-end parser emits (one JSON
object per line) and writes the resolved cross-reference model to SQLite in a
single transaction per session.

Example usage:
  xref init
  xref ingest --events events.jsonl
  xref stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one indexing session over an event stream
    Ingest {
        /// JSON-lines event stream
        #[arg(short, long)]
        events: PathBuf,

        /// Path to the database file (overrides the config)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not record documentation comments
        #[arg(long)]
        skip_doccomment: bool,
    },

    /// Show row counts of the store
    Stats {
        /// Path to the database file (overrides the config)
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Write a default xref.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Ingest {
            events,
            database,
            config,
            skip_doccomment,
        } => run_ingest(&events, database, config.as_deref(), skip_doccomment),
        Commands::Stats { database } => run_stats(database),
        Commands::Init { force } => run_init(force),
    }
}

/// Flag, then config, then the default location under the working directory.
fn resolve_database(flag: Option<PathBuf>, config: Option<&IndexerConfig>) -> PathBuf {
    flag.or_else(|| config.and_then(|c| c.database.as_ref()).map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")))
}

fn run_ingest(
    events: &Path,
    database: Option<PathBuf>,
    config_path: Option<&Path>,
    skip_doccomment: bool,
) -> anyhow::Result<()> {
    let config = config::load_config(config_path)?;
    let database = resolve_database(database, config.as_ref());
    let options = SessionOptions {
        skip_doccomment: skip_doccomment || config.as_ref().is_some_and(|c| c.skip_doccomment),
    };

    // Anything that fails here aborts before a single event is read
    let reader = EventReader::open(events)?;
    config::ensure_db_dir(&database)?;
    let store = SqliteStore::open(&database)?;

    ui::header("Indexing session");
    ui::info("Events", &events.display().to_string());
    ui::info("Database", &database.display().to_string());

    let started = Instant::now();
    let mut session = Session::new(SessionContext::new(store), options);
    let spinner = ui::Spinner::new("Ingesting events");
    session.ingest_all(reader);
    spinner.set_message("Flushing session");

    let report = match session.finalize_session() {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_and_clear();
            ui::error("Flush failed, nothing from this session was written");
            return Err(e.into());
        }
    };
    spinner.finish_and_clear();

    ui::finish_with_summary(started.elapsed(), &report);
    ui::section("Ingest");
    println!("{}", ui::counts_table(&report.ingest.rows()));
    ui::section("Flush");
    println!(
        "{}",
        ui::counts_table(&[
            ("AST nodes", report.pending.ast_nodes),
            ("Entities", report.pending.entities),
            ("Relations", report.pending.relations),
            ("Rows written", report.batch.written),
            ("Conflicts skipped", report.batch.conflicts),
        ])
    );

    if report.ingest.skipped_records > 0 || report.ingest.malformed_events > 0 {
        ui::warn(&format!(
            "{} records skipped, {} malformed events (run with --verbose for details)",
            report.ingest.skipped_records, report.ingest.malformed_events
        ));
    }
    Ok(())
}

fn run_stats(database: Option<PathBuf>) -> anyhow::Result<()> {
    let config = config::load_config(None)?;
    let database = resolve_database(database, config.as_ref());
    if !database.exists() {
        anyhow::bail!("no database at {} (run `xref ingest` first)", database.display());
    }

    let store = SqliteStore::open(&database)?;
    let stats = store.stats()?;

    println!("{} xref statistics {}", ui::Icons::STATS, ui::dim(&database.display().to_string()));
    println!("{}", ui::counts_table(&stats.tables));
    Ok(())
}

fn run_init(force: bool) -> anyhow::Result<()> {
    let path = config::default_config_path();
    let database = config::default_database_path_in(Path::new("."));
    let config = IndexerConfig {
        database: Some(database.display().to_string()),
        skip_doccomment: false,
    };

    config::write_config(&path, &config, force)?;
    config::ensure_gitignore(Path::new("."))?;
    ui::success(&format!("Wrote {}", path.display()));
    ui::info("Database", &database.display().to_string());
    Ok(())
}
