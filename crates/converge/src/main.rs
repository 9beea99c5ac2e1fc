//! converge CLI
//!
//! Command-line tool that converges a PostgreSQL schema toward a model file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use converge::config::load_model;
use converge::prelude::*;

/// Converges a live PostgreSQL schema toward a declared structure model.
#[derive(Parser)]
#[command(name = "converge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL")]
    database: String,

    /// Schema to reconcile.
    #[arg(short, long, default_value = "public")]
    schema: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ModelArgs {
    /// Structure model file (JSON).
    #[arg(short, long)]
    model: PathBuf,

    /// Drop indexes the model does not declare.
    #[arg(long)]
    drop_unused_indexes: bool,

    /// Leave foreign keys alone.
    #[arg(long)]
    no_foreign_keys: bool,
}

impl ModelArgs {
    fn options(&self) -> ReconcileOptions {
        ReconcileOptions::new()
            .drop_unused_indexes(self.drop_unused_indexes)
            .foreign_keys(!self.no_foreign_keys)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the SQL a reconciliation would run, without executing it.
    Plan(ModelArgs),

    /// Reconcile the live schema with the model.
    Apply(ModelArgs),

    /// Print the live schema snapshot as JSON.
    Inspect,
}

/// Progress sink that logs the phase text.
#[derive(Default)]
struct LogProgress {
    max: usize,
    done: usize,
}

impl Progress for LogProgress {
    fn set_phase_text(&mut self, text: &str) {
        info!(step = self.done + 1, of = self.max, "{text}");
    }

    fn set_percent_max(&mut self, max: usize) {
        self.max = max;
    }

    fn inc_percent(&mut self) {
        self.done += 1;
    }
}

fn print_diagnostics(result: &ReconciliationResult) {
    for diagnostic in &result.diagnostics {
        println!("{diagnostic}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let db = Database::connect(&cli.database)
        .await?
        .with_schema(cli.schema);

    match cli.command {
        Commands::Plan(args) => {
            let model = load_model(&args.model)?;
            let mut session = db.session().await?;
            let result = session
                .reconcile(&model, args.options(), true, &mut NoProgress)
                .await?;

            if result.statements.is_empty() {
                info!("Schema is up to date.");
            }
            for sql in &result.statements {
                println!("{sql};");
            }
            print_diagnostics(&result);
        }

        Commands::Apply(args) => {
            let model = load_model(&args.model)?;
            let mut session = db.session().await?;
            let mut progress = LogProgress::default();
            let result = session
                .reconcile(&model, args.options(), false, &mut progress)
                .await?;

            print_diagnostics(&result);
            if result.modified {
                info!(statements = result.statements.len(), "Schema updated.");
            } else {
                info!("Schema is up to date.");
            }
            if result.diagnostics.has_errors() {
                anyhow::bail!("reconciliation left unresolved errors");
            }
        }

        Commands::Inspect => {
            let snapshot = db.snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}
