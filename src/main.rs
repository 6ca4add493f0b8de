use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use racedesk::application::engine::{DEFAULT_MAX_RECEIPT_BYTES, RaceDesk};
use racedesk::config::{DEFAULT_UPLOAD_DIR, Settings};
use racedesk::domain::status::StatusFilter;
use racedesk::interfaces::csv::shipping_writer::ShippingWriter;
use racedesk::interfaces::jsonl::command_reader::CommandReader;
use racedesk::interfaces::jsonl::dispatch::Dispatcher;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true, env = "RACEDESK_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Directory receipt images are written to.
    #[arg(long, global = true, env = "RACEDESK_UPLOAD_DIR", default_value = DEFAULT_UPLOAD_DIR)]
    upload_dir: PathBuf,

    /// Largest accepted receipt, in bytes.
    #[arg(
        long,
        global = true,
        env = "RACEDESK_MAX_RECEIPT_BYTES",
        default_value_t = DEFAULT_MAX_RECEIPT_BYTES
    )]
    max_receipt_bytes: usize,

    /// Log filter, e.g. `info` or `racedesk=debug`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replays lifecycle commands from a JSON-lines file.
    Replay { input: PathBuf },
    /// Lists registrations with their payments, newest first.
    List {
        #[arg(long, default_value = "all")]
        filter: StatusFilter,
    },
    /// Lists payments waiting for an admin decision.
    ReviewQueue,
    /// Exports paid registrations to ship as CSV.
    Shipping,
    /// Prints status counts overall and per event type.
    Stats,
    /// Deletes stored receipts that no payment references.
    PruneReceipts,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            db_path: self.db_path.clone(),
            upload_dir: self.upload_dir.clone(),
            max_receipt_bytes: self.max_receipt_bytes,
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_lines<T: Serialize>(items: &[T]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for item in items {
        serde_json::to_writer(&mut out, item).into_diagnostic()?;
        writeln!(out).into_diagnostic()?;
    }
    Ok(())
}

async fn replay(desk: &RaceDesk, input: &Path) -> Result<()> {
    let file = File::open(input).into_diagnostic()?;
    let base_dir = input.parent().unwrap_or_else(|| Path::new("."));
    let dispatcher = Dispatcher::new(desk, base_dir);

    let stdout = io::stdout();
    for command in CommandReader::new(file).commands() {
        match command {
            Ok(command) => match dispatcher.execute(command).await {
                Ok(outcome) => {
                    let mut out = stdout.lock();
                    serde_json::to_writer(&mut out, &outcome).into_diagnostic()?;
                    writeln!(out).into_diagnostic()?;
                }
                Err(e) => eprintln!("Error processing command: {}", e),
            },
            Err(e) => eprintln!("Error reading command: {}", e),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let desk = cli.settings().build_desk().into_diagnostic()?;

    match &cli.command {
        Command::Replay { input } => replay(&desk, input).await?,
        Command::List { filter } => {
            let rows = desk.list_with_payment(*filter).await.into_diagnostic()?;
            print_lines(&rows)?;
        }
        Command::ReviewQueue => {
            let items = desk.review_queue().await.into_diagnostic()?;
            print_lines(&items)?;
        }
        Command::Shipping => {
            let entries = desk.shipping_list().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = ShippingWriter::new(stdout.lock());
            writer.write_entries(&entries).into_diagnostic()?;
        }
        Command::Stats => {
            let summary = desk.summary().await.into_diagnostic()?;
            print_lines(&[summary])?;
        }
        Command::PruneReceipts => {
            let removed = desk.prune_receipts().await.into_diagnostic()?;
            print_lines(&removed)?;
        }
    }

    Ok(())
}
