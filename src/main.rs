use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use jqdata_ingest::config::Settings;
use jqdata_ingest::ingest::{IngestConfig, Ingestor, LogProgress, RunReport};
use jqdata_ingest::store::{schema, PgStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jqdata-ingest")]
#[command(about = "Fetch futures listings and bars from JQData into PostgreSQL")]
#[command(version)]
struct Cli {
    /// Settings file (default: ./jqdata.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// End-of-day sync: listing, daily bars and minute bars
    Daily {
        /// Trading day to sync (default: today in the provider time zone)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Full listing plus daily-bar backfill
    Full {
        /// Years of history to cover
        #[arg(long, default_value_t = 5)]
        years: u32,
    },
    /// Print the futures listing without storing it
    List {
        /// Every contract ever listed
        #[arg(long, conflicts_with = "date")]
        all: bool,
        /// Contracts listed on this day (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the remaining provider query quota
    Quota,
    /// Create tables and indexes
    InitDb,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jqdata_ingest=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load_from(cli.config.as_deref()).context("loading settings")?;
    let today = Utc::now()
        .with_timezone(&settings.ingest.provider_time_zone)
        .date_naive();

    match cli.command {
        Command::Daily { date } => {
            let ingestor = ingestor(&settings).await?;
            let report = ingestor.run_daily(date.unwrap_or(today)).await?;
            finish(report)
        }
        Command::Full { years } => {
            let ingestor = ingestor(&settings).await?;
            let report = ingestor.run_full(years, today).await?;
            finish(report)
        }
        Command::List { all, date } => {
            let client = settings.client()?;
            let infos = if all {
                client.securities().all_futures().await?
            } else {
                client.securities().futures_on(date.unwrap_or(today)).await?
            };
            for info in &infos {
                println!(
                    "{}\t{}\t{}\t{}",
                    info.code, info.display_name, info.start_date, info.end_date
                );
            }
            info!(count = infos.len(), "listed");
            Ok(())
        }
        Command::Quota => {
            let count = settings.client()?.query_count().await?;
            println!("{}", count);
            Ok(())
        }
        Command::InitDb => {
            let store = PgStore::connect(settings.require_database()?).await?;
            schema::ensure_schema(store.pool()).await?;
            Ok(())
        }
    }
}

async fn ingestor(settings: &Settings) -> anyhow::Result<Ingestor> {
    let client = settings.client()?;
    let config: IngestConfig = settings.ingest.ingest_config()?;
    let store = PgStore::connect(settings.require_database()?)
        .await
        .context("connecting to postgres")?;
    schema::ensure_schema(store.pool()).await?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    Ok(Ingestor::new(client, Arc::new(store), config)
        .with_progress(Arc::new(LogProgress::new()))
        .with_cancellation(cancel))
}

fn finish(report: RunReport) -> anyhow::Result<()> {
    for failure in &report.failures {
        warn!(stage = failure.stage, item = %failure.item, error = %failure.error, "failed");
    }
    if !report.is_complete() {
        bail!("{} work items failed ({})", report.failures.len(), report);
    }
    info!(%report, "done");
    Ok(())
}
