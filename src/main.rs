use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ad_events_etl::db::Db;
use ad_events_etl::extract::{self, EventLog};
use ad_events_etl::pipeline::{ad_events, campaigns, users};
use ad_events_etl::transfer::ContainerTransfer;
use ad_events_etl::util::env as env_util;

const SCHEMA_SQL: &str = include_str!("../scripts/schema.sql");

#[derive(Parser, Debug)]
#[command(
    name = "etl",
    version,
    about = "Batch ETL: flat ad-campaign extracts into a normalized MySQL schema"
)]
struct Cli {
    /// Users extract
    #[arg(long, default_value = "data/users.csv")]
    users: PathBuf,
    /// Campaigns extract
    #[arg(long, default_value = "data/campaigns.csv")]
    campaigns: PathBuf,
    /// Event log
    #[arg(long, default_value = "data/ad_events.csv")]
    ad_events: PathBuf,
    /// Rows per chunk for the event log
    #[arg(long, default_value_t = 1_000_000, value_parser = clap::value_parser!(u64).range(1..))]
    chunk_size: u64,
    /// Optional override for the database URL (otherwise DATABASE_URL / DB_* env)
    #[arg(long)]
    db_url: Option<String>,
    /// Override max pool connections (env ETL_MAX_CONNECTIONS, default 5)
    #[arg(long)]
    max_connections: Option<u32>,
    /// Directory for staged chunk files; must be readable by the MySQL
    /// server unless --container is set
    #[arg(long, default_value = "data")]
    staging_dir: PathBuf,
    /// Database container name; staged chunks are shuttled in via `docker cp`
    #[arg(long)]
    container: Option<String>,
    /// In-container directory for shuttled chunks
    #[arg(long, default_value = "/var/lib/mysql-files")]
    container_dir: String,
    /// Truncate all destination tables before loading (recovery path)
    #[arg(long, default_value_t = false)]
    truncate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    ad_events_etl::tracing::init_tracing("info,sqlx=warn")?;
    let cli = Cli::parse();

    let db_url = match cli.db_url {
        Some(v) => v,
        None => env_util::db_url()
            .context("database URL must be set (--db-url, DATABASE_URL or DB_* vars)")?,
    };
    let max_connections = cli
        .max_connections
        .unwrap_or_else(|| env_util::env_parse("ETL_MAX_CONNECTIONS", 5));

    let db = Db::connect(&db_url, max_connections).await?;
    db.run_schema(SCHEMA_SQL).await?;
    if cli.truncate {
        db.truncate_all().await?;
    }

    let transfer = cli
        .container
        .as_ref()
        .map(|c| ContainerTransfer::new(c.clone(), cli.container_dir.clone()));

    info!("extracting users and campaigns CSVs");
    let user_records = extract::read_users(&cli.users)?;
    let campaign_records = extract::read_campaigns(&cli.campaigns)?;
    info!(
        users = user_records.len(),
        campaigns = campaign_records.len(),
        "CSV extracted"
    );

    let user_tables = users::run(&db, &user_records).await?;
    let campaign_tables = campaigns::run(
        &db,
        &campaign_records,
        &user_tables.interests,
        &user_tables.locations,
    )
    .await?;

    let log = EventLog::open(&cli.ad_events, cli.chunk_size as usize)?;
    ad_events::run(
        &db,
        &log,
        &campaign_tables.campaign_ids,
        &cli.staging_dir,
        transfer.as_ref(),
    )
    .await?;

    info!("pipeline finished");
    Ok(())
}
