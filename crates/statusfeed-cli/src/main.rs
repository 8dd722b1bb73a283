use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use statusfeed_client::parser::{DEFAULT_INDICATOR_SELECTOR, DEFAULT_SERVICE_SELECTOR};
use statusfeed_client::{ParserConfig, ReqwestFetcher, SelectorParser};
use statusfeed_core::catalog::CatalogFile;
use statusfeed_core::job::{DEFAULT_STATUS_PAGE_URL, validate_page_url};
use statusfeed_core::lock::{DEFAULT_LOCK_KEY, LeaseConfig, MAX_LOCK_TTL_SECS, ttl_from_secs};
use statusfeed_core::traits::FeedStore;
use statusfeed_core::{JobConfig, ObservationJob, TracingJobReporter};
use statusfeed_db::{DEFAULT_DATABASE_URL, Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "statusfeed", version, about = "Status page to RSS feed")]
struct Cli {
    /// PostgreSQL or SQLite connection string
    #[arg(
        long,
        env = "DATABASE_URL",
        global = true,
        hide_env_values = true,
        default_value = DEFAULT_DATABASE_URL
    )]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one status check now and print the outcome
    Check(CheckArgs),

    /// Print recent feed entries, newest first
    Feed {
        /// Number of entries to show (0 shows all)
        #[arg(short, long, default_value_t = 10)]
        limit: i64,

        /// Print entries as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Insert the services and status kinds of a catalog file
    Seed {
        /// Path to a catalog JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Remove a lock record left behind by a crashed process
    Unlock {
        #[arg(short, long, env = "STATUSFEED_LOCK_KEY", default_value = DEFAULT_LOCK_KEY)]
        key: String,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Status page to observe
    #[arg(long, env = "STATUS_PAGE_URL", default_value = DEFAULT_STATUS_PAGE_URL)]
    url: String,

    /// Name shown in feed entry headings
    #[arg(long, env = "STATUSFEED_SITE_NAME", default_value = "Shopify")]
    site_name: String,

    /// Deadline for fetching and parsing the page, in seconds
    #[arg(long, env = "STATUSFEED_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    #[arg(long, env = "STATUSFEED_LOCK_KEY", default_value = DEFAULT_LOCK_KEY)]
    lock_key: String,

    /// Lease length in seconds (0 never expires, at most one day)
    #[arg(long, env = "STATUSFEED_LOCK_TTL_SECS", default_value_t = 300)]
    lock_ttl_secs: u64,

    #[arg(long, env = "STATUSFEED_SERVICE_SELECTOR", default_value = DEFAULT_SERVICE_SELECTOR)]
    service_selector: String,

    #[arg(long, env = "STATUSFEED_INDICATOR_SELECTOR", default_value = DEFAULT_INDICATOR_SELECTOR)]
    indicator_selector: String,
}

impl CheckArgs {
    fn job_config(&self) -> Result<JobConfig> {
        validate_page_url(&self.url)?;
        anyhow::ensure!(self.timeout_secs > 0, "--timeout-secs must be at least 1");
        anyhow::ensure!(!self.lock_key.trim().is_empty(), "--lock-key must not be empty");

        let ttl = ttl_from_secs(self.lock_ttl_secs).with_context(|| {
            format!("--lock-ttl-secs must be between 0 and {MAX_LOCK_TTL_SECS}")
        })?;

        Ok(JobConfig {
            site_name: self.site_name.clone(),
            lock_key: self.lock_key.clone(),
            lease: LeaseConfig::default().with_ttl(ttl),
            ..JobConfig::default()
        }
        .with_status_page_url(&self.url)
        .with_fetch_timeout(Duration::from_secs(self.timeout_secs)))
    }

    fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            service_selector: self.service_selector.clone(),
            indicator_selector: self.indicator_selector.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("statusfeed=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = connect_db(&cli.database_url).await?;

    match cli.command {
        Commands::Check(args) => cmd_check(&args, &db).await?,
        Commands::Feed { limit, json } => cmd_feed(limit, json, &db).await?,
        Commands::Seed { file } => cmd_seed(&file, &db).await?,
        Commands::Unlock { key } => cmd_unlock(&key, &db).await?,
    }

    Ok(())
}

/// Connect to the database and bring the schema up to date.
async fn connect_db(url: &str) -> Result<Database> {
    let config = DatabaseConfig::new(url)?;

    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;

    Ok(db)
}

async fn cmd_check(args: &CheckArgs, db: &Database) -> Result<()> {
    let config = args.job_config()?;
    let parser = SelectorParser::new(&args.parser_config())?;
    let fetcher = ReqwestFetcher::with_timeout(config.fetch_timeout)?;
    let catalog = db.catalog_repo().load().await?;

    tracing::info!("Checking {}", config.status_page_url);

    let job = ObservationJob::new(
        fetcher,
        parser,
        db.status_repo(),
        db.lock(config.lease.clone()),
        catalog,
        config,
    );

    let outcome = job.run(&TracingJobReporter).await;
    println!("{outcome}");

    if outcome.is_failure() {
        anyhow::bail!("status check failed");
    }
    Ok(())
}

async fn cmd_feed(limit: i64, json: bool, db: &Database) -> Result<()> {
    let entries = db.feed_repo().recent(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("The feed is empty");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "  [{}] {} (#{})",
            entry.published_at.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.title,
            entry.id,
        );
    }

    println!("\nTotal: {} entries", entries.len());

    Ok(())
}

async fn cmd_seed(path: &Path, db: &Database) -> Result<()> {
    let file = CatalogFile::load(path)
        .with_context(|| format!("Failed to load catalog file: {}", path.display()))?;

    let summary = db.catalog_repo().seed(&file).await?;
    println!(
        "Seeded {} new services and {} new status kinds ({} services, {} status kinds in file)",
        summary.services,
        summary.statuses,
        file.services.len(),
        file.statuses.len(),
    );

    Ok(())
}

async fn cmd_unlock(key: &str, db: &Database) -> Result<()> {
    let lock = db.lock(LeaseConfig::default());

    match lock.current(key).await? {
        Some(lease) => {
            lock.force_release(key).await?;
            println!(
                "Released lock '{}' held by {} since {}",
                key,
                lease.holder,
                lease.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"),
            );
        }
        None => println!("Lock '{key}' is not held"),
    }

    Ok(())
}
