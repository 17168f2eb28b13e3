use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modkit::shutdown_token;
use modkit_db::DbHandle;
use runtime::{AppConfig, CliArgs, QueueConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use user_replica::{run_consumer, EventProcessor, PgReplicaUsersRepository, ReplicaConfig};

/// User service worker: mirrors user events into its own store
#[derive(Parser)]
#[command(name = "user-service")]
#[command(about = "User service worker: mirrors user events into its own store")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print current configuration (secrets masked) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume user events until interrupted
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: None,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("user-service starting");

    if cli.print_config {
        println!("{}", config.redacted().to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_worker(config).await,
        Commands::Check => check_config(&config),
    }
}

fn queue_config(config: &AppConfig) -> Result<&QueueConfig> {
    config
        .queue
        .as_ref()
        .context("queue section is required (set RABBITMQ_URL or queue.url)")
}

fn queue_name(queue: &QueueConfig) -> String {
    queue
        .queue
        .clone()
        .unwrap_or_else(|| user_events::USER_QUEUE.to_string())
}

async fn run_worker(config: AppConfig) -> Result<()> {
    let replica_cfg: ReplicaConfig = config.module_config("user_replica")?;
    let queue_cfg = queue_config(&config)?;
    let queue = queue_name(queue_cfg);

    let db_cfg = config
        .database
        .as_ref()
        .context("database section is required (set DATABASE_URL or database.url)")?;
    let db = DbHandle::connect(&db_cfg.url, db_cfg.connect_opts())
        .await
        .context("failed to connect to postgres")?;
    tracing::info!(dsn = %db.redacted_dsn(), "connected to postgres");

    let conn = modkit_amqp::connect(&queue_cfg.url)
        .await
        .context("failed to connect to rabbitmq")?;
    tracing::info!(broker = %modkit_amqp::describe_url(&queue_cfg.url), queue = %queue, "connected to rabbitmq");
    let consumer = modkit_amqp::open_consumer(
        &conn,
        &queue,
        queue_cfg.prefetch,
        &replica_cfg.consumer_tag,
    )
    .await?;

    let processor = EventProcessor::new(Arc::new(PgReplicaUsersRepository::new(
        db.pool().clone(),
    )));
    let result = run_consumer(
        modkit_amqp::deliveries(consumer),
        &processor,
        shutdown_token(),
    )
    .await;

    if let Err(e) = conn.close(0, "user-service shutting down").await {
        tracing::warn!(error = %e, "broker connection did not close cleanly");
    }
    db.close().await;

    let stats = result?;
    tracing::info!(acked = stats.acked, requeued = stats.requeued, "user-service stopped");
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let db = config
        .database
        .as_ref()
        .context("database section is required (set DATABASE_URL or database.url)")?;
    DbHandle::detect(&db.url)?;
    queue_config(config)?;
    let _: ReplicaConfig = config.module_config("user_replica")?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.redacted().to_yaml()?);
    Ok(())
}
