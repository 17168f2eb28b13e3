use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use modkit::{serve, shutdown_token, with_standard_layers, HttpOptions};
use modkit_db::DbHandle;
use runtime::{AppConfig, CliArgs};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use store::auth::JwtKeys;
use store::domain::ports::FruitListCache;
use store::infra::cache::{DisabledFruitCache, RedisFruitCache};
use store::infra::publisher::AmqpUserEventPublisher;
use store::infra::relay::OutboxRelay;
use store::infra::storage::{PgFruitRepository, PgOutboxStore, PgUsersRepository};
use store::{Store, StoreConfig, StoreDeps};

/// Fruit store API: fruit catalogue, users and the user-event relay
#[derive(Parser)]
#[command(name = "fruitstore-api")]
#[command(about = "Fruit store API: fruit catalogue, users and the user-event relay")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

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
    /// Start the HTTP server (and the outbox relay unless disabled)
    Run,
    /// Drain the user outbox into the broker without serving HTTP
    Relay,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("fruitstore-api starting");

    if cli.print_config {
        println!("{}", config.redacted().to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Relay => run_relay(config).await,
        Commands::Check => check_config(&config),
    }
}

fn jwt_keys(config: &AppConfig) -> Result<JwtKeys> {
    let auth = config
        .auth
        .as_ref()
        .context("auth section is required (set JWT_SECRET or auth.jwt_secret)")?;
    Ok(JwtKeys::new(auth.jwt_secret.as_bytes(), auth.token_ttl)?)
}

async fn connect_db(config: &AppConfig) -> Result<DbHandle> {
    let db = config
        .database
        .as_ref()
        .context("database section is required (set DATABASE_URL or database.url)")?;
    let handle = DbHandle::connect(&db.url, db.connect_opts())
        .await
        .context("failed to connect to postgres")?;
    tracing::info!(dsn = %handle.redacted_dsn(), "connected to postgres");
    Ok(handle)
}

async fn connect_cache(config: &AppConfig, store_cfg: &StoreConfig) -> Result<Arc<dyn FruitListCache>> {
    match &config.cache {
        Some(cache) => {
            let cache = RedisFruitCache::connect(
                &cache.connection_url(),
                store_cfg.list_cache_key.clone(),
                store_cfg.list_cache_ttl,
            )
            .await
            .context("failed to connect to redis")?;
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!("no cache configured, fruit listing is served from postgres");
            Ok(Arc::new(DisabledFruitCache))
        }
    }
}

/// Broker connection plus the relay publishing through it.
/// The connection is returned so it outlives the relay loop.
async fn build_relay(
    config: &AppConfig,
    pool: PgPool,
    store_cfg: &StoreConfig,
) -> Result<(modkit_amqp::Connection, OutboxRelay)> {
    let queue_cfg = config
        .queue
        .as_ref()
        .context("queue section is required for the outbox relay (set RABBITMQ_URL or queue.url)")?;
    let queue = queue_cfg
        .queue
        .clone()
        .unwrap_or_else(|| user_events::USER_QUEUE.to_string());

    let conn = modkit_amqp::connect(&queue_cfg.url)
        .await
        .context("failed to connect to rabbitmq")?;
    tracing::info!(broker = %modkit_amqp::describe_url(&queue_cfg.url), queue = %queue, "connected to rabbitmq");
    let publisher = AmqpUserEventPublisher::open(&conn, &queue).await?;

    let relay = OutboxRelay::from_config(
        Arc::new(PgOutboxStore::new(pool)),
        Arc::new(publisher),
        &store_cfg.outbox,
    );
    Ok((conn, relay))
}

async fn bind_addr(config: &AppConfig) -> Result<SocketAddr> {
    let host = config.server.host.as_str();
    tokio::net::lookup_host((host, config.server.port))
        .await
        .with_context(|| format!("cannot resolve server.host '{host}'"))?
        .next()
        .with_context(|| format!("server.host '{host}' resolved to no address"))
}

async fn run_server(config: AppConfig) -> Result<()> {
    let store_cfg: StoreConfig = config.module_config("store")?;
    let keys = jwt_keys(&config)?;
    let db = connect_db(&config).await?;
    let pool = db.pool().clone();
    let cache = connect_cache(&config, &store_cfg).await?;

    let store = Store::new(
        StoreDeps {
            fruits: Arc::new(PgFruitRepository::new(pool.clone())),
            users: Arc::new(PgUsersRepository::new(pool.clone())),
            cache,
            keys,
        },
        &store_cfg,
    );

    let cancel = shutdown_token();

    let relay_task = if store_cfg.outbox.relay_enabled {
        let (conn, relay) = build_relay(&config, pool, &store_cfg).await?;
        let token = cancel.child_token();
        Some(tokio::spawn(async move {
            relay.run(token).await;
            drop(conn);
        }))
    } else {
        tracing::warn!("outbox relay disabled; run `fruitstore-api relay` separately");
        None
    };

    let addr = bind_addr(&config).await?;
    let opts = HttpOptions::default().with_timeout_secs(config.server.timeout_sec);
    let served = serve(with_standard_layers(store.router(), &opts), addr, cancel.clone()).await;

    // A bind or serve failure must also stop the relay.
    cancel.cancel();
    if let Some(task) = relay_task {
        task.await.context("outbox relay task panicked")?;
    }
    db.close().await;
    served
}

async fn run_relay(config: AppConfig) -> Result<()> {
    let store_cfg: StoreConfig = config.module_config("store")?;
    let db = connect_db(&config).await?;
    let (conn, relay) = build_relay(&config, db.pool().clone(), &store_cfg).await?;

    relay.run(shutdown_token()).await;

    drop(conn);
    db.close().await;
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    let db = config
        .database
        .as_ref()
        .context("database section is required (set DATABASE_URL or database.url)")?;
    DbHandle::detect(&db.url)?;
    jwt_keys(config)?;
    let store_cfg: StoreConfig = config.module_config("store")?;
    if store_cfg.outbox.relay_enabled && config.queue.is_none() {
        bail!("queue section is required while modules.store.outbox.relay_enabled is true");
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.redacted().to_yaml()?);
    Ok(())
}
