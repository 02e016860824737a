use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quirofano_api::{build_router, AppState};
use quirofano_auth::{BcryptHasher, JwtConfig, JwtProvider, PasswordHasher};
use quirofano_core::{AppConfig, AppConfigTrait, StoreBackend};
use quirofano_http::{init_logging, log_startup_info, LoggingConfig};
use quirofano_orm::seeding::ADMIN_PASSWORD;
use quirofano_orm::{
    create_database_pool, MemoryStore, MigrationRunner, PostgresStore, SeederManager, Store,
};
use sqlx::PgPool;

#[derive(Debug, Parser)]
#[command(name = "quirofano-api", version, about = "Operating-room management REST API")]
struct Cli {
    /// Serve from the seeded in-memory store instead of PostgreSQL
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations, then serve (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Insert the base roles and the administrator account
    Seed,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("failed to load configuration")?;
    if cli.memory {
        config.database.backend = StoreBackend::Memory;
    }
    config.validate().context("invalid configuration")?;

    init_logging(LoggingConfig::from_settings(
        &config.logging.level,
        &config.logging.format,
    ))
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()
        .context("failed to build the tokio runtime")?
        .block_on(run(cli.command.unwrap_or(Command::Serve), config))
}

async fn run(command: Command, config: AppConfig) -> Result<()> {
    match (command, config.database.backend) {
        (Command::Serve, StoreBackend::Memory) => {
            let store = Arc::new(MemoryStore::new());
            seed(store.as_ref()).await?;
            serve(&config, store).await
        }
        (Command::Serve, StoreBackend::Postgres) => {
            let pool = connect(&config).await?;
            migrate(&pool).await?;
            let store = Arc::new(PostgresStore::new(pool));
            seed(store.as_ref()).await?;
            serve(&config, store).await
        }
        (Command::Migrate, StoreBackend::Postgres) => migrate(&connect(&config).await?).await,
        (Command::Seed, StoreBackend::Postgres) => {
            let store = PostgresStore::new(connect(&config).await?);
            seed(&store).await
        }
        (_, StoreBackend::Memory) => {
            anyhow::bail!("the in-memory store only supports `serve`")
        }
    }
}

async fn connect(config: &AppConfig) -> Result<PgPool> {
    tracing::info!(
        url = config.database.redacted_url().as_deref().unwrap_or("<unset>"),
        "Connecting to PostgreSQL"
    );
    create_database_pool(&config.database)
        .await
        .context("failed to connect to the database")
}

async fn migrate(pool: &PgPool) -> Result<()> {
    let result = MigrationRunner::new(pool.clone())
        .run_migrations()
        .await
        .context("failed to run migrations")?;
    tracing::info!(
        applied = result.applied_count,
        skipped = result.skipped_count,
        elapsed_ms = result.execution_time_ms,
        "Migrations complete"
    );
    Ok(())
}

async fn seed(store: &dyn Store) -> Result<()> {
    let hash = tokio::task::spawn_blocking(|| BcryptHasher::production().hash_password(ADMIN_PASSWORD))
        .await
        .context("password hashing task failed")?
        .context("failed to hash the administrator password")?;
    SeederManager::initial_data(hash)
        .run(store)
        .await
        .context("failed to seed initial data")
}

async fn serve(config: &AppConfig, store: Arc<dyn Store>) -> Result<()> {
    let jwt = JwtProvider::new(&JwtConfig::new(
        config.jwt_secret(),
        config.auth.jwt_expires_in_hours,
    ))
    .context("invalid token configuration")?;
    let state = AppState::new(store, jwt, Arc::new(BcryptHasher::production()));
    let app = build_router(state, Duration::from_secs(config.server.request_timeout_secs));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    log_startup_info(
        &config.name,
        quirofano_core::version(),
        config.environment.as_str(),
        &address,
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
