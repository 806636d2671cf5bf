use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use permalink_core::Principal;
use permalink_server::access::GrantTable;
use permalink_server::api_key_repository::ApiKeyRepository;
use permalink_server::auth;
use permalink_server::cli::{Cli, Command};
use permalink_server::config::{AppConfig, LogFormat, StorageBackend};
use permalink_server::metrics::Metrics;
use permalink_server::middleware::AuthState;
use permalink_server::rest::{self, AppState};
use permalink_server::service::PermalinkService;
use permalink_server::telemetry::{self, TelemetryGuard};
use permalink_storage::postgres::migrations::run_shared_migrations;
use permalink_storage::{InMemoryStore, KeyValueStore, PostgresStore, run_purge_cycle};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging(config: &AppConfig) -> Result<TelemetryGuard, Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    // OTel layer is typed to bare Registry, so it must be added first.
    // Layer order (bottom to top): Registry → OTel → EnvFilter → fmt
    let registry = tracing_subscriber::registry();

    #[cfg(feature = "telemetry")]
    let otel_provider = telemetry::init_telemetry(&config.tracing)?;

    #[cfg(feature = "telemetry")]
    let otel_layer = otel_provider.as_ref().map(telemetry::make_otel_layer);

    #[cfg(feature = "telemetry")]
    let registry = registry.with(otel_layer);

    let registry = registry.with(filter);

    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json();
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer().pretty();
            registry.with(fmt_layer).init();
        }
    }

    #[cfg(feature = "telemetry")]
    let guard = TelemetryGuard::new(otel_provider);

    #[cfg(not(feature = "telemetry"))]
    let guard = {
        if telemetry::init_telemetry(&config.tracing)?.is_none() && config.tracing.enabled {
            tracing::warn!("tracing.enabled is set but the telemetry feature is not compiled in");
        }
        TelemetryGuard::default()
    };

    if guard.is_enabled() {
        tracing::info!("OpenTelemetry tracing enabled");
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let _telemetry = init_logging(&config)?;

    match cli.command {
        Some(Command::Migrate) => run_migrate(&config).await,
        Some(Command::CreateApiKey { principal, admin }) => {
            run_create_api_key(&config, &principal, admin).await
        }
        Some(Command::PurgeExpired) => run_purge_expired(&config).await,
        Some(Command::Serve) | None => run_serve(config).await,
    }
}

async fn connect_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
}

async fn run_migrate(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("running database migrations");
    let pool = connect_pool(config).await?;
    run_shared_migrations(&pool).await?;
    tracing::info!("migrations completed successfully");
    Ok(())
}

async fn run_create_api_key(
    config: &AppConfig,
    principal: &str,
    admin: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect_pool(config).await?;
    run_shared_migrations(&pool).await?;

    let principal = Principal {
        name: principal.to_string(),
        admin,
    };
    let (full_key, key_id, secret) = auth::generate_api_key();
    let key_hash = auth::hash_secret(&secret)?;

    ApiKeyRepository::new(pool)
        .insert(&key_id, &key_hash, &principal)
        .await?;

    println!("API key created successfully");
    println!("  Principal: {}", principal.name);
    println!("  Admin:     {}", principal.admin);
    println!("  API Key:   {full_key}");
    println!();
    println!("Store this key securely. It will not be shown again.");
    Ok(())
}

async fn run_purge_expired(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.storage.backend != StorageBackend::Postgres {
        tracing::warn!("purge-expired only applies to the postgres backend");
        return Ok(());
    }

    let pool = connect_pool(config).await?;
    let removed = run_purge_cycle(&PostgresStore::new(pool)).await?;
    println!("Purged {removed} expired permalink(s)");
    Ok(())
}

async fn run_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let access = Arc::new(GrantTable::from_config(&config.access)?);

    match config.storage.backend {
        StorageBackend::Memory => {
            let auth = AuthState::dev_mode(config.dev_principal());
            serve(&config, Arc::new(InMemoryStore::new()), access, auth).await
        }
        StorageBackend::Postgres => {
            let pool = connect_pool(&config).await?;
            run_shared_migrations(&pool).await?;

            let auth = if config.auth.require_api_key {
                AuthState::with_repository(Arc::new(ApiKeyRepository::new(pool.clone())))
            } else {
                AuthState::dev_mode(config.dev_principal())
            };
            serve(&config, Arc::new(PostgresStore::new(pool)), access, auth).await
        }
    }
}

async fn serve<S: KeyValueStore + 'static>(
    config: &AppConfig,
    store: Arc<S>,
    access: Arc<GrantTable>,
    auth: AuthState,
) -> Result<(), Box<dyn std::error::Error>> {
    let http_addr: std::net::SocketAddr = config.http_addr().parse()?;
    let settings = config.to_permalink_settings()?;

    tracing::info!(
        %http_addr,
        backend = ?config.storage.backend,
        ttl_seconds = ?config.permalink.ttl_seconds,
        require_api_key = config.auth.require_api_key,
        "starting permalink server"
    );

    let metrics = Arc::new(Metrics::new());
    let purge_enabled = settings.ttl.is_some();
    let service = Arc::new(
        PermalinkService::new(Arc::clone(&store), access, settings)
            .with_metrics(Arc::clone(&metrics)),
    );

    let (shutdown_tx, _) = watch::channel(());

    let purge_task = purge_enabled.then(|| {
        spawn_purge_task(
            store,
            Arc::clone(&metrics),
            config.purge_interval(),
            shutdown_tx.subscribe(),
        )
    });

    let router = rest::create_router(AppState { service, metrics }, auth);

    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!(%http_addr, "REST server listening");

    let server_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await;

    if let Some(task) = purge_task
        && let Err(e) = task.await
    {
        tracing::warn!(error = %e, "purge task ended abnormally");
    }

    if let Err(e) = server_result {
        tracing::error!(error = %e, "REST server error");
        return Err(e.into());
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}

fn spawn_purge_task<S: KeyValueStore + 'static>(
    store: Arc<S>,
    metrics: Arc<Metrics>,
    every: Duration,
    mut shutdown: watch::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => match run_purge_cycle(&*store).await {
                    Ok(removed) => metrics.record_entries_purged(removed),
                    Err(e) => tracing::warn!(error = %e, "purge cycle failed"),
                },
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("purge task stopped");
    })
}

async fn shutdown_signal(shutdown_tx: watch::Sender<()>) {
    let ctrl_c = tokio::signal::ctrl_c();

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => { tracing::info!("received SIGINT"); }
                _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler, using SIGINT only");
            let _ = ctrl_c.await;
            tracing::info!("received SIGINT");
        }
    }

    let _ = shutdown_tx.send(());
}
