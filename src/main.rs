//! relay-billing server binary.
//!
//! Loads configuration, connects to Postgres, starts the whitelist sweeper
//! and serves the HTTP API until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use relay_billing::adapters::auth::JwtTokenValidator;
use relay_billing::adapters::epay::EpayGateway;
use relay_billing::adapters::http::{api_router, ApiDependencies};
use relay_billing::adapters::postgres::{self, PostgresBillingStore, PostgresDeviceDirectory};
use relay_billing::adapters::relay::{InMemoryRelayWhitelist, WhitelistSweeper};
use relay_billing::adapters::settings::PostgresPaymentSettings;
use relay_billing::config::AppConfig;
use relay_billing::ports::RelayWhitelist;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        payment_enabled = config.payment.enabled,
        "Configuration loaded"
    );

    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let whitelist: Arc<dyn RelayWhitelist> = Arc::new(InMemoryRelayWhitelist::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = WhitelistSweeper::new(whitelist.clone())
        .with_interval(config.relay.sweep_interval())
        .spawn(shutdown_rx);

    let deps = ApiDependencies {
        store: Arc::new(
            PostgresBillingStore::new(pool.clone()).with_lock_timeout(config.database.lock_timeout()),
        ),
        settings: Arc::new(PostgresPaymentSettings::new(
            pool.clone(),
            config.payment.to_settings(),
        )),
        gateway: Arc::new(EpayGateway::new()),
        whitelist,
        limits: config.relay.limits(),
        tokens: Arc::new(JwtTokenValidator::new(&config.auth.jwt_secret())),
        devices: Arc::new(PostgresDeviceDirectory::new(pool.clone())),
        internal_key: config.auth.internal_api_key(),
        request_timeout: config.server.request_timeout(),
    };
    if deps.internal_key.is_none() {
        tracing::warn!("No internal API key configured; internal API is loopback-only");
    }

    let app = api_router(deps);
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Whitelist sweeper ended abnormally");
    }
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
