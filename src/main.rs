use eventhub_settlement::api::{router, AppState};
use eventhub_settlement::config::AppConfig;
use eventhub_settlement::database::memory::{InMemoryOrderStore, InMemoryTransactionLedger};
use eventhub_settlement::database::repository::{OrderStore, TransactionLedger};
use eventhub_settlement::health::HealthChecker;
use eventhub_settlement::logging::init_tracing;
use eventhub_settlement::middleware::auth::HttpSessionVerifier;
use eventhub_settlement::payments::PaystackGateway;
use eventhub_settlement::settlement::SettlementService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

type Stores = (Arc<dyn OrderStore>, Arc<dyn TransactionLedger>, HealthChecker);

fn in_memory_stores() -> Stores {
    (
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(InMemoryTransactionLedger::new()),
        HealthChecker::in_memory(),
    )
}

#[cfg(feature = "database")]
async fn postgres_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    use eventhub_settlement::database::init_pool_from_config;
    use eventhub_settlement::database::order_repository::PgOrderRepository;
    use eventhub_settlement::database::transaction_repository::PgTransactionLedger;

    info!("Initializing database connection pool...");
    let pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e.to_string())
    })?;
    info!(
        max_connections = pool.options().get_max_connections(),
        "Database connection pool initialized"
    );

    Ok((
        Arc::new(PgOrderRepository::new(pool.clone())),
        Arc::new(PgTransactionLedger::new(pool.clone())),
        HealthChecker::new(Some(pool)),
    ))
}

#[cfg(not(feature = "database"))]
async fn postgres_stores(_config: &AppConfig) -> anyhow::Result<Stores> {
    warn!("Built without the database feature; using in-memory stores");
    Ok(in_memory_stores())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        currency = %config.settlement.currency,
        "Starting settlement service"
    );

    if config.settlement.allow_unsigned_webhooks {
        warn!("PAYSTACK_ALLOW_UNSIGNED_WEBHOOKS is set; unsigned webhooks will be accepted");
    }

    let (orders, ledger, health) = if config.server.skip_externals {
        info!("Skipping database initialization (SKIP_EXTERNALS=true)");
        in_memory_stores()
    } else {
        postgres_stores(&config).await?
    };

    let gateway = PaystackGateway::new(config.paystack.clone())
        .map_err(|e| anyhow::anyhow!("Paystack configuration: {}", e))?;
    let sessions = HttpSessionVerifier::new(&config.auth)
        .map_err(|e| anyhow::anyhow!("Auth configuration: {}", e))?;

    let settlement = SettlementService::new(
        Arc::new(gateway),
        orders,
        ledger,
        config.settlement.clone(),
    );

    let app = router(AppState {
        settlement: Arc::new(settlement),
        sessions: Arc::new(sessions),
        health,
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
