// Main entry point for the cabinet access service

use cabinet_access::api::{create_router, AppState};
use cabinet_access::config::Config;
use cabinet_access::hardware::HardwareLinkController;
use cabinet_access::orchestrator::BatchAccessOrchestrator;
use cabinet_access::store::{IdentityStore, ItemStore, Ledger, MemoryStore, PgStore};

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

type Stores = (Arc<dyn IdentityStore>, Arc<dyn ItemStore>, Arc<dyn Ledger>);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load and validate configuration first (before any logging)
    let config = Config::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        e
    })?;

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config);

    info!("Starting cabinet access service");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        controller = %config.controller_address(),
        "Configuration loaded"
    );

    // 3. Initialize stores (Postgres or in-memory)
    let (identities, items, ledger) = init_stores(&config).await?;

    // 4. Connect the lock controller (falls back to simulation if unreachable)
    let link = Arc::new(
        HardwareLinkController::connect(config.controller_address(), config.link_settings())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create lock controller link");
                e
            })?,
    );

    info!(connected = link.is_connected().await, "Lock controller link initialized");

    // 5. Build orchestrator and router
    let orchestrator = Arc::new(
        BatchAccessOrchestrator::new(link, identities, items, ledger)
            .with_relock_delay(config.relock_delay()),
    );

    let app_state = AppState {
        orchestrator,
        config: Arc::new(config.clone()),
    };
    let router = create_router(app_state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind to address");
        e
    })?;

    info!(addr = %addr, "Server listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

async fn init_stores(config: &Config) -> Result<Stores, Box<dyn std::error::Error>> {
    if let Some(ref database_url) = config.database_url {
        let store = Arc::new(PgStore::connect(database_url).await?);
        info!("Database store initialized");
        Ok((
            store.clone() as Arc<dyn IdentityStore>,
            store.clone() as Arc<dyn ItemStore>,
            store as Arc<dyn Ledger>,
        ))
    } else {
        warn!("DATABASE_URL not set, using in-memory store");
        let store = Arc::new(MemoryStore::new());
        Ok((
            store.clone() as Arc<dyn IdentityStore>,
            store.clone() as Arc<dyn ItemStore>,
            store as Arc<dyn Ledger>,
        ))
    }
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

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
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
