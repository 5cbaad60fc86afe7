//! # Layerline Storefront Library
//!
//! Core library for the Layerline storefront service.
//! This is the main entry point that loads configuration, opens the
//! database and serves the JSON routes.
//!
//! ## Module Organization
//! ```text
//! layerline_storefront/
//! ├── lib.rs          ◄─── You are here (startup & shutdown)
//! ├── routes.rs       ◄─── axum router, one handler per command
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState and sub-state extraction
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── cart.rs     ◄─── Cart store behind a mutex
//! │   ├── checkout.rs ◄─── Open checkout session + submission flag
//! │   ├── payments.rs ◄─── Payment collaborators
//! │   └── config.rs   ◄─── layerline.toml + environment overrides
//! ├── commands/
//! │   ├── catalog.rs  ◄─── Product listing and picker options
//! │   ├── cart.rs     ◄─── Cart manipulation and stock refresh
//! │   └── checkout.rs ◄─── Checkout stages and submission
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## State Management
//! Every handler extracts only the state it needs:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Router State                                         │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────┐ ┌────────────────┐ ┌─────────────┐  │
//! │  │   DbState    │ │  CartState   │ │ CheckoutState  │ │ ConfigState │  │
//! │  │              │ │              │ │                │ │             │  │
//! │  │ • Pool       │ │ • CartStore  │ │ • Session?     │ │ • Rates     │  │
//! │  │ • Repos      │ │ • Storage    │ │ • Submitting   │ │ • Currency  │  │
//! │  └──────────────┘ └──────────────┘ └────────────────┘ └─────────────┘  │
//! │                                                                         │
//! │  ┌──────────────────────────────────┐                                   │
//! │  │          PaymentsState           │                                   │
//! │  │ • PaymentGateway (redirect)      │                                   │
//! │  │ • TransferProofService (upload)  │                                   │
//! │  └──────────────────────────────────┘                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn, Subscriber};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use layerline_core::CartStore;
use layerline_db::{Database, DbConfig, SqliteCartStorage};
use state::{AppState, CartState, CheckoutState, ConfigState, DbState, PaymentsState, StoreConfig};

/// Runs the storefront service until Ctrl+C or SIGTERM.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Service Startup                                   │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter                                │
/// │     • Default: INFO, can be overridden with RUST_LOG                    │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • $LAYERLINE_CONFIG or the platform config dir                      │
/// │     • LAYERLINE_* environment overrides                                 │
/// │                                                                         │
/// │  3. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode                                              │
/// │     • Run pending migrations                                            │
/// │                                                                         │
/// │  4. Restore Cart ─────────────────────────────────────────────────────► │
/// │     • Preload the stored cart record                                    │
/// │     • Start the ordered background writer                               │
/// │                                                                         │
/// │  5. Serve ────────────────────────────────────────────────────────────► │
/// │     • Bind, serve, wait for a shutdown signal                           │
/// │     • Flush pending cart writes, close the pool                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Layerline storefront");

    let config = StoreConfig::load()?;

    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path)).await?;
    info!("Database connected and migrations applied");

    let storage_key = config.checkout.storage_key.clone();
    let storage = Arc::new(SqliteCartStorage::open(&db, &[storage_key.as_str()]).await?);
    let cart = CartStore::load(storage.clone(), storage_key);
    info!(items = cart.len(), "Cart restored");

    let payments = PaymentsState::from_config(&config.payments_config())?;
    let addr = config.bind_addr()?;

    let state = AppState {
        db: Arc::new(DbState::new(db.clone())),
        cart: Arc::new(CartState::new(cart)),
        checkout: Arc::new(CheckoutState::new()),
        config: Arc::new(ConfigState::new(config)),
        payments: Arc::new(payments),
    };

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    storage.flush().await;
    db.close().await;

    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=layerline=trace` - Show trace for layerline crates only
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    log_subscriber(filter).init();
}

const DEFAULT_LOG_FILTER: &str = "info,layerline=debug,sqlx=warn";

/// The filter alone decides what is logged.
fn log_subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt().with_env_filter(filter).finish()
}

/// Resolves on Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires; the other
/// one still can.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => warn!("Received Ctrl+C"),
        () = terminate => warn!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_default_filter_levels() {
        let subscriber = log_subscriber(EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing::subscriber::with_default(subscriber, || {
            assert!(!tracing::enabled!(target: "sqlx::query", Level::DEBUG));
            assert!(tracing::enabled!(target: "sqlx::query", Level::WARN));
            assert!(tracing::enabled!(target: "layerline_db::storage", Level::DEBUG));
            assert!(!tracing::enabled!(target: "layerline_db::storage", Level::TRACE));
            assert!(!tracing::enabled!(target: "hyper::proto", Level::DEBUG));
            assert!(tracing::enabled!(target: "hyper::proto", Level::INFO));
        });
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================
