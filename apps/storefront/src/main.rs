//! # Layerline Storefront Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Layerline Storefront                             │
//! │                                                                         │
//! │   Browser UI ──── fetch('/api/...') ────►  axum router (routes.rs)      │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                   commands/ ── state/ ── error.rs       │
//! │                                        │                 │              │
//! │                                        ▼                 ▼              │
//! │                             layerline.db (SQLite)   payments service    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The actual setup is in lib.rs for better testability.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match layerline_storefront::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Storefront stopped");
            eprintln!("layerline-storefront: {e}");
            ExitCode::FAILURE
        }
    }
}
