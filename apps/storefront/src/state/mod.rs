//! # State Module
//!
//! Manages application state for the storefront service.
//!
//! Instead of one struct holding everything behind a single lock, each
//! concern gets its own state type. Handlers pull out only what they need
//! through `FromRef`, so a catalog read never waits on a checkout.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      AppState (Clone)                           │   │
//! │  │  Router::new()...with_state(app_state)                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │     ┌──────────────┬─────────┼─────────┬──────────────┐                │
//! │     ▼              ▼         ▼         ▼              ▼                 │
//! │  ┌────────┐  ┌──────────┐ ┌──────────────┐ ┌────────┐ ┌────────────┐   │
//! │  │DbState │  │CartState │ │CheckoutState │ │Config  │ │Payments    │   │
//! │  │        │  │          │ │              │ │State   │ │State       │   │
//! │  │Database│  │Arc<Mutex<│ │Mutex<Option< │ │        │ │Arc<dyn     │   │
//! │  │(pool)  │  │CartStore>│ │Session>> +   │ │rates,  │ │Gateway>,   │   │
//! │  │        │  │>         │ │AtomicBool    │ │currency│ │Arc<dyn     │   │
//! │  └────────┘  └──────────┘ └──────────────┘ └────────┘ │Transfer>   │   │
//! │                                                       └────────────┘   │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: Database has internal connection pool (thread-safe)        │
//! │  • CartState: Mutex, never held across an await                        │
//! │  • CheckoutState: Mutex for the session, flag for in-flight submits    │
//! │  • ConfigState: Read-only after initialization                         │
//! │  • PaymentsState: Adapters are Send + Sync                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod checkout;
mod config;
mod db;
mod payments;

use std::sync::Arc;

use axum::extract::FromRef;

pub use cart::{CartHold, CartState};
pub use checkout::{CheckoutState, SubmissionGuard};
pub use config::{ConfigError, ConfigState, StoreConfig};
pub use db::DbState;
pub use payments::PaymentsState;

/// Router state. Cloning is cheap: every field is an `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Arc<DbState>,
    pub cart: Arc<CartState>,
    pub checkout: Arc<CheckoutState>,
    pub config: Arc<ConfigState>,
    pub payments: Arc<PaymentsState>,
}

impl FromRef<AppState> for Arc<DbState> {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Arc<CartState> {
    fn from_ref(state: &AppState) -> Self {
        state.cart.clone()
    }
}

impl FromRef<AppState> for Arc<CheckoutState> {
    fn from_ref(state: &AppState) -> Self {
        state.checkout.clone()
    }
}

impl FromRef<AppState> for Arc<ConfigState> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<PaymentsState> {
    fn from_ref(state: &AppState) -> Self {
        state.payments.clone()
    }
}
