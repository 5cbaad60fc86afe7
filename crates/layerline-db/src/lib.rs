//! # layerline-db: Database Layer for Layerline
//!
//! SQLite storage for the storefront: the catalog it reads and the rows the
//! cart is saved in. Async access goes through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Layerline Data Flow                              │
//! │                                                                         │
//! │  Storefront command (get_product_options, add_to_cart)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  layerline-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌────────────────┐  │   │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations    │  │   │
//! │  │   │   (pool.rs)   │◄──│  products      │   │  001_catalog   │  │   │
//! │  │   │   SqlitePool  │   │  colors, kv    │   │  002_kv_store  │  │   │
//! │  │   └───────▲───────┘   └────────────────┘   └────────────────┘  │   │
//! │  │           │                                                     │   │
//! │  │   ┌───────┴───────────┐                                         │   │
//! │  │   │ SqliteCartStorage │ ◄── CartStore::persist()                │   │
//! │  │   └───────────────────┘                                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product, color registry and key-value repositories
//! - [`storage`] - The cart storage port over `kv_store`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use layerline_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/layerline.db")).await?;
//! let products = db.products().list_active(50).await?;
//! let registry = db.colors().registry().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod storage;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use storage::SqliteCartStorage;

pub use repository::color::ColorRepository;
pub use repository::kv::KvRepository;
pub use repository::product::ProductRepository;
