//! # layerline-core: Pure Storefront Logic for Layerline
//!
//! Cart consistency, price composition and checkout flow for a shop selling
//! 3D-printed goods. Everything here is deterministic and free of I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Layerline Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront UI                                │   │
//! │  │    Product page ──► Cart drawer ──► Checkout modal              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/storefront (axum)                       │   │
//! │  │    add_to_cart, advance_checkout, submit_checkout, etc.         │   │
//! │  └──────────┬──────────────────┬──────────────────────┬───────────┘   │
//! │             │                  │                      │                │
//! │  ┌──────────▼──────────┐ ┌─────▼───────────────┐ ┌────▼────────────┐  │
//! │  │ ★ layerline-core ★  │ │  layerline-db       │ │ layerline-      │  │
//! │  │                     │ │  SQLite catalog +   │ │ payments        │  │
//! │  │  stock   selection  │ │  cart storage port  │ │ gateway +       │  │
//! │  │  cart    pricing    │ └─────────────────────┘ │ transfer proof  │  │
//! │  │  checkout payment   │                         └─────────────────┘  │
//! │  │                     │                                               │
//! │  │  NO I/O • NO NETWORK • NO DATABASE                                 │
//! │  └─────────────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer `Money` and basis-point `Rate`
//! - [`types`] - Products, colors, accessories, selections
//! - [`error`] - Domain error types
//! - [`validation`] - Customer form field rules
//! - [`stock`] - The quantity clamp every mutation goes through
//! - [`selection`] - Color modes, registry filtering, the variant picker
//! - [`cart`] - The cart store and its storage port
//! - [`persistence`] - Saved-cart serialization and load-time sanitizing
//! - [`pricing`] - Bulk tiers, accessories, breakdowns, rail adjustments
//! - [`checkout`] - The delivery → form → payment state machine
//! - [`payment`] - Payloads for the gateway and transfer backends
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use layerline_core::{CartStore, MemoryStorage, CART_STORAGE_KEY};
//! use layerline_core::types::Product;
//!
//! let product: Product = serde_json::from_str(
//!     r#"{"id":"fox","name":"Low Poly Fox","priceCents":1500,"stock":3}"#,
//! ).unwrap();
//!
//! let mut cart = CartStore::new(Arc::new(MemoryStorage::new()), CART_STORAGE_KEY);
//! assert!(cart.add_item(&product, 2, vec![], None, None));
//! assert!(!cart.add_item(&product, 2, vec![], None, None)); // only 3 in stock
//! assert_eq!(cart.total_amount().cents(), 3000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod payment;
pub mod persistence;
pub mod pricing;
pub mod selection;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartLineItem, CartStorage, CartStore, MemoryStorage, StockSync};
pub use checkout::{CheckoutSession, CheckoutStage, Customer, CustomerForm};
pub use error::{CheckoutError, CoreError, CoreResult, SelectionError, ValidationError};
pub use money::{Money, Rate};
pub use pricing::{AdjustmentRates, CheckoutTotals, PriceBreakdown};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Storage key the cart is saved under.
///
/// Changing it orphans every saved cart, so it only moves with a migration.
pub const CART_STORAGE_KEY: &str = "layerline-cart";

/// Largest accepted transfer receipt (5 MiB).
pub const MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;
