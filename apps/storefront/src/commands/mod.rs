//! # Commands Module
//!
//! Everything the storefront UI can ask for, as plain async functions over
//! the managed state. `routes.rs` is a thin axum layer on top.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── catalog.rs   ◄─── Product list, customization options
//! ├── cart.rs      ◄─── Cart manipulation, stock refresh
//! └── checkout.rs  ◄─── Checkout stages, proof upload, submission
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  Storefront UI                                                          │
//! │  ─────────────                                                          │
//! │  await fetch('/api/cart/items', {                                       │
//! │    method: 'POST',                                                      │
//! │    body: JSON.stringify({ productId: 'low-poly-fox', quantity: 2 })     │
//! │  });                                                                    │
//! │         │                                                               │
//! │         │ (HTTP, JSON)                                                  │
//! │         ▼                                                               │
//! │  routes.rs                                                              │
//! │  ─────────                                                              │
//! │  async fn add_item(                                                     │
//! │      State(db): State<Arc<DbState>>,     ◄── FromRef<AppState>         │
//! │      State(cart): State<Arc<CartState>>,                               │
//! │      Json(request): Json<AddToCartRequest>,                            │
//! │  ) -> Result<Json<CartView>, ApiError>                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  commands::cart::add_to_cart(&db, &cart, request)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Injection
//! Each command takes only the state it needs:
//! ```rust,ignore
//! // Only needs database
//! async fn list_products(db: &DbState, limit: Option<u32>)
//!
//! // Only needs cart
//! fn get_cart(cart: &CartState)
//!
//! // Needs both
//! async fn add_to_cart(db: &DbState, cart: &CartState, request: AddToCartRequest)
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
