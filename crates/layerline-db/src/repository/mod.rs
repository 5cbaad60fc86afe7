//! # Repository Module
//!
//! Database repository implementations for Layerline.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storefront command                                                     │
//! │       │                                                                 │
//! │       │  db.products().get_by_id("fox")                                 │
//! │       ▼                                                                 │
//! │  ProductRepository ── get_by_id, list_active, upsert, set_stock        │
//! │  ColorRepository ──── registry, upsert, set_in_stock                   │
//! │  KvRepository ─────── get, put, delete                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog products
//! - [`ColorRepository`](color::ColorRepository) - The master color registry
//! - [`KvRepository`](kv::KvRepository) - Rows behind the cart storage port

pub mod color;
pub mod kv;
pub mod product;
