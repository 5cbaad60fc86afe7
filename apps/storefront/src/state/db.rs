//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! ## Thread Safety
//! The `Database` struct from `layerline-db` contains a `SqlitePool` which
//! is inherently thread-safe. Multiple commands can execute queries
//! concurrently without explicit locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn list_products(db: &DbState, limit: u32) -> Result<Vec<Product>, ApiError> {
//!     Ok(db.inner().products().list_active(limit).await?)
//! }
//! ```

use layerline_db::Database;

#[derive(Debug)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
