//! # SQLite Cart Storage
//!
//! [`CartStorage`] implementation over the `kv_store` table.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartStore::persist()                                                   │
//! │       │  save(key, json)          (synchronous, never fails)            │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐   WriteOp::Put   ┌──────────────────────────┐    │
//! │  │ cache (Mutex)    │ ───────────────► │ writer task (one per     │    │
//! │  │ key → latest     │   unbounded mpsc │ storage, FIFO)           │    │
//! │  └──────────────────┘                  │  kv.put(key, json).await │    │
//! │       ▲                                └──────────────────────────┘    │
//! │       │  load(key)                                                      │
//! │  reads come from the cache, filled at open()                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A single writer consumes the channel in order, so the row always ends up
//! holding the last value saved. A failed write is logged and dropped; the
//! in-memory cart stays authoritative and the next mutation writes again.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::kv::KvRepository;
use layerline_core::CartStorage;

enum WriteOp {
    Put { key: String, value: String },
    Flush(oneshot::Sender<()>),
}

/// Cart storage port backed by SQLite.
///
/// ## Usage
/// ```rust,ignore
/// let storage = Arc::new(SqliteCartStorage::open(&db, &[CART_STORAGE_KEY]).await?);
/// let cart = CartStore::load(storage.clone(), CART_STORAGE_KEY);
/// ```
#[derive(Debug)]
pub struct SqliteCartStorage {
    cache: Mutex<HashMap<String, String>>,
    writer: mpsc::UnboundedSender<WriteOp>,
}

impl SqliteCartStorage {
    /// Preloads `keys` and starts the writer task.
    ///
    /// Must be called inside a Tokio runtime. Keys not listed here read as
    /// absent until something saves them.
    pub async fn open(db: &Database, keys: &[&str]) -> DbResult<Self> {
        let kv = db.kv();

        let mut cache = HashMap::new();
        for key in keys {
            if let Some(value) = kv.get(key).await? {
                debug!(key = %key, bytes = value.len(), "Preloaded stored cart");
                cache.insert((*key).to_string(), value);
            }
        }

        let (writer, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(kv, rx));

        Ok(SqliteCartStorage {
            cache: Mutex::new(cache),
            writer,
        })
    }

    /// Waits until every save issued before this call has reached the
    /// database.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.writer.send(WriteOp::Flush(done)).is_err() {
            warn!("Cart writer has stopped; nothing to flush");
            return;
        }
        let _ = wait.await;
    }
}

impl CartStorage for SqliteCartStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save(&self, key: &str, value: String) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.clone());

        let op = WriteOp::Put {
            key: key.to_string(),
            value,
        };
        if self.writer.send(op).is_err() {
            warn!(key = %key, "Cart writer has stopped; change kept in memory only");
        }
    }
}

impl std::fmt::Debug for WriteOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOp::Put { key, value } => f
                .debug_struct("Put")
                .field("key", key)
                .field("bytes", &value.len())
                .finish(),
            WriteOp::Flush(_) => f.write_str("Flush"),
        }
    }
}

async fn run_writer(kv: KvRepository, mut rx: mpsc::UnboundedReceiver<WriteOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            WriteOp::Put { key, value } => {
                if let Err(e) = kv.put(&key, &value).await {
                    warn!(key = %key, error = %e, "Failed to persist cart");
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Cart writer stopped");
}

// =============================================================================
// Unit Tests
// =============================================================================
