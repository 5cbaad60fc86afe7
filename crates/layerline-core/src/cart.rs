//! # Cart Store
//!
//! The buyer's cart: line items keyed by product id, bounded by stock, and
//! written to an injected key-value port after every change.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Store Operations                                │
//! │                                                                         │
//! │  Operation            Refused when                  Effect              │
//! │  ─────────            ────────────                  ──────              │
//! │  add_item()           qty ≤ 0, stock 0,             new line, or merge  │
//! │                       colors missing,               (qty +, colors ∪)  │
//! │                       merge over stock                                  │
//! │  update_quantity()    line absent,                  ≤ 0 removes,        │
//! │                       clamp changes nothing         else clamp to stock│
//! │  remove_item()        never                         line gone           │
//! │  clear()              never                         empty               │
//! │  sync_product()       never                         snapshot refreshed,│
//! │                                                     re-clamped          │
//! │                                                                         │
//! │  Every mutation above ends with persist(): serialize all lines and     │
//! │  save them under the storage key. Hydration (load) never persists.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Refusals Are Values
//! `add_item` and `update_quantity` return `false` instead of an error. The
//! caller knows what it asked for and turns a `false` into "no more stock" or
//! "choose a color".

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::money::Money;
use crate::persistence;
use crate::selection::CartPayload;
use crate::stock::clamp_quantity;
use crate::types::{ColorWithName, Product, SelectedAccessory, SelectedSection};

// =============================================================================
// Line Item
// =============================================================================

/// One product in the cart.
///
/// ## Design Notes
/// - `product`: snapshot of the catalog record as of the last add or sync.
///   Its `stock` is the bound for `quantity`.
/// - `quantity`: always `1..=product.stock`; a line reaching 0 is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product: Product,
    pub quantity: u32,

    #[serde(default)]
    pub selected_colors: Vec<ColorWithName>,

    #[serde(default)]
    pub selected_sections: Vec<SelectedSection>,

    #[serde(default)]
    pub selected_accessories: Vec<SelectedAccessory>,

    /// When the line was first created.
    #[serde(default = "Utc::now")]
    #[ts(type = "string")]
    pub added_at: DateTime<Utc>,
}

impl CartLineItem {
    pub fn product_id(&self) -> &str {
        &self.product.id
    }

    /// Unit price × quantity, without tiers or accessories.
    pub fn line_amount(&self) -> Money {
        self.product.price() * self.quantity
    }
}

/// Adds `incoming` colors not already present (same name and code).
pub(crate) fn union_colors(existing: &mut Vec<ColorWithName>, incoming: Vec<ColorWithName>) {
    for color in incoming {
        if !existing.iter().any(|c| c.same_color(&color)) {
            existing.push(color);
        }
    }
}

// =============================================================================
// Storage Port
// =============================================================================

/// Key-value port the cart persists through.
///
/// Writes are fire-and-forget: `save` cannot fail from the store's point of
/// view. An implementation that loses a write loses at most the latest
/// mutation.
pub trait CartStorage: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: String);
}

/// In-process storage, used by tests and as a fallback when no database is
/// configured.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a key, as if a previous session had saved it.
    pub fn with_entry(key: &str, value: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.save(key, value.into());
        storage
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save(&self, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

// =============================================================================
// Cart Store
// =============================================================================

/// What `sync_product` did to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StockSync {
    /// The product is not in the cart.
    NotInCart,
    /// Snapshot refreshed; quantity still fits.
    Unchanged,
    /// Quantity lowered to the new stock.
    Clamped { from: u32, to: u32 },
    /// Stock dropped to 0; the line is gone.
    Removed,
}

/// The cart, with its storage port.
///
/// ## Invariants
/// - Lines are unique by product id
/// - `0 < quantity <= product.stock` for every line
/// - Storage holds the serialized lines after every mutation
pub struct CartStore {
    items: Vec<CartLineItem>,
    storage: Arc<dyn CartStorage>,
    key: String,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("items", &self.items)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Creates an empty store without reading storage.
    pub fn new(storage: Arc<dyn CartStorage>, key: impl Into<String>) -> Self {
        CartStore {
            items: Vec::new(),
            storage,
            key: key.into(),
        }
    }

    /// Hydrates the store from storage, sanitizing the saved lines.
    ///
    /// Nothing is written back: a store that is only loaded and read leaves
    /// storage untouched.
    pub fn load(storage: Arc<dyn CartStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let items = storage
            .load(&key)
            .map(|raw| persistence::restore_cart(&raw))
            .unwrap_or_default();

        CartStore { items, storage, key }
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds a product or merges into its existing line.
    ///
    /// ## Behavior
    /// - New line: quantity clamped to stock
    /// - Existing line: quantities add (refused if the sum exceeds stock),
    ///   colors are unioned, the snapshot is replaced by `product`, and
    ///   sections/accessories are replaced when given
    ///
    /// ## Returns
    /// `false` without touching anything when the add is refused.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        colors: Vec<ColorWithName>,
        sections: Option<Vec<SelectedSection>>,
        accessories: Option<Vec<SelectedAccessory>>,
    ) -> bool {
        if quantity <= 0 || product.stock == 0 {
            return false;
        }

        if product.requires_line_color() && colors.is_empty() {
            return false;
        }

        if let Some(line) = self.items.iter_mut().find(|l| l.product.id == product.id) {
            let merged = i64::from(line.quantity) + quantity;
            if merged > i64::from(product.stock) {
                return false;
            }

            line.quantity = clamp_quantity(merged, product.stock);
            line.product = product.clone();
            union_colors(&mut line.selected_colors, colors);
            if let Some(sections) = sections {
                line.selected_sections = sections;
            }
            if let Some(accessories) = accessories {
                line.selected_accessories = accessories;
            }
        } else {
            let mut selected_colors = Vec::new();
            union_colors(&mut selected_colors, colors);

            self.items.push(CartLineItem {
                product: product.clone(),
                quantity: clamp_quantity(quantity, product.stock),
                selected_colors,
                selected_sections: sections.unwrap_or_default(),
                selected_accessories: accessories.unwrap_or_default(),
                added_at: Utc::now(),
            });
        }

        self.persist();
        true
    }

    /// Adds a finished variant-picker payload.
    pub fn add_payload(&mut self, payload: CartPayload) -> bool {
        self.add_item(
            &payload.product,
            i64::from(payload.quantity),
            payload.selected_colors,
            payload.selected_sections,
            payload.selected_accessories,
        )
    }

    /// Removes a line. Absent ids are fine.
    pub fn remove_item(&mut self, product_id: &str) {
        self.items.retain(|l| l.product.id != product_id);
        self.persist();
    }

    /// Sets a line's quantity.
    ///
    /// ## Returns
    /// - `true` when `quantity <= 0` (the line is removed)
    /// - `true` when the clamped quantity differs from the current one
    /// - `false` when the line is absent or clamping changes nothing
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> bool {
        if quantity <= 0 {
            self.remove_item(product_id);
            return true;
        }

        let Some(index) = self.position(product_id) else {
            return false;
        };

        let line = &mut self.items[index];
        let clamped = clamp_quantity(quantity, line.product.stock);
        if clamped == line.quantity {
            return false;
        }

        if clamped == 0 {
            self.items.remove(index);
        } else {
            line.quantity = clamped;
        }

        self.persist();
        true
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    /// Replaces a line's snapshot with the authoritative record and re-clamps.
    pub fn sync_product(&mut self, product: &Product) -> StockSync {
        let Some(index) = self.position(&product.id) else {
            return StockSync::NotInCart;
        };

        let line = &mut self.items[index];
        let from = line.quantity;
        let to = clamp_quantity(i64::from(from), product.stock);
        line.product = product.clone();

        let outcome = if to == 0 {
            self.items.remove(index);
            StockSync::Removed
        } else if to != from {
            line.quantity = to;
            StockSync::Clamped { from, to }
        } else {
            StockSync::Unchanged
        };

        self.persist();
        outcome
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLineItem> {
        self.items.iter().find(|l| l.product.id == product_id)
    }

    /// Quantity of a product in the cart, 0 if absent.
    pub fn get_item_quantity(&self, product_id: &str) -> u32 {
        self.get(product_id).map_or(0, |l| l.quantity)
    }

    /// Σ quantity.
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    /// Σ unit price × quantity. Accessories and tiers are not included.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(CartLineItem::line_amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.items.iter().position(|l| l.product.id == product_id)
    }

    fn persist(&self) {
        write_record(
            self.storage.as_ref(),
            &self.key,
            persistence::serialize_cart(&self.items),
        );
    }
}

fn write_record(
    storage: &dyn CartStorage,
    key: &str,
    record: Result<String, serde_json::Error>,
) {
    match record {
        Ok(json) => storage.save(key, json),
        Err(e) => warn!(key, error = %e, "Cart not saved: serialization failed"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
