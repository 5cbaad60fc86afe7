//! # Cart Persistence
//!
//! Serializes the cart for the storage port and restores it on start.
//!
//! ## Load-Time Sanitizing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  saved JSON (any version, possibly hand-edited or truncated)           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  not an array ───────────────────────────────► empty cart              │
//! │        │                                                                │
//! │        ▼  per line                                                      │
//! │  product missing/malformed ──────────────────► line dropped            │
//! │  product.stock normalized (floor, ≥ 0); 0 ───► line dropped            │
//! │  quantity normalized; 0 ─────────────────────► line dropped            │
//! │  quantity > stock ───────────────────────────► clamped                 │
//! │  legacy `selectedColor` ─────────────────────► `selectedColors: [..]`  │
//! │  malformed color/section/accessory entries ──► entry dropped           │
//! │  repeated product id ────────────────────────► first line kept         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sanitizing never fails and never reports; a broken record just loads as
//! less cart.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::cart::{union_colors, CartLineItem};
use crate::stock::{clamp_quantity, normalize_count};
use crate::types::{ColorWithName, Product};

/// Serializes lines in the current record shape.
pub fn serialize_cart(items: &[CartLineItem]) -> Result<String, serde_json::Error> {
    serde_json::to_string(items)
}

/// Restores lines from a saved record, dropping whatever does not hold up.
pub fn restore_cart(raw: &str) -> Vec<CartLineItem> {
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(raw) else {
        return Vec::new();
    };

    let mut items: Vec<CartLineItem> = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(line) = sanitize_line(entry) {
            if !items.iter().any(|l| l.product.id == line.product.id) {
                items.push(line);
            }
        }
    }
    items
}

// =============================================================================
// Stored Record Shapes
// =============================================================================

/// A saved line, every field kept loose until checked.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLine {
    product: Value,

    #[serde(default)]
    quantity: Value,

    #[serde(flatten)]
    colors: StoredColors,

    #[serde(default)]
    selected_sections: Option<Value>,

    #[serde(default)]
    selected_accessories: Option<Value>,

    #[serde(default)]
    added_at: Option<Value>,
}

/// Current records carry `selectedColors`; older ones a single `selectedColor`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredColors {
    #[serde(rename_all = "camelCase")]
    Current { selected_colors: Vec<Value> },

    #[serde(rename_all = "camelCase")]
    Legacy {
        #[serde(default)]
        selected_color: Option<LegacyColor>,
    },
}

/// The legacy single color was either a full object or just its name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyColor {
    Full(ColorWithName),
    Name(String),
}

impl StoredColors {
    /// Normalizes both shapes into the current list form.
    ///
    /// A legacy bare name picks up its code from the product's colors when it
    /// can; otherwise the code stays empty.
    fn into_colors(self, product: &Product) -> Vec<ColorWithName> {
        let raw = match self {
            StoredColors::Current { selected_colors } => parse_entries(selected_colors),
            StoredColors::Legacy { selected_color } => match selected_color {
                Some(LegacyColor::Full(color)) => vec![color],
                Some(LegacyColor::Name(name)) if !name.trim().is_empty() => {
                    let known = product
                        .available_colors
                        .iter()
                        .find(|c| c.name == name)
                        .cloned();
                    vec![known.unwrap_or_else(|| ColorWithName::new(name, ""))]
                }
                _ => Vec::new(),
            },
        };

        let mut colors = Vec::new();
        union_colors(&mut colors, raw);
        colors
    }
}

// =============================================================================
// Line Sanitizer
// =============================================================================

fn sanitize_line(entry: Value) -> Option<CartLineItem> {
    let stored: StoredLine = serde_json::from_value(entry).ok()?;

    let mut product_value = stored.product;
    let stock = normalize_count(product_value.get("stock")?);
    if stock == 0 {
        return None;
    }
    product_value
        .as_object_mut()?
        .insert("stock".to_string(), Value::from(stock));

    let product: Product = serde_json::from_value(product_value).ok()?;
    if product.id.trim().is_empty() {
        return None;
    }

    let quantity = clamp_quantity(i64::from(normalize_count(&stored.quantity)), product.stock);
    if quantity == 0 {
        return None;
    }

    let selected_colors = stored.colors.into_colors(&product);
    let added_at = stored
        .added_at
        .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok())
        .unwrap_or_else(Utc::now);

    Some(CartLineItem {
        quantity,
        selected_colors,
        selected_sections: stored.selected_sections.map(parse_list).unwrap_or_default(),
        selected_accessories: stored
            .selected_accessories
            .map(parse_list)
            .unwrap_or_default(),
        added_at,
        product,
    })
}

/// Parses a JSON array entry by entry, skipping entries that do not fit `T`.
fn parse_list<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(entries) => parse_entries(entries),
        _ => Vec::new(),
    }
}

fn parse_entries<T: DeserializeOwned>(entries: Vec<Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|e| serde_json::from_value(e).ok())
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
