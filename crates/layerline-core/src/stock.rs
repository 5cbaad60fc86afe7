//! # Stock Clamp
//!
//! The single source of truth for quantity legality.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clamp_quantity(requested, stock)                                       │
//! │                                                                         │
//! │   stock == 0            → 0   (caller treats 0 as "cannot add")        │
//! │   requested <= 0        → 0                                             │
//! │   requested >  stock    → stock                                         │
//! │   otherwise             → requested                                     │
//! │                                                                         │
//! │  Stock coming from outside the type system (persisted JSON, catalog    │
//! │  payloads) is normalized first: non-numeric, NaN or negative → 0,      │
//! │  fractional → floor.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every place that sets a quantity (cart add, cart update, picker quantity,
//! load-time sanitizing) goes through [`clamp_quantity`].

use serde_json::Value;

/// Bounds a requested quantity to `[0, stock]`.
///
/// ## Example
/// ```rust
/// use layerline_core::stock::clamp_quantity;
///
/// assert_eq!(clamp_quantity(5, 3), 3);
/// assert_eq!(clamp_quantity(-2, 3), 0);
/// assert_eq!(clamp_quantity(7, 0), 0);
/// ```
pub fn clamp_quantity(requested: i64, stock: u32) -> u32 {
    if stock == 0 || requested <= 0 {
        return 0;
    }

    // requested > 0 here, and min() with a u32 keeps it in range
    requested.min(i64::from(stock)) as u32
}

/// Normalizes a raw stock figure to a whole, non-negative count.
///
/// ## Example
/// ```rust
/// use layerline_core::stock::normalize_stock;
///
/// assert_eq!(normalize_stock(4.9), 4);
/// assert_eq!(normalize_stock(-1.0), 0);
/// assert_eq!(normalize_stock(f64::NAN), 0);
/// ```
pub fn normalize_stock(raw: f64) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }

    let floored = raw.floor();
    if floored >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        floored as u32
    }
}

/// Normalizes a JSON value holding a count (stock or quantity).
///
/// Numbers and numeric strings are accepted; anything else is 0.
pub fn normalize_count(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_f64().map(normalize_stock).unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(normalize_stock).unwrap_or(0),
        _ => 0,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clamp_within_stock() {
        assert_eq!(clamp_quantity(1, 10), 1);
        assert_eq!(clamp_quantity(10, 10), 10);
        assert_eq!(clamp_quantity(11, 10), 10);
    }

    #[test]
    fn test_clamp_zero_stock_is_always_zero() {
        for q in [-5, 0, 1, 50, i64::MAX] {
            assert_eq!(clamp_quantity(q, 0), 0);
        }
    }

    #[test]
    fn test_clamp_is_idempotent() {
        for stock in [0u32, 1, 3, 12] {
            for q in -3i64..20 {
                let once = clamp_quantity(q, stock);
                assert_eq!(clamp_quantity(i64::from(once), stock), once);
            }
        }
    }

    #[test]
    fn test_normalize_stock() {
        assert_eq!(normalize_stock(3.0), 3);
        assert_eq!(normalize_stock(3.99), 3);
        assert_eq!(normalize_stock(0.5), 0);
        assert_eq!(normalize_stock(-7.0), 0);
        assert_eq!(normalize_stock(f64::INFINITY), 0);
    }

    #[test]
    fn test_normalize_count_from_json() {
        assert_eq!(normalize_count(&json!(5)), 5);
        assert_eq!(normalize_count(&json!(2.7)), 2);
        assert_eq!(normalize_count(&json!("8")), 8);
        assert_eq!(normalize_count(&json!(-1)), 0);
        assert_eq!(normalize_count(&json!("lots")), 0);
        assert_eq!(normalize_count(&json!(null)), 0);
        assert_eq!(normalize_count(&json!({"n": 1})), 0);
    }
}
