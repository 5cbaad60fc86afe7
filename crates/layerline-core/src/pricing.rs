//! # Price Composition Engine
//!
//! Turns a product, a quantity and the chosen accessories into a
//! deterministic price breakdown, and applies the checkout adjustments.
//!
//! ## Composition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Product (price 100, tiers [5→90, 10→80])   quantity 12                 │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  1. effective unit price ── highest tier with min ≤ qty ──► 80          │
//! │  2. base_total          ── 80 × 12 ──────────────────────► 960          │
//! │  3. accessories         ── unit × acc_qty × qty, summed ─► 20×2×12=480  │
//! │  4. total               ── base_total + accessories ─────► 1440         │
//! │  5. has_discount        ── 80 < 100 ─────────────────────► true         │
//! │  6. next_tier           ── lowest tier with min > qty ───► none         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No Incremental State
//! Every function here recomputes from its inputs. Nothing keeps a running
//! total, so clicking "+" and "−" a hundred times lands on the same number.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLineItem;
use crate::money::{Money, Rate};
use crate::types::{BulkPricingRule, PaymentMethod, Product, SelectedAccessory};

// =============================================================================
// Bulk Pricing Tiers
// =============================================================================

/// Returns the usable tiers, sorted ascending by `min_quantity`.
///
/// Tiers with `min_quantity <= 1` or a non-positive unit price are discarded
/// silently. The sort is stable, so tiers sharing a `min_quantity` keep their
/// declared order and the last one wins in [`effective_unit_price`].
pub fn valid_tiers(rules: &[BulkPricingRule]) -> Vec<BulkPricingRule> {
    let mut tiers: Vec<BulkPricingRule> = rules
        .iter()
        .filter(|r| r.min_quantity > 1 && r.unit_price_cents > 0)
        .copied()
        .collect();
    tiers.sort_by_key(|r| r.min_quantity);
    tiers
}

/// Unit price for `quantity` units, after bulk tiers.
///
/// ## Example
/// ```rust
/// use layerline_core::pricing::effective_unit_price;
/// use layerline_core::types::{BulkPricingRule, Product};
///
/// let mut product: Product = serde_json::from_str(
///     r#"{"id":"p","name":"Planter","priceCents":100,"stock":50}"#,
/// ).unwrap();
/// product.bulk_pricing_rules = vec![
///     BulkPricingRule { min_quantity: 5, unit_price_cents: 90 },
///     BulkPricingRule { min_quantity: 10, unit_price_cents: 80 },
/// ];
///
/// assert_eq!(effective_unit_price(&product, 4).cents(), 100);
/// assert_eq!(effective_unit_price(&product, 5).cents(), 90);
/// assert_eq!(effective_unit_price(&product, 12).cents(), 80);
/// ```
pub fn effective_unit_price(product: &Product, quantity: u32) -> Money {
    valid_tiers(&product.bulk_pricing_rules)
        .iter()
        .filter(|t| t.min_quantity <= quantity)
        .last()
        .map(BulkPricingRule::unit_price)
        .unwrap_or_else(|| product.price())
}

/// The next cheaper tier the buyer could reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NextTier {
    pub min_quantity: u32,
    pub unit_price: Money,

    /// How many more units unlock this tier ("buy 3 more").
    pub units_needed: u32,
}

/// Lowest tier whose `min_quantity` exceeds `quantity`.
pub fn next_tier(product: &Product, quantity: u32) -> Option<NextTier> {
    valid_tiers(&product.bulk_pricing_rules)
        .into_iter()
        .find(|t| t.min_quantity > quantity)
        .map(|t| NextTier {
            min_quantity: t.min_quantity,
            unit_price: t.unit_price(),
            units_needed: t.min_quantity - quantity,
        })
}

// =============================================================================
// Price Breakdown
// =============================================================================

/// One accessory row of a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryLine {
    pub name: String,

    /// Accessories per product unit.
    pub quantity: u32,
    pub unit_price: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Money>,

    /// `unit_price × quantity × product quantity`.
    pub total: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_name: Option<String>,
}

/// Derived pricing for a product line. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub quantity: u32,

    /// Effective unit price (tier-adjusted).
    pub base_price: Money,
    pub base_total: Money,
    pub accessory_items: Vec<AccessoryLine>,
    pub accessories_total: Money,
    pub total: Money,

    /// Effective unit price is below the product's standard price.
    pub has_discount: bool,

    /// Unit price the savings are measured against (original price if higher).
    pub reference_price: Money,

    /// `(reference_price − base_price) × quantity`, never negative.
    pub savings: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<NextTier>,
}

/// Computes the full breakdown for `quantity` units with `accessories`.
///
/// Accessories that are not billable (zero quantity or no color) are left
/// out entirely.
pub fn compute_breakdown(
    product: &Product,
    quantity: u32,
    accessories: &[SelectedAccessory],
) -> PriceBreakdown {
    let base_price = effective_unit_price(product, quantity);
    let base_total = base_price * quantity;

    let accessory_items: Vec<AccessoryLine> = accessories
        .iter()
        .filter(|a| a.is_billable())
        .map(|a| AccessoryLine {
            name: a.name.clone(),
            quantity: a.quantity,
            unit_price: a.price(),
            original_price: product
                .accessory(&a.name)
                .and_then(|catalog| catalog.original_price_cents)
                .map(Money::from_cents),
            total: a.price() * a.quantity * quantity,
            color_name: a.color.clone(),
        })
        .collect();

    let accessories_total: Money = accessory_items.iter().map(|a| a.total).sum();

    let reference_price = product
        .original_price()
        .map_or(product.price(), |original| original.max(product.price()));
    let savings = if reference_price > base_price {
        (reference_price - base_price) * quantity
    } else {
        Money::zero()
    };

    PriceBreakdown {
        quantity,
        base_price,
        base_total,
        accessory_items,
        accessories_total,
        total: base_total + accessories_total,
        has_discount: base_price < product.price(),
        reference_price,
        savings,
        next_tier: next_tier(product, quantity),
    }
}

/// Breakdown of a cart line from its snapshot and selections.
pub fn line_breakdown(line: &CartLineItem) -> PriceBreakdown {
    compute_breakdown(&line.product, line.quantity, &line.selected_accessories)
}

/// Pre-adjustment checkout total: every line's breakdown total.
///
/// Unlike `CartStore::total_amount`, this includes bulk tiers and accessories.
pub fn checkout_subtotal(items: &[CartLineItem]) -> Money {
    items.iter().map(|line| line_breakdown(line).total).sum()
}

// =============================================================================
// Checkout Adjustments
// =============================================================================

/// The fixed per-rail adjustments.
///
/// Applied once to the whole pre-adjustment total, never per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRates {
    /// Added on top for gateway payments.
    pub gateway_surcharge: Rate,

    /// Taken off for bank transfers.
    pub transfer_discount: Rate,
}

impl Default for AdjustmentRates {
    /// 10% gateway surcharge, 5% transfer discount.
    fn default() -> Self {
        AdjustmentRates {
            gateway_surcharge: Rate::from_bps(1000),
            transfer_discount: Rate::from_bps(500),
        }
    }
}

/// Totals for one payment rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTotals {
    pub method: PaymentMethod,
    pub subtotal: Money,

    /// Signed: positive for a surcharge, negative for a discount.
    pub adjustment: Money,
    pub total: Money,
}

/// Applies the rail's adjustment to `subtotal`.
///
/// ## Example
/// ```rust
/// use layerline_core::money::Money;
/// use layerline_core::pricing::{adjusted_total, AdjustmentRates};
/// use layerline_core::types::PaymentMethod;
///
/// let rates = AdjustmentRates::default();
/// let subtotal = Money::from_cents(1000);
/// assert_eq!(adjusted_total(subtotal, PaymentMethod::Transfer, rates).total.cents(), 950);
/// assert_eq!(adjusted_total(subtotal, PaymentMethod::Gateway, rates).total.cents(), 1100);
/// ```
pub fn adjusted_total(subtotal: Money, method: PaymentMethod, rates: AdjustmentRates) -> CheckoutTotals {
    let total = match method {
        PaymentMethod::Gateway => subtotal.apply_surcharge(rates.gateway_surcharge),
        PaymentMethod::Transfer => subtotal.apply_discount(rates.transfer_discount),
    };

    CheckoutTotals {
        method,
        subtotal,
        adjustment: total - subtotal,
        total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
