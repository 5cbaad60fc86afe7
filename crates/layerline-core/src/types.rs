//! # Domain Types
//!
//! Core domain types used throughout Layerline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐   ┌─────────────────┐   ┌─────────────────┐  │
//! │  │      Product         │   │ ColorWithName   │   │ RegistryColor   │  │
//! │  │  ──────────────────  │   │ ─────────────── │   │ ─────────────── │  │
//! │  │  id, name            │──►│ name + code     │   │ id, name, hex   │  │
//! │  │  price_cents         │   │ image_index?    │   │ in_stock        │  │
//! │  │  stock               │   └─────────────────┘   └─────────────────┘  │
//! │  │  color_mode ─────────┼──► Default | Sections | Disabled             │
//! │  │  color_sections      │   ┌─────────────────┐   ┌─────────────────┐  │
//! │  │  accessories ────────┼──►│   Accessory     │   │ BulkPricingRule │  │
//! │  │  bulk_pricing_rules ─┼──────────────────────────►│ min_quantity  │  │
//! │  └──────────────────────┘   └─────────────────┘   │ unit_price     │  │
//! │                                                    └─────────────────┘  │
//! │  Selections attached to a cart line:                                   │
//! │    SelectedSection { section_id, color_id, color_name, color_code }    │
//! │    SelectedAccessory { name, color, quantity, price_cents }            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Every type serializes camelCase. The same shape is used for the persisted
//! cart record, the JSON commands and the generated TypeScript bindings.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Colors
// =============================================================================

/// A color offered for a product, optionally tied to one of its photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ColorWithName {
    /// Display name ("Galaxy Black").
    pub name: String,

    /// Hex code ("#1a1a1a").
    pub code: String,

    /// Image reference showing the product in this color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Index into `Product::images` of the photo for this color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,
}

impl ColorWithName {
    /// Creates a color without an image association.
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        ColorWithName {
            name: name.into(),
            code: code.into(),
            image: None,
            image_index: None,
        }
    }

    /// Two colors are the same entity when name AND code match.
    ///
    /// Image associations are presentation details and do not take part.
    pub fn same_color(&self, other: &ColorWithName) -> bool {
        self.name == other.name && self.code == other.code
    }
}

/// An entry of the master color registry.
///
/// The registry is owned by the back office; products reference its colors
/// by hex code or name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RegistryColor {
    pub id: String,
    pub name: String,
    pub hex: String,
    pub in_stock: bool,
}

/// How a product's variant selection is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Single color chosen from `available_colors` (if any are declared).
    #[default]
    Default,
    /// One color per named section ("Roof", "Base").
    Sections,
    /// No color choice at all.
    Disabled,
}

/// A named product part that needs its own color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ColorSection {
    pub id: String,
    pub label: String,

    /// Registry ids of the colors eligible for this section.
    #[serde(default)]
    pub color_ids: Vec<String>,
}

// =============================================================================
// Accessories & Bulk Pricing
// =============================================================================

/// A priced add-on sold alongside a product (stand, LED base, keychain ring).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub name: String,
    pub price_cents: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price_cents: Option<i64>,
}

impl Accessory {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// A quantity threshold that overrides the unit price.
///
/// Only rules with `min_quantity > 1` and `unit_price_cents > 0` take part in
/// pricing; see [`crate::pricing::valid_tiers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkPricingRule {
    pub min_quantity: u32,
    pub unit_price_cents: i64,
}

impl BulkPricingRule {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product as read from the catalog.
///
/// A cart line keeps a snapshot of this record with the stock resolved at the
/// time of the last add/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog identifier; the cart's uniqueness key.
    pub id: String,

    /// Display name shown in the cart and on the payment record.
    pub name: String,

    /// Current price in cents (possibly already discounted).
    pub price_cents: i64,

    /// Price before discount, for strikethrough display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price_cents: Option<i64>,

    /// Units available. Never negative.
    #[serde(default)]
    pub stock: u32,

    /// Photos; `ColorWithName::image_index` points into this list.
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub available_colors: Vec<ColorWithName>,

    #[serde(default)]
    pub color_mode: ColorMode,

    #[serde(default)]
    pub color_sections: Vec<ColorSection>,

    #[serde(default)]
    pub accessories: Vec<Accessory>,

    #[serde(default)]
    pub bulk_pricing_rules: Vec<BulkPricingRule>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the pre-discount price, if one is declared.
    #[inline]
    pub fn original_price(&self) -> Option<Money> {
        self.original_price_cents.map(Money::from_cents)
    }

    /// True when a single color must be picked before the product is addable.
    pub fn requires_color_choice(&self) -> bool {
        self.color_mode == ColorMode::Default && !self.available_colors.is_empty()
    }

    /// True when a cart line for this product must carry at least one color.
    pub fn requires_line_color(&self) -> bool {
        self.color_mode != ColorMode::Disabled && !self.available_colors.is_empty()
    }

    /// True when every section needs its own color.
    pub fn requires_section_choice(&self) -> bool {
        self.color_mode == ColorMode::Sections && !self.color_sections.is_empty()
    }

    /// Looks up an accessory by name.
    pub fn accessory(&self, name: &str) -> Option<&Accessory> {
        self.accessories.iter().find(|a| a.name == name)
    }
}

// =============================================================================
// Line Selections
// =============================================================================

/// The color chosen for one section of a `Sections`-mode product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SelectedSection {
    pub section_id: String,
    pub color_id: String,
    pub color_name: String,
    pub color_code: String,
}

/// An accessory requested for a cart line.
///
/// `quantity` is per product unit: 2 stands on a line of 3 figures bills 6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SelectedAccessory {
    pub name: String,

    /// Color name; unset means the accessory is not billable yet.
    #[serde(default)]
    pub color: Option<String>,

    pub quantity: u32,
    pub price_cents: i64,
}

impl SelectedAccessory {
    /// True when this accessory is requested and fully specified.
    pub fn is_billable(&self) -> bool {
        self.quantity > 0 && self.color.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Checkout Choices
// =============================================================================

/// How the order reaches the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Buyer collects the order; no address needed.
    Pickup,
    /// Courier delivery; a full address is required.
    Shipping,
}

/// The payment rail chosen at the last checkout stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card/wallet payment through the gateway's hosted page (surcharged).
    Gateway,
    /// Manual bank transfer with an uploaded proof (discounted).
    Transfer,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Gateway => write!(f, "gateway"),
            PaymentMethod::Transfer => write!(f, "transfer"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
