//! # Cart Commands
//!
//! Cart manipulation and stock refresh.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│ Paid /   │       │
//! │  │  Cart    │     │          │     │  Modal   │     │ Pending  │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │       ▲                │                 │                │             │
//! │       │           add_to_cart      submit_checkout          │             │
//! │       │           update_item      (checkout.rs)            │             │
//! │       │           remove_item                               │             │
//! │       │           refresh_cart                              │             │
//! │       │                │                                    │             │
//! │       └──── clear_cart ┘◄───────── cleared on success ──────┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CartState, DbState};
use layerline_core::pricing::{checkout_subtotal, line_breakdown};
use layerline_core::selection::VariantPicker;
use layerline_core::{
    CartLineItem, ColorWithName, CoreError, Money, PriceBreakdown, SelectionError, StockSync,
};

// =============================================================================
// Responses
// =============================================================================

/// A cart line with its derived pricing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLineItem,
    pub breakdown: PriceBreakdown,
}

/// Cart response including lines and totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,

    /// Σ quantity.
    pub total_items: u32,

    /// Σ unit price × quantity, without tiers or accessories.
    pub total_amount: Money,

    /// Σ line totals with tiers and accessories; what checkout charges
    /// before the payment adjustment.
    pub subtotal: Money,
}

impl CartView {
    pub fn from_items(items: &[CartLineItem], total_items: u32, total_amount: Money) -> Self {
        CartView {
            items: items
                .iter()
                .map(|line| CartLineView {
                    line: line.clone(),
                    breakdown: line_breakdown(line),
                })
                .collect(),
            total_items,
            total_amount,
            subtotal: checkout_subtotal(items),
        }
    }
}

/// What a stock refresh did to one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSync {
    pub product_id: String,
    pub product_name: String,
    pub outcome: StockSync,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// Lines whose quantity changed or that were removed.
    pub changes: Vec<LineSync>,
    pub cart: CartView,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionChoice {
    pub section_id: String,
    pub color_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryChoice {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    pub quantity: u32,
}

/// Body of `POST /api/cart/items`.
///
/// ```json
/// {
///   "productId": "cottage-lamp",
///   "quantity": 2,
///   "sections": [{ "sectionId": "roof", "colorId": "signal-red" }],
///   "accessories": [{ "name": "LED kit", "color": "Snow White", "quantity": 1 }]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: String,

    #[serde(default = "default_quantity")]
    pub quantity: i64,

    /// Color for `default`-mode products.
    #[serde(default)]
    pub color: Option<ColorWithName>,

    /// Photo the buyer was looking at; picks its color when none is given.
    #[serde(default)]
    pub image_index: Option<usize>,

    #[serde(default)]
    pub sections: Vec<SectionChoice>,

    #[serde(default)]
    pub accessories: Vec<AccessoryChoice>,
}

fn default_quantity() -> i64 {
    1
}

// =============================================================================
// Commands
// =============================================================================

fn cart_view(cart: &CartState) -> CartView {
    cart.with_cart(|c| CartView::from_items(c.items(), c.total_items(), c.total_amount()))
}

/// Gets the current cart contents.
pub fn get_cart(cart: &CartState) -> CartView {
    debug!("get_cart command");
    cart_view(cart)
}

/// Adds a customized product to the cart.
///
/// ## Behavior
/// - The product is read fresh from the catalog, so the line's snapshot and
///   stock bound are current
/// - The selection goes through a `VariantPicker` against the color
///   registry: unknown or out-of-stock colors and incomplete sections are
///   refused before the cart is touched
/// - A new line is clamped to stock; merging into an existing line past
///   stock is refused
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Buyer finishes the customization panel                                │
/// │                    │                                                    │
/// │                    ▼                                                    │
/// │  POST /api/cart/items { productId, quantity, color | sections, ... }   │
/// │                    │                                                    │
/// │                    ▼                                                    │
/// │  ┌────────────────────────────────────────────────────────────────┐    │
/// │  │  1. Fetch product + registry                                   │    │
/// │  │  2. Replay the choices on a VariantPicker                      │    │
/// │  │  3. finish() → CartPayload (or SELECTION_ERROR)                │    │
/// │  │  4. add_payload() → false means INSUFFICIENT_STOCK             │    │
/// │  └────────────────────────────────────────────────────────────────┘    │
/// │                    │                                                    │
/// │                    ▼                                                    │
/// │  Cart drawer shows the new line                                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn add_to_cart(
    db: &DbState,
    cart: &CartState,
    request: AddToCartRequest,
) -> Result<CartView, ApiError> {
    debug!(
        product_id = %request.product_id,
        quantity = request.quantity,
        "add_to_cart command"
    );

    if request.quantity < 1 {
        return Err(ApiError::validation("Quantity must be at least 1"));
    }

    let product = db
        .inner()
        .products()
        .get_by_id(&request.product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &request.product_id))?;
    let registry = db.inner().colors().registry().await?;

    let mut picker = VariantPicker::new(product, &registry);
    if let Some(index) = request.image_index {
        picker.select_image(index);
    }
    if let Some(color) = &request.color {
        picker.choose_color(color)?;
    }
    for choice in &request.sections {
        picker.choose_section_color(&choice.section_id, &choice.color_id)?;
    }
    for accessory in request.accessories {
        picker.set_accessory(&accessory.name, accessory.color, accessory.quantity)?;
    }
    picker.set_quantity(request.quantity);

    let payload = picker.finish()?;
    if payload.selected_colors.is_empty() && payload.product.requires_line_color() {
        return Err(SelectionError::ColorRequired {
            product: payload.product.name,
        }
        .into());
    }
    let product_name = payload.product.name.clone();
    let stock = payload.product.stock;

    let (added, in_cart) = cart.edit(|c| {
        let in_cart = c.get_item_quantity(&payload.product.id);
        (c.add_payload(payload), in_cart)
    })?;

    if !added {
        return Err(CoreError::InsufficientStock {
            product: product_name,
            available: stock,
            requested: i64::from(in_cart) + request.quantity,
        }
        .into());
    }

    info!(product_id = %request.product_id, "Added to cart");
    Ok(cart_view(cart))
}

/// Sets a line's quantity.
///
/// ## Behavior
/// - `quantity <= 0` removes the line
/// - Above stock, the line is clamped to stock; if it was already there the
///   request fails with `INSUFFICIENT_STOCK` so the UI can say "no more stock"
pub fn update_cart_item(
    cart: &CartState,
    product_id: &str,
    quantity: i64,
) -> Result<CartView, ApiError> {
    debug!(product_id = %product_id, quantity, "update_cart_item command");

    let outcome = cart.edit(|c| {
        let line = c.get(product_id).map(|l| (l.product.name.clone(), l.product.stock));
        let changed = c.update_quantity(product_id, quantity);
        (line, changed)
    })?;

    match outcome {
        (None, _) if quantity > 0 => Err(ApiError::not_found("Cart item", product_id)),
        (Some((product, available)), false) if quantity > i64::from(available) => {
            Err(CoreError::InsufficientStock {
                product,
                available,
                requested: quantity,
            }
            .into())
        }
        _ => Ok(cart_view(cart)),
    }
}

/// Removes a line. Removing an absent product is not an error.
pub fn remove_from_cart(cart: &CartState, product_id: &str) -> Result<CartView, ApiError> {
    debug!(product_id = %product_id, "remove_from_cart command");
    cart.edit(|c| c.remove_item(product_id))?;
    Ok(cart_view(cart))
}

/// Empties the cart.
pub fn clear_cart(cart: &CartState) -> Result<CartView, ApiError> {
    debug!("clear_cart command");
    cart.edit(|c| c.clear())?;
    Ok(cart_view(cart))
}

/// Re-reads every line's product and re-clamps it to current stock.
pub async fn refresh_cart(db: &DbState, cart: &CartState) -> Result<RefreshResponse, ApiError> {
    debug!("refresh_cart command");

    let changes = revalidate_lines(db, cart).await?;
    Ok(RefreshResponse {
        changes,
        cart: cart_view(cart),
    })
}

/// Syncs every line against the catalog and returns the lines that changed.
///
/// A product that is gone or deactivated counts as out of stock, so its
/// line is removed. The cart lock is released around each database read.
pub(crate) async fn revalidate_lines(
    db: &DbState,
    cart: &CartState,
) -> Result<Vec<LineSync>, ApiError> {
    let snapshots: Vec<_> = cart.with_cart(|c| c.items().iter().map(|l| l.product.clone()).collect());

    let mut changes = Vec::new();
    for snapshot in snapshots {
        let current = match db.inner().products().get_by_id(&snapshot.id).await? {
            Some(product) => product,
            None => {
                let mut gone = snapshot.clone();
                gone.stock = 0;
                gone
            }
        };

        let outcome = cart.edit(|c| c.sync_product(&current))?;
        match outcome {
            StockSync::Clamped { .. } | StockSync::Removed => {
                info!(product_id = %snapshot.id, outcome = ?outcome, "Cart line changed by stock refresh");
                changes.push(LineSync {
                    product_id: snapshot.id,
                    product_name: current.name,
                    outcome,
                });
            }
            StockSync::Unchanged | StockSync::NotInCart => {}
        }
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support;

    fn request(product_id: &str, quantity: i64) -> AddToCartRequest {
        AddToCartRequest {
            product_id: product_id.into(),
            quantity,
            color: None,
            image_index: None,
            sections: Vec::new(),
            accessories: Vec::new(),
        }
    }

    fn galaxy_black() -> ColorWithName {
        ColorWithName::new("Galaxy Black", "#1a1a1a")
    }

    #[tokio::test]
    async fn test_add_with_color_and_accessory() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        let mut req = request("low-poly-fox", 2);
        req.color = Some(galaxy_black());
        req.accessories.push(AccessoryChoice {
            name: "Display stand".into(),
            color: Some("Snow White".into()),
            quantity: 1,
        });

        let view = add_to_cart(&db, &cart, req).await.unwrap();
        assert_eq!(view.total_items, 2);
        assert_eq!(view.total_amount.cents(), 3000);
        // 2 × 1500 + 2 × 1 × 400
        assert_eq!(view.subtotal.cents(), 3800);
        assert_eq!(view.items[0].line.selected_colors.len(), 1);
        assert!(view.items[0].line.selected_colors[0].same_color(&galaxy_black()));
    }

    #[tokio::test]
    async fn test_add_requires_color() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        let err = add_to_cart(&db, &cart, request("low-poly-fox", 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectionError);
        assert!(get_cart(&cart).items.is_empty());
    }

    #[tokio::test]
    async fn test_add_image_index_picks_color() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        let mut req = request("low-poly-fox", 1);
        req.image_index = Some(1);
        let view = add_to_cart(&db, &cart, req).await.unwrap();
        assert_eq!(view.items[0].line.selected_colors[0].name, "Signal Red");
    }

    #[tokio::test]
    async fn test_add_rejects_out_of_stock_color() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        let mut req = request("low-poly-fox", 1);
        req.color = Some(ColorWithName::new("Silk Gold", "#c9a227"));
        let err = add_to_cart(&db, &cart, req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectionError);
    }

    #[tokio::test]
    async fn test_sections_must_be_complete() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        let mut req = request("cottage-lamp", 1);
        req.sections.push(SectionChoice {
            section_id: "roof".into(),
            color_id: "signal-red".into(),
        });
        let err = add_to_cart(&db, &cart, req.clone()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectionError);
        assert!(err.message.contains("Walls"));

        req.sections.push(SectionChoice {
            section_id: "walls".into(),
            color_id: "snow-white".into(),
        });
        let view = add_to_cart(&db, &cart, req).await.unwrap();
        assert_eq!(view.items[0].line.selected_sections.len(), 2);
    }

    #[tokio::test]
    async fn test_colorless_line_is_a_selection_error_not_stock() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        // Sections mode with colors listed but no sections to pick them from
        let mut figure = test_support::catalog().remove(1);
        figure.id = "bare-figure".into();
        figure.name = "Bare Figure".into();
        figure.color_sections = Vec::new();
        figure.available_colors = vec![galaxy_black()];
        db.inner().products().upsert(&figure).await.unwrap();

        let err = add_to_cart(&db, &cart, request("bare-figure", 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SelectionError);
        assert!(err.message.contains("Bare Figure"));
        assert!(get_cart(&cart).items.is_empty());
    }

    #[tokio::test]
    async fn test_new_line_clamped_but_merge_refused() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        // Marble Planter: stock 3, no colors
        let view = add_to_cart(&db, &cart, request("marble-planter", 10))
            .await
            .unwrap();
        assert_eq!(view.total_items, 3);

        let err = add_to_cart(&db, &cart, request("marble-planter", 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(get_cart(&cart).total_items, 3);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        let err = add_to_cart(&db, &cart, request("marble-planter", 0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = add_to_cart(&db, &cart, request("missing", 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_update_remove_and_clear() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();
        add_to_cart(&db, &cart, request("marble-planter", 1))
            .await
            .unwrap();

        let view = update_cart_item(&cart, "marble-planter", 2).unwrap();
        assert_eq!(view.total_items, 2);

        // clamped from 2 to 3
        let view = update_cart_item(&cart, "marble-planter", 9).unwrap();
        assert_eq!(view.total_items, 3);

        // already at stock
        let err = update_cart_item(&cart, "marble-planter", 9).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err = update_cart_item(&cart, "missing", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let view = update_cart_item(&cart, "marble-planter", 0).unwrap();
        assert!(view.items.is_empty());

        add_to_cart(&db, &cart, request("marble-planter", 1))
            .await
            .unwrap();
        assert_eq!(remove_from_cart(&cart, "missing").unwrap().total_items, 1);
        assert!(clear_cart(&cart).unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_clamps_and_removes() {
        let db = test_support::db_state().await;
        let cart = test_support::cart_state();

        add_to_cart(&db, &cart, request("marble-planter", 3))
            .await
            .unwrap();
        let mut fox = request("low-poly-fox", 2);
        fox.color = Some(galaxy_black());
        add_to_cart(&db, &cart, fox).await.unwrap();

        db.inner().products().set_stock("marble-planter", 1).await.unwrap();
        db.inner().products().deactivate("low-poly-fox").await.unwrap();

        let refreshed = refresh_cart(&db, &cart).await.unwrap();
        assert_eq!(
            refreshed.changes,
            vec![
                LineSync {
                    product_id: "marble-planter".into(),
                    product_name: "Marble Planter".into(),
                    outcome: StockSync::Clamped { from: 3, to: 1 },
                },
                LineSync {
                    product_id: "low-poly-fox".into(),
                    product_name: "Low Poly Fox".into(),
                    outcome: StockSync::Removed,
                },
            ]
        );
        assert_eq!(refreshed.cart.total_items, 1);

        let again = refresh_cart(&db, &cart).await.unwrap();
        assert!(again.changes.is_empty());
    }
}
