//! # Catalog Commands
//!
//! Product reads for the storefront grid and the customization panel.

use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use layerline_core::selection::{product_options, ProductOptions};
use layerline_core::Product;

/// Default page size for the product grid.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page a client may ask for.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Lists active products by name.
///
/// ## Arguments
/// * `limit` - Page size (default 50, capped at 200)
pub async fn list_products(db: &DbState, limit: Option<u32>) -> Result<Vec<Product>, ApiError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    debug!(limit, "list_products command");

    Ok(db.inner().products().list_active(limit).await?)
}

/// Gets one active product.
pub async fn get_product(db: &DbState, id: &str) -> Result<Product, ApiError> {
    db.inner()
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", id))
}

/// Resolves a product's colors and sections against the color registry.
///
/// Colors deleted from the registry are left out; colors marked out of
/// stock come back with `selectable: false`.
pub async fn get_product_options(db: &DbState, id: &str) -> Result<ProductOptions, ApiError> {
    debug!(product_id = %id, "get_product_options command");

    let product = get_product(db, id).await?;
    let registry = db.inner().colors().registry().await?;
    Ok(product_options(&product, &registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support;

    #[tokio::test]
    async fn test_list_products_sorted_by_name() {
        let db = test_support::db_state().await;

        let products = list_products(&db, None).await.unwrap();
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cottage Lamp", "Low Poly Fox", "Marble Planter"]);

        assert_eq!(list_products(&db, Some(0)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_options_drop_deleted_and_flag_out_of_stock() {
        let db = test_support::db_state().await;

        let options = get_product_options(&db, "low-poly-fox").await.unwrap();
        let names: Vec<(&str, bool)> = options
            .colors
            .iter()
            .map(|o| (o.color.name.as_str(), o.selectable))
            .collect();
        // "Discontinued Pink" is not in the registry
        assert_eq!(
            names,
            vec![("Galaxy Black", true), ("Signal Red", true), ("Silk Gold", false)]
        );

        let lamp = get_product_options(&db, "cottage-lamp").await.unwrap();
        assert_eq!(lamp.sections.len(), 2);
        assert!(lamp.colors.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_support::db_state().await;
        let err = get_product_options(&db, "nope").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
