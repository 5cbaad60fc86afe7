//! # Product Repository
//!
//! Catalog reads for the storefront, plus the writes the seed binary needs.
//!
//! ## Row Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products row                          Product                          │
//! │  ────────────                          ───────                          │
//! │  id, name, price_cents ──────────────► same                             │
//! │  stock INTEGER ──────────────────────► u32 (negative → 0)               │
//! │  color_mode TEXT ────────────────────► ColorMode                        │
//! │  images / available_colors /                                            │
//! │  color_sections / accessories /                                         │
//! │  bulk_pricing_rules (JSON TEXT) ─────► Vec<_> via serde_json            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use layerline_core::{ColorMode, Product};

const PRODUCT_COLUMNS: &str = r#"
    id, name, price_cents, original_price_cents, stock, color_mode,
    images, available_colors, color_sections, accessories, bulk_pricing_rules
"#;

/// Raw `products` row.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    price_cents: i64,
    original_price_cents: Option<i64>,
    stock: i64,
    color_mode: String,
    images: String,
    available_colors: String,
    color_sections: String,
    accessories: String,
    bulk_pricing_rules: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        let id = row.id.as_str();

        Ok(Product {
            color_mode: parse_color_mode(id, &row.color_mode)?,
            available_colors: decode_list(id, "available_colors", &row.available_colors)?,
            color_sections: decode_list(id, "color_sections", &row.color_sections)?,
            accessories: decode_list(id, "accessories", &row.accessories)?,
            bulk_pricing_rules: decode_list(id, "bulk_pricing_rules", &row.bulk_pricing_rules)?,
            images: decode_list(id, "images", &row.images)?,
            stock: u32::try_from(row.stock.max(0)).unwrap_or(u32::MAX),
            id: row.id,
            name: row.name,
            price_cents: row.price_cents,
            original_price_cents: row.original_price_cents,
        })
    }
}

fn decode_list<T: DeserializeOwned>(id: &str, column: &str, raw: &str) -> DbResult<Vec<T>> {
    serde_json::from_str(raw).map_err(|e| DbError::invalid("product", id, format!("{}: {}", column, e)))
}

fn encode<T: Serialize>(id: &str, value: &T) -> DbResult<String> {
    serde_json::to_string(value).map_err(|e| DbError::invalid("product", id, e))
}

fn parse_color_mode(id: &str, raw: &str) -> DbResult<ColorMode> {
    match raw {
        "default" => Ok(ColorMode::Default),
        "sections" => Ok(ColorMode::Sections),
        "disabled" => Ok(ColorMode::Disabled),
        other => Err(DbError::invalid(
            "product",
            id,
            format!("unknown color mode '{}'", other),
        )),
    }
}

fn color_mode_str(mode: ColorMode) -> &'static str {
    match mode {
        ColorMode::Default => "default",
        ColorMode::Sections => "sections",
        ColorMode::Disabled => "disabled",
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_id("low-poly-fox").await?;
/// let page = repo.list_active(50).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets an active product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - No such product, or it was deactivated
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE id = ?1 AND is_active = 1",
            PRODUCT_COLUMNS
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Lists active products by name.
    ///
    /// Rows that no longer decode are skipped with a warning so one bad row
    /// cannot empty the catalog page.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        let products: Vec<Product> = rows
            .into_iter()
            .filter_map(|row| match Product::try_from(row) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable product row");
                    None
                }
            })
            .collect();

        debug!(count = products.len(), "Listed active products");
        Ok(products)
    }

    /// Inserts or replaces a product.
    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Upserting product");

        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price_cents, original_price_cents, stock, color_mode,
                images, available_colors, color_sections, accessories, bulk_pricing_rules,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, ?12, ?12)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                price_cents = excluded.price_cents,
                original_price_cents = excluded.original_price_cents,
                stock = excluded.stock,
                color_mode = excluded.color_mode,
                images = excluded.images,
                available_colors = excluded.available_colors,
                color_sections = excluded.color_sections,
                accessories = excluded.accessories,
                bulk_pricing_rules = excluded.bulk_pricing_rules,
                is_active = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.original_price_cents)
        .bind(i64::from(product.stock))
        .bind(color_mode_str(product.color_mode))
        .bind(encode(&product.id, &product.images)?)
        .bind(encode(&product.id, &product.available_colors)?)
        .bind(encode(&product.id, &product.color_sections)?)
        .bind(encode(&product.id, &product.accessories)?)
        .bind(encode(&product.id, &product.bulk_pricing_rules)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Sets a product's stock.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No such product
    pub async fn set_stock(&self, id: &str, stock: u32) -> DbResult<()> {
        debug!(id = %id, stock, "Setting product stock");

        let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(i64::from(stock))
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Hides a product from the storefront.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use layerline_core::{Accessory, BulkPricingRule, ColorSection, ColorWithName};

    fn cottage() -> Product {
        Product {
            id: "cottage".into(),
            name: "Cottage".into(),
            price_cents: 4500,
            original_price_cents: Some(5000),
            stock: 7,
            images: vec!["cottage.png".into()],
            available_colors: vec![ColorWithName::new("Red", "#ff0000")],
            color_mode: ColorMode::Sections,
            color_sections: vec![ColorSection {
                id: "roof".into(),
                label: "Roof".into(),
                color_ids: vec!["red".into()],
            }],
            accessories: vec![Accessory {
                name: "LED kit".into(),
                price_cents: 900,
                original_price_cents: None,
            }],
            bulk_pricing_rules: vec![BulkPricingRule {
                min_quantity: 5,
                unit_price_cents: 4000,
            }],
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_get_round_trip() {
        let db = db().await;
        let repo = db.products();

        repo.upsert(&cottage()).await.unwrap();
        let loaded = repo.get_by_id("cottage").await.unwrap().unwrap();
        assert_eq!(loaded, cottage());

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_stock_and_deactivate() {
        let db = db().await;
        let repo = db.products();
        repo.upsert(&cottage()).await.unwrap();

        repo.set_stock("cottage", 2).await.unwrap();
        assert_eq!(repo.get_by_id("cottage").await.unwrap().unwrap().stock, 2);

        assert!(matches!(
            repo.set_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));

        repo.deactivate("cottage").await.unwrap();
        assert!(repo.get_by_id("cottage").await.unwrap().is_none());
        assert!(repo.list_active(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_rows() {
        let db = db().await;
        let repo = db.products();
        repo.upsert(&cottage()).await.unwrap();

        sqlx::query(
            "INSERT INTO products (id, name, price_cents, stock, accessories) VALUES ('bad', 'Aardvark', 100, 1, 'not json')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let products = repo.list_active(10).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "cottage");

        assert!(matches!(
            repo.get_by_id("bad").await,
            Err(DbError::InvalidData { .. })
        ));
    }

    #[tokio::test]
    async fn test_each_json_column_decodes_to_its_type() {
        let db = db().await;
        let repo = db.products();
        repo.upsert(&cottage()).await.unwrap();

        let loaded = repo.get_by_id("cottage").await.unwrap().unwrap();
        assert_eq!(loaded.images, vec!["cottage.png".to_string()]);
        assert!(loaded.available_colors[0].same_color(&ColorWithName::new("Red", "#ff0000")));
        assert_eq!(loaded.color_sections[0].color_ids, vec!["red".to_string()]);
        assert_eq!(loaded.accessories[0].price_cents, 900);
        assert_eq!(loaded.bulk_pricing_rules[0].min_quantity, 5);

        for column in ["images", "color_sections", "bulk_pricing_rules"] {
            sqlx::query(&format!(
                "UPDATE products SET {} = '{{}}' WHERE id = 'cottage'",
                column
            ))
            .execute(db.pool())
            .await
            .unwrap();

            match repo.get_by_id("cottage").await {
                Err(DbError::InvalidData { reason, .. }) => assert!(reason.starts_with(column)),
                other => panic!("{}: expected InvalidData, got {:?}", column, other),
            }
            repo.upsert(&cottage()).await.unwrap();
        }
    }
}
