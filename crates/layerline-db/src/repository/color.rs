//! # Color Registry Repository
//!
//! The master list of filament colors. Products reference these by hex code
//! or by name; availability lives here, not on the product.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use layerline_core::RegistryColor;

#[derive(Debug, sqlx::FromRow)]
struct ColorRow {
    id: String,
    name: String,
    hex: String,
    in_stock: bool,
}

impl From<ColorRow> for RegistryColor {
    fn from(row: ColorRow) -> Self {
        RegistryColor {
            id: row.id,
            name: row.name,
            hex: row.hex,
            in_stock: row.in_stock,
        }
    }
}

/// Repository for the color registry.
#[derive(Debug, Clone)]
pub struct ColorRepository {
    pool: SqlitePool,
}

impl ColorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ColorRepository { pool }
    }

    /// Returns the whole registry ordered by name, out-of-stock colors
    /// included (the storefront shows them disabled).
    pub async fn registry(&self) -> DbResult<Vec<RegistryColor>> {
        let rows = sqlx::query_as::<_, ColorRow>(
            "SELECT id, name, hex, in_stock FROM colors ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded color registry");
        Ok(rows.into_iter().map(RegistryColor::from).collect())
    }

    /// Inserts or replaces a registry color.
    pub async fn upsert(&self, color: &RegistryColor) -> DbResult<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO colors (id, name, hex, in_stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                hex = excluded.hex,
                in_stock = excluded.in_stock,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&color.id)
        .bind(&color.name)
        .bind(&color.hex)
        .bind(color.in_stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks a color as available or exhausted.
    pub async fn set_in_stock(&self, id: &str, in_stock: bool) -> DbResult<()> {
        debug!(id = %id, in_stock, "Updating color availability");

        let result = sqlx::query("UPDATE colors SET in_stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(in_stock)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Color", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn color(id: &str, name: &str, hex: &str) -> RegistryColor {
        RegistryColor {
            id: id.into(),
            name: name.into(),
            hex: hex.into(),
            in_stock: true,
        }
    }

    #[tokio::test]
    async fn test_registry_is_ordered_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.colors();

        repo.upsert(&color("white", "white", "#ffffff")).await.unwrap();
        repo.upsert(&color("black", "Galaxy Black", "#1a1a1a")).await.unwrap();

        let names: Vec<String> = repo
            .registry()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Galaxy Black", "white"]);
    }

    #[tokio::test]
    async fn test_set_in_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.colors();
        repo.upsert(&color("red", "Red", "#ff0000")).await.unwrap();

        repo.set_in_stock("red", false).await.unwrap();
        assert!(!repo.registry().await.unwrap()[0].in_stock);

        assert!(matches!(
            repo.set_in_stock("teal", false).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
