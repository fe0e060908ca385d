//! # Product Repository
//!
//! Database operations for the product subset the pre-order flow needs:
//! lookups for line registration and the requestable-product listing the
//! terminal shows when `filter_products` is enabled.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use request_core::Product;

const PRODUCT_COLUMNS: &str = "id, sku, barcode, name, list_price_cents, \
     available_for_request, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by barcode.
    ///
    /// Used when the operator scans an item to pre-order.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ? AND is_active = 1"
        ))
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products that can be pre-ordered.
    ///
    /// ## Arguments
    /// * `requestable_only` - When the terminal filters products, only those
    ///   flagged `available_for_request` are returned
    /// * `limit` - Maximum results to return
    pub async fn list_requestable(
        &self,
        requestable_only: bool,
        limit: u32,
    ) -> DbResult<Vec<Product>> {
        debug!(requestable_only, limit, "Listing requestable products");

        let sql = if requestable_only {
            format!(
                "SELECT {PRODUCT_COLUMNS} FROM products \
                 WHERE is_active = 1 AND available_for_request = 1 \
                 ORDER BY name LIMIT ?"
            )
        } else {
            format!(
                "SELECT {PRODUCT_COLUMNS} FROM products \
                 WHERE is_active = 1 ORDER BY name LIMIT ?"
            )
        };

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            "INSERT INTO products ( \
                id, sku, barcode, name, list_price_cents, \
                available_for_request, is_active, created_at, updated_at \
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.list_price_cents)
        .bind(product.available_for_request)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Toggles the `available_for_request` flag.
    pub async fn set_available_for_request(&self, id: &str, available: bool) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            "UPDATE products SET available_for_request = ?, updated_at = ? WHERE id = ?",
        )
        .bind(available)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Generates a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(sku: &str, requestable: bool) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            sku: sku.to_string(),
            barcode: Some(format!("84{}", sku.len())),
            name: format!("Product {}", sku),
            list_price_cents: 1850,
            available_for_request: requestable,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = product("CAKE-CHOC", true);
        repo.insert(&p).await.unwrap();

        let found = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(found.sku, "CAKE-CHOC");
        assert_eq!(found.list_price_cents, 1850);
        assert!(found.available_for_request);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_requestable_honours_filter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("CAKE-CHOC", true)).await.unwrap();
        repo.insert(&product("BREAD-RYE", false)).await.unwrap();

        let all = repo.list_requestable(false, 10).await.unwrap();
        assert_eq!(all.len(), 2);

        let filtered = repo.list_requestable(true, 10).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].sku, "CAKE-CHOC");
    }

    #[tokio::test]
    async fn test_toggle_available_for_request() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let p = product("TART-APPLE", false);
        repo.insert(&p).await.unwrap();

        repo.set_available_for_request(&p.id, true).await.unwrap();
        let found = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert!(found.available_for_request);
    }
}
