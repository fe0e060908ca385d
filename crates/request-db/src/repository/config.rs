//! # Terminal Configuration Repository
//!
//! Load/store of per-terminal pre-order settings, consulted by the POS
//! session at opening time (load window, procurement toggles, required
//! fields) and during line registration (fiscal position, product filter).

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use request_core::{Product, RequestConfig};

const CONFIG_COLUMNS: &str = "id, name, request_product_id, previous_days, \
     create_procurements, warehouse_id, virtual_location_id, allow_reference, \
     filter_products, show_all, customer_required, delivery_date_required, \
     default_fiscal_position_id";

/// Repository for terminal configuration records.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: SqlitePool,
}

impl ConfigRepository {
    /// Creates a new ConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConfigRepository { pool }
    }

    /// Gets a terminal configuration by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<RequestConfig>> {
        let config = sqlx::query_as::<_, RequestConfig>(&format!(
            "SELECT {CONFIG_COLUMNS} FROM pos_configs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    /// Inserts or replaces a terminal configuration.
    pub async fn upsert(&self, config: &RequestConfig) -> DbResult<()> {
        debug!(id = %config.id, "Storing terminal configuration");

        sqlx::query(
            "INSERT OR REPLACE INTO pos_configs ( \
                id, name, request_product_id, previous_days, \
                create_procurements, warehouse_id, virtual_location_id, \
                allow_reference, filter_products, show_all, \
                customer_required, delivery_date_required, \
                default_fiscal_position_id \
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&config.id)
        .bind(&config.name)
        .bind(&config.request_product_id)
        .bind(config.previous_days)
        .bind(config.create_procurements)
        .bind(&config.warehouse_id)
        .bind(&config.virtual_location_id)
        .bind(config.allow_reference)
        .bind(config.filter_products)
        .bind(config.show_all)
        .bind(config.customer_required)
        .bind(config.delivery_date_required)
        .bind(&config.default_fiscal_position_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolves the terminal's generic "request" product used to collect
    /// pre-order payments at the till.
    ///
    /// Defensive lookup: a terminal without the setting, or pointing at a
    /// product that no longer exists, yields `None` instead of an error so
    /// the session can still open.
    pub async fn default_request_product(&self, config_id: &str) -> DbResult<Option<Product>> {
        let Some(config) = self.get(config_id).await? else {
            return Ok(None);
        };

        let Some(product_id) = config.request_product_id else {
            return Ok(None);
        };

        let product = sqlx::query_as::<_, Product>(
            "SELECT id, sku, barcode, name, list_price_cents, \
                    available_for_request, is_active, created_at, updated_at \
             FROM products WHERE id = ?",
        )
        .bind(&product_id)
        .fetch_optional(&self.pool)
        .await?;

        if product.is_none() {
            warn!(config_id, product_id = %product_id, "Configured request product missing");
        }

        Ok(product)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use uuid::Uuid;

    fn config(id: &str) -> RequestConfig {
        RequestConfig {
            id: id.to_string(),
            name: "Main till".to_string(),
            request_product_id: None,
            previous_days: RequestConfig::DEFAULT_PREVIOUS_DAYS,
            create_procurements: false,
            warehouse_id: None,
            virtual_location_id: None,
            allow_reference: true,
            filter_products: false,
            show_all: false,
            customer_required: false,
            delivery_date_required: false,
            default_fiscal_position_id: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.configs();

        repo.upsert(&config("terminal-1")).await.unwrap();

        let loaded = repo.get("terminal-1").await.unwrap().unwrap();
        assert_eq!(loaded.previous_days, 15);
        assert!(loaded.allow_reference);
        assert!(!loaded.customer_required);

        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_default_request_product_tolerates_missing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.configs();

        // No configuration at all
        assert!(repo
            .default_request_product("terminal-1")
            .await
            .unwrap()
            .is_none());

        // Configuration without a product
        repo.upsert(&config("terminal-1")).await.unwrap();
        assert!(repo
            .default_request_product("terminal-1")
            .await
            .unwrap()
            .is_none());

        // Configuration pointing at a product that no longer exists
        let mut cfg = config("terminal-1");
        cfg.request_product_id = Some(Uuid::new_v4().to_string());
        repo.upsert(&cfg).await.unwrap();
        assert!(repo
            .default_request_product("terminal-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_default_request_product_resolves() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: "REQUEST".to_string(),
            barcode: None,
            name: "Pre-order deposit".to_string(),
            list_price_cents: 0,
            available_for_request: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();

        let mut cfg = config("terminal-1");
        cfg.request_product_id = Some(product.id.clone());
        db.configs().upsert(&cfg).await.unwrap();

        let found = db
            .configs()
            .default_request_product("terminal-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.sku, "REQUEST");
    }
}
