//! # Tax Repository
//!
//! Taxes, product-tax links and fiscal positions. Line registration goes
//! through [`TaxRepository::resolve_for_product`], which performs the full
//! lookup-filter-map pipeline and returns the taxes actually applicable.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use request_core::tax::{resolve_line_taxes, FiscalPosition, Tax, TaxMapping};
use request_core::validation::validate_tax_rate_bps;
use request_core::CoreError;

const TAX_COLUMNS: &str = "id, name, rate_bps, price_included, company_id, is_active";

/// Repository for taxes and fiscal positions.
#[derive(Debug, Clone)]
pub struct TaxRepository {
    pool: SqlitePool,
}

impl TaxRepository {
    /// Creates a new TaxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxRepository { pool }
    }

    /// Gets a tax by ID.
    pub async fn get_tax(&self, id: &str) -> DbResult<Option<Tax>> {
        let tax = sqlx::query_as::<_, Tax>(&format!(
            "SELECT {TAX_COLUMNS} FROM taxes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tax)
    }

    /// Inserts a tax. The rate must not exceed 100%.
    pub async fn insert_tax(&self, tax: &Tax) -> DbResult<()> {
        validate_tax_rate_bps(tax.rate_bps).map_err(CoreError::Validation)?;

        debug!(id = %tax.id, name = %tax.name, "Inserting tax");

        sqlx::query(
            "INSERT INTO taxes (id, name, rate_bps, price_included, company_id, is_active) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&tax.id)
        .bind(&tax.name)
        .bind(tax.rate_bps)
        .bind(tax.price_included)
        .bind(&tax.company_id)
        .bind(tax.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Attaches a nominal tax to a product.
    pub async fn link_product_tax(&self, product_id: &str, tax_id: &str) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO product_taxes (product_id, tax_id) VALUES (?, ?)")
            .bind(product_id)
            .bind(tax_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Lists the active taxes nominally attached to a product.
    pub async fn taxes_for_product(&self, product_id: &str) -> DbResult<Vec<Tax>> {
        let taxes = sqlx::query_as::<_, Tax>(
            "SELECT t.id, t.name, t.rate_bps, t.price_included, t.company_id, t.is_active \
             FROM taxes t \
             JOIN product_taxes pt ON pt.tax_id = t.id \
             WHERE pt.product_id = ? AND t.is_active = 1 \
             ORDER BY t.name",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(taxes)
    }

    /// Inserts a fiscal position along with its substitution rules.
    pub async fn insert_fiscal_position(&self, fpos: &FiscalPosition) -> DbResult<()> {
        debug!(id = %fpos.id, rules = fpos.mappings.len(), "Inserting fiscal position");

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO fiscal_positions (id, name) VALUES (?, ?)")
            .bind(&fpos.id)
            .bind(&fpos.name)
            .execute(&mut *tx)
            .await?;

        for mapping in &fpos.mappings {
            sqlx::query(
                "INSERT INTO fiscal_position_taxes \
                 (fiscal_position_id, src_tax_id, dst_tax_id) VALUES (?, ?, ?)",
            )
            .bind(&fpos.id)
            .bind(&mapping.src_tax_id)
            .bind(&mapping.dst_tax_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a fiscal position with its substitution rules.
    pub async fn get_fiscal_position(&self, id: &str) -> DbResult<Option<FiscalPosition>> {
        let header: Option<(String, String)> =
            sqlx::query_as("SELECT id, name FROM fiscal_positions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, name)) = header else {
            return Ok(None);
        };

        let rows: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT src_tax_id, dst_tax_id FROM fiscal_position_taxes \
             WHERE fiscal_position_id = ?",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;

        let mappings = rows
            .into_iter()
            .map(|(src_tax_id, dst_tax_id)| TaxMapping {
                src_tax_id,
                dst_tax_id,
            })
            .collect();

        Ok(Some(FiscalPosition { id, name, mappings }))
    }

    /// Resolves the taxes applicable to a line for the given product.
    ///
    /// Pipeline: product's nominal taxes → company filter → fiscal-position
    /// substitution. Replacement taxes are prefetched so the mapping itself
    /// stays a pure in-memory step.
    pub async fn resolve_for_product(
        &self,
        product_id: &str,
        company_id: Option<&str>,
        fiscal_position_id: Option<&str>,
    ) -> DbResult<Vec<Tax>> {
        let product_taxes = self.taxes_for_product(product_id).await?;

        let fpos = match fiscal_position_id {
            Some(id) => self.get_fiscal_position(id).await?,
            None => None,
        };

        // Prefetch every replacement tax the position could map to.
        let mut replacements: Vec<Tax> = Vec::new();
        if let Some(fpos) = &fpos {
            for mapping in &fpos.mappings {
                if let Some(dst_id) = &mapping.dst_tax_id {
                    if let Some(tax) = self.get_tax(dst_id).await? {
                        replacements.push(tax);
                    }
                }
            }
        }

        let resolved = resolve_line_taxes(&product_taxes, company_id, fpos.as_ref(), |id| {
            replacements.iter().find(|t| t.id == id).cloned()
        });

        Ok(resolved)
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
    use request_core::Product;
    use uuid::Uuid;

    fn tax(id: &str, bps: u32) -> Tax {
        Tax {
            id: id.to_string(),
            name: format!("VAT {}", bps / 100),
            rate_bps: bps,
            price_included: false,
            company_id: None,
            is_active: true,
        }
    }

    async fn seed_product(db: &Database) -> String {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: "CAKE-CHOC".to_string(),
            barcode: None,
            name: "Chocolate cake".to_string(),
            list_price_cents: 1850,
            available_for_request: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn test_taxes_for_product_skips_inactive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.taxes();
        let product_id = seed_product(&db).await;

        repo.insert_tax(&tax("vat21", 2100)).await.unwrap();
        let mut dormant = tax("old", 1600);
        dormant.is_active = false;
        repo.insert_tax(&dormant).await.unwrap();

        repo.link_product_tax(&product_id, "vat21").await.unwrap();
        repo.link_product_tax(&product_id, "old").await.unwrap();

        let taxes = repo.taxes_for_product(&product_id).await.unwrap();
        assert_eq!(taxes.len(), 1);
        assert_eq!(taxes[0].id, "vat21");
    }

    #[tokio::test]
    async fn test_insert_tax_rejects_rate_over_hundred_percent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.taxes();

        let err = repo.insert_tax(&tax("vat120", 12000)).await;
        assert!(matches!(
            err,
            Err(crate::error::DbError::Core(CoreError::Validation(_)))
        ));

        // Boundary: exactly 100% is allowed
        assert!(repo.insert_tax(&tax("vat100", 10000)).await.is_ok());
    }

    #[tokio::test]
    async fn test_fiscal_position_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.taxes();

        repo.insert_tax(&tax("vat21", 2100)).await.unwrap();
        repo.insert_tax(&tax("vat10", 1000)).await.unwrap();

        let fpos = FiscalPosition {
            id: "fp-reduced".to_string(),
            name: "Reduced regime".to_string(),
            mappings: vec![TaxMapping {
                src_tax_id: "vat21".to_string(),
                dst_tax_id: Some("vat10".to_string()),
            }],
        };
        repo.insert_fiscal_position(&fpos).await.unwrap();

        let loaded = repo.get_fiscal_position("fp-reduced").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Reduced regime");
        assert_eq!(loaded.mappings.len(), 1);
        assert_eq!(loaded.mappings[0].dst_tax_id.as_deref(), Some("vat10"));

        assert!(repo.get_fiscal_position("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_for_product_substitutes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.taxes();
        let product_id = seed_product(&db).await;

        repo.insert_tax(&tax("vat21", 2100)).await.unwrap();
        repo.insert_tax(&tax("vat10", 1000)).await.unwrap();
        repo.link_product_tax(&product_id, "vat21").await.unwrap();

        repo.insert_fiscal_position(&FiscalPosition {
            id: "fp-reduced".to_string(),
            name: "Reduced regime".to_string(),
            mappings: vec![TaxMapping {
                src_tax_id: "vat21".to_string(),
                dst_tax_id: Some("vat10".to_string()),
            }],
        })
        .await
        .unwrap();

        // Without a position the nominal tax applies
        let nominal = repo
            .resolve_for_product(&product_id, None, None)
            .await
            .unwrap();
        assert_eq!(nominal.len(), 1);
        assert_eq!(nominal[0].id, "vat21");

        // With the position the replacement applies
        let mapped = repo
            .resolve_for_product(&product_id, None, Some("fp-reduced"))
            .await
            .unwrap();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].id, "vat10");
    }

    #[tokio::test]
    async fn test_resolve_for_product_drops_exempted_tax() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.taxes();
        let product_id = seed_product(&db).await;

        repo.insert_tax(&tax("vat21", 2100)).await.unwrap();
        repo.link_product_tax(&product_id, "vat21").await.unwrap();

        repo.insert_fiscal_position(&FiscalPosition {
            id: "fp-exempt".to_string(),
            name: "Export exemption".to_string(),
            mappings: vec![TaxMapping {
                src_tax_id: "vat21".to_string(),
                dst_tax_id: None,
            }],
        })
        .await
        .unwrap();

        let mapped = repo
            .resolve_for_product(&product_id, None, Some("fp-exempt"))
            .await
            .unwrap();
        assert!(mapped.is_empty());
    }
}
