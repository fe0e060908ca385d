//! # Procurement Repository
//!
//! Fulfillment procurements created for request lines. Each line can carry
//! two: one routed to the terminal's warehouse and a mirror against the
//! virtual stock location. Cancelling a line or a whole request cancels
//! them, but a procurement already fulfilled stays done.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use request_core::{Procurement, ProcurementState};

/// Repository for procurement records.
#[derive(Debug, Clone)]
pub struct ProcurementRepository {
    pool: SqlitePool,
}

impl ProcurementRepository {
    /// Creates a new ProcurementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProcurementRepository { pool }
    }

    /// Gets a procurement by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Procurement>> {
        let procurement = sqlx::query_as::<_, Procurement>(
            "SELECT id, origin, is_virtual, state, warehouse_id, location_id, created_at \
             FROM procurements WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(procurement)
    }

    /// Creates a confirmed procurement and returns it.
    ///
    /// ## Arguments
    /// * `origin` - Document that originated the demand (request number)
    /// * `is_virtual` - Mirror procurement against the virtual location
    pub async fn create(
        &self,
        origin: &str,
        is_virtual: bool,
        warehouse_id: Option<&str>,
        location_id: Option<&str>,
    ) -> DbResult<Procurement> {
        let procurement = Procurement {
            id: Uuid::new_v4().to_string(),
            origin: origin.to_string(),
            is_virtual,
            state: ProcurementState::Confirmed,
            warehouse_id: warehouse_id.map(str::to_string),
            location_id: location_id.map(str::to_string),
            created_at: Utc::now(),
        };

        debug!(id = %procurement.id, origin, is_virtual, "Creating procurement");

        sqlx::query(
            "INSERT INTO procurements \
             (id, origin, is_virtual, state, warehouse_id, location_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&procurement.id)
        .bind(&procurement.origin)
        .bind(procurement.is_virtual)
        .bind(procurement.state)
        .bind(&procurement.warehouse_id)
        .bind(&procurement.location_id)
        .bind(procurement.created_at)
        .execute(&self.pool)
        .await?;

        Ok(procurement)
    }

    /// Cancels a procurement unless it already reached a final state.
    ///
    /// Returns `true` when the cancellation was applied. A procurement that
    /// was already done (or cancelled) is left untouched and reports `false`.
    pub async fn cancel(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE procurements SET state = 'cancel' \
             WHERE id = ? AND state NOT IN ('done', 'cancel')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks a procurement fulfilled.
    pub async fn mark_done(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE procurements SET state = 'done' \
             WHERE id = ? AND state = 'confirmed'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
