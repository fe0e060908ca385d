//! # Request Repository
//!
//! The pre-order lifecycle lives here: registration, line management, tax
//! resolution, prepayments, fulfillment transitions and order finalization.
//!
//! ## Lifecycle Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_request ──► add_line ──► set_prepaid                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mark_line_done (fulfillment) ── all lines ready? ──► to_deliver       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mark_delivered ──► finalize_order / mark_done                         │
//! │                                                                         │
//! │  cancel_line / cancel_request propagate to procurements                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Guards
//! Every transition is a guarded UPDATE (`WHERE state = ...`). Zero affected
//! rows means the entity was missing or in the wrong state; the caller gets
//! a NotFound carrying the expected state so races stay visible.

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use request_core::tax::Tax;
use request_core::validation::{
    validate_line_count, validate_prepaid_cents, validate_price_cents, validate_quantity,
    validate_request_against_config, validate_requestable_product,
};
use request_core::{
    can_deliver, compute_line_totals, parse_order_lines, requests_to_finalize,
    sum_request_totals, CoreError, Currency, LineState, Money, OrderLinePayload, Partner,
    Request, RequestConfig, RequestLine, RequestState, DEFAULT_COMPANY_ID,
};

const REQUEST_COLUMNS: &str = "id, number, partner_id, home_delivery_partner_id, reference, \
     barcode, state, prepaid_cents, amount_due_cents, untaxed_cents, tax_cents, total_cents, \
     receipt_snapshot, delivery_notes, user_id, session_id, config_id, company_id, \
     currency_code, created_at, deliver_by, cancelled_at, delivered_at, updated_at";

const LINE_COLUMNS: &str = "id, request_id, product_id, company_id, currency_code, quantity, \
     note, price_unit_cents, subtotal_cents, tax_cents, total_cents, procurement_id, \
     virtual_procurement_id, state, created_at";

// =============================================================================
// Input Types
// =============================================================================

/// Input for registering a new request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub partner_id: Option<String>,
    pub home_delivery_partner_id: Option<String>,
    pub reference: Option<String>,
    pub barcode: Option<String>,
    pub prepaid_cents: i64,
    pub receipt_snapshot: Option<String>,
    pub delivery_notes: Option<String>,
    pub user_id: String,
    pub session_id: String,
    pub config_id: String,
    pub deliver_by: Option<DateTime<Utc>>,
}

impl NewRequest {
    /// Minimal input: operator, session and terminal.
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        config_id: impl Into<String>,
    ) -> Self {
        NewRequest {
            partner_id: None,
            home_delivery_partner_id: None,
            reference: None,
            barcode: None,
            prepaid_cents: 0,
            receipt_snapshot: None,
            delivery_notes: None,
            user_id: user_id.into(),
            session_id: session_id.into(),
            config_id: config_id.into(),
            deliver_by: None,
        }
    }
}

/// Input for registering a line on an existing request.
#[derive(Debug, Clone)]
pub struct NewLine {
    pub request_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub note: Option<String>,
    /// Unit price override; defaults to the product's list price.
    pub price_unit_cents: Option<i64>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for request and request-line operations.
#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: SqlitePool,
}

impl RequestRepository {
    /// Creates a new RequestRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RequestRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Registers a new request against a terminal configuration.
    ///
    /// Validates the input against the terminal's toggles
    /// (customer/delivery-date required, reference allowed) and assigns a
    /// sequential request number.
    pub async fn create_request(&self, new: NewRequest) -> DbResult<Request> {
        let config = self
            .load_config(&new.config_id)
            .await?
            .ok_or_else(|| DbError::not_found("Terminal configuration", &new.config_id))?;

        validate_request_against_config(
            &config,
            new.partner_id.as_deref(),
            new.deliver_by,
            new.reference.as_deref(),
        )
        .map_err(CoreError::Validation)?;
        validate_prepaid_cents(new.prepaid_cents).map_err(CoreError::Validation)?;

        let now = Utc::now();
        let number = self.next_request_number(&new.config_id, &new.session_id, now).await?;

        let request = Request {
            id: Uuid::new_v4().to_string(),
            number,
            partner_id: new.partner_id,
            home_delivery_partner_id: new.home_delivery_partner_id,
            reference: new.reference,
            barcode: new.barcode,
            state: RequestState::InProgress,
            prepaid_cents: new.prepaid_cents,
            amount_due_cents: -new.prepaid_cents,
            untaxed_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            receipt_snapshot: new.receipt_snapshot,
            delivery_notes: new.delivery_notes,
            user_id: new.user_id,
            session_id: new.session_id,
            config_id: new.config_id,
            company_id: DEFAULT_COMPANY_ID.to_string(),
            currency_code: "EUR".to_string(),
            created_at: now,
            deliver_by: new.deliver_by,
            cancelled_at: None,
            delivered_at: None,
            updated_at: now,
        };

        info!(id = %request.id, number = %request.number, "Registering request");

        sqlx::query(&format!(
            "INSERT INTO requests ({REQUEST_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&request.id)
        .bind(&request.number)
        .bind(&request.partner_id)
        .bind(&request.home_delivery_partner_id)
        .bind(&request.reference)
        .bind(&request.barcode)
        .bind(request.state)
        .bind(request.prepaid_cents)
        .bind(request.amount_due_cents)
        .bind(request.untaxed_cents)
        .bind(request.tax_cents)
        .bind(request.total_cents)
        .bind(&request.receipt_snapshot)
        .bind(&request.delivery_notes)
        .bind(&request.user_id)
        .bind(&request.session_id)
        .bind(&request.config_id)
        .bind(&request.company_id)
        .bind(&request.currency_code)
        .bind(request.created_at)
        .bind(request.deliver_by)
        .bind(request.cancelled_at)
        .bind(request.delivered_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(request)
    }

    /// Assigns the next request number: `R-YYYYMMDD-SS-NNNN`, where SS is a
    /// session suffix and NNNN a per-terminal daily sequence.
    async fn next_request_number(
        &self,
        config_id: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<String> {
        let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();

        let today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM requests WHERE config_id = ? AND created_at >= ?",
        )
        .bind(config_id)
        .bind(day_start)
        .fetch_one(&self.pool)
        .await?;

        let suffix: String = session_id
            .chars()
            .rev()
            .take(2)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        Ok(format!(
            "R-{}-{:0>2}-{:04}",
            now.format("%Y%m%d"),
            suffix,
            today + 1
        ))
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Gets a request by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Request>> {
        let request = sqlx::query_as::<_, Request>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Gets a request by its pickup-ticket barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Request>> {
        let request = sqlx::query_as::<_, Request>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE barcode = ?"
        ))
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Lists requests created on or after the cutoff, newest first.
    ///
    /// ## Arguments
    /// * `cutoff` - Usually [`RequestConfig::load_window_start`]
    /// * `config_id` - Restrict to one terminal; `None` loads every store's
    ///   requests (the `show_all` toggle)
    pub async fn list_since(
        &self,
        cutoff: DateTime<Utc>,
        config_id: Option<&str>,
        limit: u32,
    ) -> DbResult<Vec<Request>> {
        debug!(%cutoff, ?config_id, limit, "Loading request window");

        let requests = match config_id {
            Some(config_id) => {
                sqlx::query_as::<_, Request>(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM requests \
                     WHERE created_at >= ? AND config_id = ? \
                     ORDER BY created_at DESC LIMIT ?"
                ))
                .bind(cutoff)
                .bind(config_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Request>(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM requests \
                     WHERE created_at >= ? ORDER BY created_at DESC LIMIT ?"
                ))
                .bind(cutoff)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(requests)
    }

    /// Gets the lines of a request in registration order.
    pub async fn get_lines(&self, request_id: &str) -> DbResult<Vec<RequestLine>> {
        let lines = sqlx::query_as::<_, RequestLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM request_lines \
             WHERE request_id = ? ORDER BY created_at, id"
        ))
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets the taxes resolved for a line at registration time.
    pub async fn line_taxes(&self, line_id: &str) -> DbResult<Vec<Tax>> {
        let taxes = sqlx::query_as::<_, Tax>(
            "SELECT t.id, t.name, t.rate_bps, t.price_included, t.company_id, t.is_active \
             FROM taxes t \
             JOIN request_line_taxes rlt ON rlt.tax_id = t.id \
             WHERE rlt.line_id = ?",
        )
        .bind(line_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(taxes)
    }

    // -------------------------------------------------------------------------
    // Partners
    // -------------------------------------------------------------------------

    /// Inserts a customer record.
    pub async fn insert_partner(&self, partner: &Partner) -> DbResult<()> {
        sqlx::query("INSERT INTO partners (id, name, fiscal_position_id) VALUES (?, ?, ?)")
            .bind(&partner.id)
            .bind(&partner.name)
            .bind(&partner.fiscal_position_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get_partner(&self, id: &str) -> DbResult<Option<Partner>> {
        let partner = sqlx::query_as::<_, Partner>(
            "SELECT id, name, fiscal_position_id FROM partners WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(partner)
    }

    // -------------------------------------------------------------------------
    // Line Registration
    // -------------------------------------------------------------------------

    /// Registers a line on an editable request.
    ///
    /// ## What This Does
    /// 1. Checks the request still accepts edits and the product exists
    /// 2. Applies the terminal's product filter and quantity/price rules
    /// 3. Resolves taxes: terminal's fiscal position wins, customer's is the
    ///    fallback
    /// 4. Creates procurements when the terminal is configured to
    /// 5. Computes line totals and refreshes the request header amounts
    pub async fn add_line(&self, new: NewLine) -> DbResult<RequestLine> {
        let request = self
            .get_by_id(&new.request_id)
            .await?
            .ok_or_else(|| CoreError::RequestNotFound(new.request_id.clone()))?;

        if !request.is_editable() {
            return Err(CoreError::InvalidRequestState {
                request_id: request.id.clone(),
                current_state: request.state.as_str().to_string(),
            }
            .into());
        }

        let config = self
            .load_config(&request.config_id)
            .await?
            .ok_or_else(|| DbError::not_found("Terminal configuration", &request.config_id))?;

        let product = sqlx::query_as::<_, request_core::Product>(
            "SELECT id, sku, barcode, name, list_price_cents, available_for_request, \
             is_active, created_at, updated_at FROM products WHERE id = ?",
        )
        .bind(&new.product_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(new.product_id.clone()))?;

        validate_requestable_product(&config, &product)?;
        validate_quantity(new.quantity).map_err(CoreError::Validation)?;

        let existing = self.get_lines(&request.id).await?;
        validate_line_count(existing.len())?;

        let price_unit_cents = new.price_unit_cents.unwrap_or(product.list_price_cents);
        validate_price_cents(price_unit_cents).map_err(CoreError::Validation)?;

        // Terminal's fiscal position wins over the customer's.
        let fiscal_position_id = match &config.default_fiscal_position_id {
            Some(id) => Some(id.clone()),
            None => match &request.partner_id {
                Some(partner_id) => self
                    .get_partner(partner_id)
                    .await?
                    .and_then(|p| p.fiscal_position_id),
                None => None,
            },
        };

        let taxes = crate::repository::tax::TaxRepository::new(self.pool.clone())
            .resolve_for_product(
                &product.id,
                Some(&request.company_id),
                fiscal_position_id.as_deref(),
            )
            .await?;

        let totals = compute_line_totals(
            Money::from_cents(price_unit_cents),
            new.quantity,
            &taxes,
        );

        let procurements = crate::repository::procurement::ProcurementRepository::new(
            self.pool.clone(),
        );
        let (procurement_id, virtual_procurement_id) = if config.create_procurements {
            let real = procurements
                .create(&request.number, false, config.warehouse_id.as_deref(), None)
                .await?;
            let virtual_id = match &config.virtual_location_id {
                Some(location) => Some(
                    procurements
                        .create(&request.number, true, None, Some(location))
                        .await?
                        .id,
                ),
                None => None,
            };
            (Some(real.id), virtual_id)
        } else {
            (None, None)
        };

        let line = RequestLine {
            id: Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            product_id: product.id.clone(),
            company_id: request.company_id.clone(),
            currency_code: request.currency_code.clone(),
            quantity: new.quantity,
            note: new.note,
            price_unit_cents,
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            total_cents: totals.total_cents,
            procurement_id,
            virtual_procurement_id,
            state: LineState::InProgress,
            created_at: Utc::now(),
        };

        debug!(
            id = %line.id,
            request = %request.number,
            sku = %product.sku,
            qty = line.quantity,
            "Registering request line"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO request_lines ({LINE_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&line.id)
        .bind(&line.request_id)
        .bind(&line.product_id)
        .bind(&line.company_id)
        .bind(&line.currency_code)
        .bind(line.quantity)
        .bind(&line.note)
        .bind(line.price_unit_cents)
        .bind(line.subtotal_cents)
        .bind(line.tax_cents)
        .bind(line.total_cents)
        .bind(&line.procurement_id)
        .bind(&line.virtual_procurement_id)
        .bind(line.state)
        .bind(line.created_at)
        .execute(&mut *tx)
        .await?;

        for tax in &taxes {
            sqlx::query("INSERT INTO request_line_taxes (line_id, tax_id) VALUES (?, ?)")
                .bind(&line.id)
                .bind(&tax.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.refresh_totals(&request.id).await?;

        Ok(line)
    }

    /// Changes a line's quantity and recomputes its amounts.
    pub async fn update_line_quantity(&self, line_id: &str, quantity: i64) -> DbResult<()> {
        validate_quantity(quantity).map_err(CoreError::Validation)?;
        let line = self.editable_line(line_id).await?;
        self.recompute_line(&line, line.price_unit_cents, quantity)
            .await
    }

    /// Changes a line's unit price and recomputes its amounts.
    pub async fn update_line_price(&self, line_id: &str, price_unit_cents: i64) -> DbResult<()> {
        validate_price_cents(price_unit_cents).map_err(CoreError::Validation)?;
        let line = self.editable_line(line_id).await?;
        self.recompute_line(&line, price_unit_cents, line.quantity)
            .await
    }

    async fn editable_line(&self, line_id: &str) -> DbResult<RequestLine> {
        let line = sqlx::query_as::<_, RequestLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM request_lines WHERE id = ?"
        ))
        .bind(line_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Request line", line_id))?;

        if line.state != LineState::InProgress {
            return Err(CoreError::InvalidLineState {
                line_id: line.id.clone(),
                current_state: line.state.as_str().to_string(),
            }
            .into());
        }

        Ok(line)
    }

    async fn recompute_line(
        &self,
        line: &RequestLine,
        price_unit_cents: i64,
        quantity: i64,
    ) -> DbResult<()> {
        let taxes = self.line_taxes(&line.id).await?;
        let totals = compute_line_totals(Money::from_cents(price_unit_cents), quantity, &taxes);

        sqlx::query(
            "UPDATE request_lines SET price_unit_cents = ?, quantity = ?, \
             subtotal_cents = ?, tax_cents = ?, total_cents = ? WHERE id = ?",
        )
        .bind(price_unit_cents)
        .bind(quantity)
        .bind(totals.subtotal_cents)
        .bind(totals.tax_cents)
        .bind(totals.total_cents)
        .bind(&line.id)
        .execute(&self.pool)
        .await?;

        self.refresh_totals(&line.request_id).await
    }

    // -------------------------------------------------------------------------
    // Amounts
    // -------------------------------------------------------------------------

    /// Records the amount the customer paid up front.
    ///
    /// The outstanding amount is re-derived as `total − prepaid`.
    pub async fn set_prepaid(&self, request_id: &str, prepaid_cents: i64) -> DbResult<()> {
        validate_prepaid_cents(prepaid_cents).map_err(CoreError::Validation)?;

        let result = sqlx::query(
            "UPDATE requests SET prepaid_cents = ?, \
             amount_due_cents = total_cents - ?, updated_at = ? \
             WHERE id = ? AND state NOT IN ('done', 'cancel')",
        )
        .bind(prepaid_cents)
        .bind(prepaid_cents)
        .bind(Utc::now())
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Request (open)", request_id));
        }

        Ok(())
    }

    /// Recomputes the request header amounts from its lines.
    ///
    /// Untaxed and tax sums are rounded to the request currency's precision;
    /// the total is their sum and the outstanding amount is total − prepaid.
    pub async fn refresh_totals(&self, request_id: &str) -> DbResult<()> {
        let request = self
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| DbError::not_found("Request", request_id))?;

        let lines = self.get_lines(request_id).await?;
        let currency = self.load_currency(&request.currency_code).await?;
        let totals = sum_request_totals(&lines, &currency);

        sqlx::query(
            "UPDATE requests SET untaxed_cents = ?, tax_cents = ?, total_cents = ?, \
             amount_due_cents = ? - prepaid_cents, updated_at = ? WHERE id = ?",
        )
        .bind(totals.untaxed_cents)
        .bind(totals.tax_cents)
        .bind(totals.total_cents)
        .bind(totals.total_cents)
        .bind(Utc::now())
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_currency(&self, code: &str) -> DbResult<Currency> {
        let decimal_places: Option<i64> =
            sqlx::query_scalar("SELECT decimal_places FROM currencies WHERE code = ?")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        // Unknown currencies fall back to two decimals.
        Ok(Currency::new(code, decimal_places.unwrap_or(2).clamp(0, 2) as u8))
    }

    async fn load_config(&self, config_id: &str) -> DbResult<Option<RequestConfig>> {
        crate::repository::config::ConfigRepository::new(self.pool.clone())
            .get(config_id)
            .await
    }

    // -------------------------------------------------------------------------
    // Fulfillment Transitions
    // -------------------------------------------------------------------------

    /// Marks a line ready for handover, promoting the request to to-deliver
    /// when every remaining line is ready.
    ///
    /// Returns the request's state after the transition.
    pub async fn mark_line_done(&self, line_id: &str) -> DbResult<RequestState> {
        let line = sqlx::query_as::<_, RequestLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM request_lines WHERE id = ?"
        ))
        .bind(line_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Request line", line_id))?;

        let result = sqlx::query(
            "UPDATE request_lines SET state = 'to_deliver' \
             WHERE id = ? AND state = 'in_progress'",
        )
        .bind(line_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Request line (in_progress)", line_id));
        }

        self.promote_if_deliverable(&line.request_id).await
    }

    /// Promotes a waiting request to to-deliver when all its lines report
    /// ready. Checks EVERY line; a single waiting line keeps the request
    /// waiting.
    async fn promote_if_deliverable(&self, request_id: &str) -> DbResult<RequestState> {
        let request = self
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| DbError::not_found("Request", request_id))?;

        if request.state != RequestState::InProgress {
            return Ok(request.state);
        }

        let lines = self.get_lines(request_id).await?;
        if !can_deliver(request.state, &lines) {
            return Ok(request.state);
        }

        info!(id = %request.id, number = %request.number, "Request ready for handover");

        sqlx::query(
            "UPDATE requests SET state = 'to_deliver', updated_at = ? \
             WHERE id = ? AND state = 'in_progress'",
        )
        .bind(Utc::now())
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        Ok(RequestState::ToDeliver)
    }

    /// Cancels a line and its procurements.
    ///
    /// Procurements already fulfilled are left done. Cancelling the last
    /// waiting line can make the rest of the request deliverable, so the
    /// promotion check runs afterwards.
    pub async fn cancel_line(&self, line_id: &str) -> DbResult<RequestState> {
        let line = sqlx::query_as::<_, RequestLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM request_lines WHERE id = ?"
        ))
        .bind(line_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Request line", line_id))?;

        let result = sqlx::query(
            "UPDATE request_lines SET state = 'cancel' \
             WHERE id = ? AND state NOT IN ('cancel', 'delivered')",
        )
        .bind(line_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InvalidLineState {
                line_id: line.id.clone(),
                current_state: line.state.as_str().to_string(),
            }
            .into());
        }

        self.cancel_line_procurements(&line).await?;
        self.refresh_totals(&line.request_id).await?;
        self.promote_if_deliverable(&line.request_id).await
    }

    /// Cancels a request, its open lines and their procurements.
    pub async fn cancel_request(&self, request_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE requests SET state = 'cancel', cancelled_at = ?, updated_at = ? \
             WHERE id = ? AND state NOT IN ('done', 'cancel')",
        )
        .bind(now)
        .bind(now)
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Request (open)", request_id));
        }

        info!(id = %request_id, "Request cancelled");

        let lines = self.get_lines(request_id).await?;
        for line in &lines {
            if line.state == LineState::Cancel {
                continue;
            }

            sqlx::query("UPDATE request_lines SET state = 'cancel' WHERE id = ?")
                .bind(&line.id)
                .execute(&self.pool)
                .await?;

            self.cancel_line_procurements(line).await?;
        }

        Ok(())
    }

    async fn cancel_line_procurements(&self, line: &RequestLine) -> DbResult<()> {
        let procurements =
            crate::repository::procurement::ProcurementRepository::new(self.pool.clone());

        for procurement_id in [&line.procurement_id, &line.virtual_procurement_id]
            .into_iter()
            .flatten()
        {
            if !procurements.cancel(procurement_id).await? {
                debug!(id = %procurement_id, "Procurement already final, left untouched");
            }
        }

        Ok(())
    }

    /// Hands the goods over to the customer.
    ///
    /// Refused while any non-cancelled line is still waiting.
    pub async fn mark_delivered(&self, request_id: &str) -> DbResult<()> {
        let request = self
            .get_by_id(request_id)
            .await?
            .ok_or_else(|| DbError::not_found("Request", request_id))?;

        let lines = self.get_lines(request_id).await?;
        if request.state.is_terminal() || !can_deliver(request.state, &lines) {
            return Err(CoreError::InvalidRequestState {
                request_id: request.id.clone(),
                current_state: request.state.as_str().to_string(),
            }
            .into());
        }

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE requests SET state = 'delivered', delivered_at = ?, updated_at = ? \
             WHERE id = ? AND state IN ('in_progress', 'to_deliver')",
        )
        .bind(now)
        .bind(now)
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Already delivered; handing over twice is a no-op.
            return Ok(());
        }

        sqlx::query(
            "UPDATE request_lines SET state = 'delivered' \
             WHERE request_id = ? AND state != 'cancel'",
        )
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        info!(id = %request_id, number = %request.number, "Request delivered");
        Ok(())
    }

    /// Finalizes a request after its till order completed.
    ///
    /// Sets the request done, stamping the handover time when the goods were
    /// not marked delivered beforehand. Open lines become delivered.
    pub async fn mark_done(&self, request_id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE requests SET state = 'done', \
             delivered_at = COALESCE(delivered_at, ?), updated_at = ? \
             WHERE id = ? AND state NOT IN ('done', 'cancel')",
        )
        .bind(now)
        .bind(now)
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Request (open)", request_id));
        }

        sqlx::query(
            "UPDATE request_lines SET state = 'delivered' \
             WHERE request_id = ? AND state != 'cancel'",
        )
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        info!(id = %request_id, "Request finalized");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Order Finalization
    // -------------------------------------------------------------------------

    /// Processes a completed till order's payload and finalizes every
    /// request it references with the delivery flag set.
    ///
    /// Each referenced request is marked done exactly once, no matter how
    /// many order lines point at it. References to requests that are missing
    /// or already final are skipped with a warning; one stale reference must
    /// not fail the whole order.
    ///
    /// Returns the ids of the requests actually finalized.
    pub async fn finalize_order(&self, lines: &[OrderLinePayload]) -> DbResult<Vec<String>> {
        let ids = requests_to_finalize(lines);
        let mut finalized = Vec::with_capacity(ids.len());

        for request_id in ids {
            match self.mark_done(&request_id).await {
                Ok(()) => finalized.push(request_id),
                Err(DbError::NotFound { .. }) => {
                    warn!(id = %request_id, "Order referenced a request that is not open");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(finalized)
    }

    /// [`finalize_order`] for the raw JSON payload as the front-end sends it.
    pub async fn finalize_order_json(&self, payload_json: &str) -> DbResult<Vec<String>> {
        let lines = parse_order_lines(payload_json)?;
        self.finalize_order(&lines).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
