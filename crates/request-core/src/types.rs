//! # Domain Types
//!
//! Core domain types for POS pre-order management.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Request      │   │  RequestLine    │   │  Procurement    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  number         │◄──│  request_id     │──►│  origin         │       │
//! │  │  state          │   │  state          │   │  state          │       │
//! │  │  total_cents    │   │  total_cents    │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  RequestState   │   │   LineState     │   │  RequestConfig  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  InProgress     │   │  InProgress     │   │  per-terminal   │       │
//! │  │  ToDeliver      │   │  ToDeliver      │   │  toggles        │       │
//! │  │  Delivered      │   │  Delivered      │   └─────────────────┘       │
//! │  │  Done / Cancel  │   │  Cancel         │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (number, sku, barcode) - human-readable, potentially mutable

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Currency, Money};

// =============================================================================
// Request State
// =============================================================================

/// Lifecycle state of a request (pre-order header).
///
/// ```text
/// in_progress ──► to_deliver ──► delivered ──► done
///      │               │
///      └───────────────┴──────► cancel
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Request was cancelled.
    Cancel,
    /// Waiting for line availability.
    InProgress,
    /// All lines ready, request can be handed over.
    ToDeliver,
    /// Goods handed over to the customer.
    Delivered,
    /// Finalized through a completed POS order.
    Done,
}

impl RequestState {
    /// Terminal states accept no further mutation.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Done | RequestState::Cancel)
    }

    /// Lowercase label, matching the database encoding.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestState::Cancel => "cancel",
            RequestState::InProgress => "in_progress",
            RequestState::ToDeliver => "to_deliver",
            RequestState::Delivered => "delivered",
            RequestState::Done => "done",
        }
    }
}

impl Default for RequestState {
    fn default() -> Self {
        RequestState::InProgress
    }
}

// =============================================================================
// Line State
// =============================================================================

/// Lifecycle state of a single request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineState {
    /// Line was cancelled.
    Cancel,
    /// Waiting availability (fulfillment not finished).
    InProgress,
    /// Ready to hand over.
    ToDeliver,
    /// Handed over.
    Delivered,
}

impl LineState {
    /// A line is ready when fulfillment reported it to-deliver or later.
    #[inline]
    pub const fn is_ready(&self) -> bool {
        matches!(self, LineState::ToDeliver | LineState::Delivered)
    }

    /// Lowercase label, matching the database encoding.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LineState::Cancel => "cancel",
            LineState::InProgress => "in_progress",
            LineState::ToDeliver => "to_deliver",
            LineState::Delivered => "delivered",
        }
    }
}

impl Default for LineState {
    fn default() -> Self {
        LineState::InProgress
    }
}

// =============================================================================
// Request
// =============================================================================

/// A customer pre-order captured at the point of sale for later fulfillment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Request {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable request number, e.g. `R-20260825-01-0042`.
    pub number: String,

    /// Customer who placed the pre-order.
    pub partner_id: Option<String>,

    /// Customer receiving a home delivery, when different from the buyer.
    pub home_delivery_partner_id: Option<String>,

    /// Free-text reference entered by the operator.
    pub reference: Option<String>,

    /// Barcode printed on the pickup ticket.
    pub barcode: Option<String>,

    /// Lifecycle state.
    pub state: RequestState,

    /// Amount already paid when the pre-order was registered.
    pub prepaid_cents: i64,

    /// Outstanding amount: total − prepaid.
    pub amount_due_cents: i64,

    /// Untaxed amount, currency-rounded sum over lines.
    pub untaxed_cents: i64,

    /// Tax amount, currency-rounded sum over lines.
    pub tax_cents: i64,

    /// Total amount: untaxed + tax.
    pub total_cents: i64,

    /// Receipt snapshot rendered when the pre-order was registered.
    pub receipt_snapshot: Option<String>,

    /// Free-text home-delivery notes.
    pub delivery_notes: Option<String>,

    /// Operator who registered the request.
    pub user_id: String,

    /// POS session the request was registered in.
    pub session_id: String,

    /// POS terminal configuration the session runs on.
    pub config_id: String,

    /// Owning company.
    pub company_id: String,

    /// Company currency (ISO 4217 code).
    pub currency_code: String,

    /// When the request was registered.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// Date the customer expects delivery/pickup.
    #[ts(as = "Option<String>")]
    pub deliver_by: Option<DateTime<Utc>>,

    /// When the request was cancelled.
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,

    /// When the goods were handed over.
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,

    /// When the request was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Returns the prepaid amount as Money.
    #[inline]
    pub fn prepaid(&self) -> Money {
        Money::from_cents(self.prepaid_cents)
    }

    /// Returns the total amount as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the outstanding amount as Money.
    #[inline]
    pub fn amount_due(&self) -> Money {
        Money::from_cents(self.amount_due_cents)
    }

    /// Whether the request still accepts edits (lines, prepayments).
    #[inline]
    pub fn is_editable(&self) -> bool {
        !self.state.is_terminal()
    }
}

// =============================================================================
// Request Line
// =============================================================================

/// One product/quantity/price entry within a request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RequestLine {
    pub id: String,
    pub request_id: String,
    pub product_id: String,
    pub company_id: String,
    pub currency_code: String,
    /// Quantity in whole units.
    pub quantity: i64,
    /// Free-text note shown to fulfillment ("no sugar", "pink ribbon").
    pub note: Option<String>,
    /// Unit price at registration time.
    pub price_unit_cents: i64,
    /// Tax-exclusive amount, recomputed from price × qty × taxes.
    pub subtotal_cents: i64,
    /// Tax amount for this line.
    pub tax_cents: i64,
    /// Tax-inclusive amount (subtotal + tax).
    pub total_cents: i64,
    /// Fulfillment procurement created for this line, if any.
    pub procurement_id: Option<String>,
    /// Virtual-location procurement created for this line, if any.
    pub virtual_procurement_id: Option<String>,
    pub state: LineState,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl RequestLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price_unit(&self) -> Money {
        Money::from_cents(self.price_unit_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Aggregate Totals
// =============================================================================

/// Aggregated amounts for a request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RequestTotals {
    pub untaxed_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl RequestTotals {
    /// Outstanding amount after subtracting the prepayment.
    #[inline]
    pub fn amount_due(&self, prepaid: Money) -> Money {
        Money::from_cents(self.total_cents) - prepaid
    }
}

/// Sums line totals into request-level amounts.
///
/// Untaxed and tax sums are rounded to the company currency's precision;
/// the total is their sum, so `total == untaxed + tax` always holds.
pub fn sum_request_totals(lines: &[RequestLine], currency: &Currency) -> RequestTotals {
    let mut untaxed = Money::zero();
    let mut tax = Money::zero();
    for line in lines {
        untaxed += Money::from_cents(line.subtotal_cents);
        tax += Money::from_cents(line.tax_cents);
    }

    let untaxed = currency.round(untaxed);
    let tax = currency.round(tax);

    RequestTotals {
        untaxed_cents: untaxed.cents(),
        tax_cents: tax.cents(),
        total_cents: (untaxed + tax).cents(),
    }
}

/// Whether a request can be handed over to the customer.
///
/// True iff every line that was not cancelled reports a ready state
/// (to-deliver or delivered). Cancelled lines never become deliverable, so
/// they do not block the rest of the request. Requests already delivered or
/// finalized report true.
pub fn can_deliver(state: RequestState, lines: &[RequestLine]) -> bool {
    match state {
        RequestState::Delivered | RequestState::Done => true,
        RequestState::Cancel => false,
        _ => lines
            .iter()
            .filter(|line| line.state != LineState::Cancel)
            .all(|line| line.state.is_ready()),
    }
}

// =============================================================================
// Terminal Configuration
// =============================================================================

/// Per-terminal pre-order settings, consulted by the POS session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RequestConfig {
    /// Terminal (POS config) identifier.
    pub id: String,

    /// Terminal display name.
    pub name: String,

    /// Generic product used to collect pre-order payments at the till.
    /// Optional: a missing configuration falls back to no product.
    pub request_product_id: Option<String>,

    /// Load window: requests are loaded from the session opening date minus
    /// this many days. Avoids pulling the full history into the terminal.
    pub previous_days: i64,

    /// Create procurement orders for registered lines.
    pub create_procurements: bool,

    /// Warehouse procurements are routed to.
    pub warehouse_id: Option<String>,

    /// Virtual stock location for the mirror procurement.
    pub virtual_location_id: Option<String>,

    /// Allow the operator to type a free-text reference.
    pub allow_reference: bool,

    /// Only products flagged `available_for_request` can be pre-ordered.
    pub filter_products: bool,

    /// Load requests of every store, not only this terminal's.
    pub show_all: bool,

    /// A customer must be set on every request.
    pub customer_required: bool,

    /// A delivery date must be set on every request.
    pub delivery_date_required: bool,

    /// Fiscal position applied to request lines, overriding the customer's.
    pub default_fiscal_position_id: Option<String>,
}

impl RequestConfig {
    /// Default load window in days.
    pub const DEFAULT_PREVIOUS_DAYS: i64 = 15;

    /// Returns the oldest creation date the session should load.
    ///
    /// ## Example
    /// Session opened 16/01 with `previous_days = 15` loads requests created
    /// on or after 01/01.
    pub fn load_window_start(&self, session_opened_at: DateTime<Utc>) -> DateTime<Utc> {
        session_opened_at - Duration::days(self.previous_days)
    }
}

// =============================================================================
// Product
// =============================================================================

/// The product subset the pre-order flow needs.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown to the operator and on the ticket.
    pub name: String,

    /// List price in cents; defaults new line prices.
    pub list_price_cents: i64,

    /// Whether the product can be pre-ordered when the terminal filters.
    pub available_for_request: bool,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the list price as Money.
    #[inline]
    pub fn list_price(&self) -> Money {
        Money::from_cents(self.list_price_cents)
    }
}

// =============================================================================
// Partner
// =============================================================================

/// A customer record, as far as pre-orders need one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Partner {
    pub id: String,
    pub name: String,
    /// The customer's fiscal position, used when the terminal defines none.
    pub fiscal_position_id: Option<String>,
}

// =============================================================================
// Procurement
// =============================================================================

/// State of a procurement (demand-to-supply fulfillment task).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProcurementState {
    /// Created and waiting to be fulfilled.
    Confirmed,
    /// Fulfilled.
    Done,
    /// Cancelled.
    Cancel,
}

impl Default for ProcurementState {
    fn default() -> Self {
        ProcurementState::Confirmed
    }
}

/// A demand-to-supply fulfillment task linked to a request line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Procurement {
    pub id: String,
    /// Document that originated the demand (request number).
    pub origin: String,
    /// Mirror procurement against the virtual location.
    pub is_virtual: bool,
    pub state: ProcurementState,
    pub warehouse_id: Option<String>,
    pub location_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(state: LineState, subtotal: i64, tax: i64) -> RequestLine {
        RequestLine {
            id: "line".to_string(),
            request_id: "req".to_string(),
            product_id: "prod".to_string(),
            company_id: "company".to_string(),
            currency_code: "EUR".to_string(),
            quantity: 1,
            note: None,
            price_unit_cents: subtotal,
            subtotal_cents: subtotal,
            tax_cents: tax,
            total_cents: subtotal + tax,
            procurement_id: None,
            virtual_procurement_id: None,
            state,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_request_state_default() {
        assert_eq!(RequestState::default(), RequestState::InProgress);
        assert_eq!(LineState::default(), LineState::InProgress);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RequestState::Done.is_terminal());
        assert!(RequestState::Cancel.is_terminal());
        assert!(!RequestState::ToDeliver.is_terminal());
    }

    #[test]
    fn test_line_readiness() {
        assert!(LineState::ToDeliver.is_ready());
        assert!(LineState::Delivered.is_ready());
        assert!(!LineState::InProgress.is_ready());
        assert!(!LineState::Cancel.is_ready());
    }

    #[test]
    fn test_sum_request_totals() {
        let lines = vec![
            line(LineState::InProgress, 1000, 210),
            line(LineState::InProgress, 500, 105),
        ];
        let totals = sum_request_totals(&lines, &Currency::eur());
        assert_eq!(totals.untaxed_cents, 1500);
        assert_eq!(totals.tax_cents, 315);
        assert_eq!(totals.total_cents, 1815);
    }

    #[test]
    fn test_sum_request_totals_rounds_to_currency() {
        let lines = vec![line(LineState::InProgress, 1234, 56)];
        let zero_dp = Currency::new("JPY", 0);
        let totals = sum_request_totals(&lines, &zero_dp);
        assert_eq!(totals.untaxed_cents, 1200);
        assert_eq!(totals.tax_cents, 100);
        assert_eq!(totals.total_cents, 1300);
    }

    #[test]
    fn test_amount_due() {
        let totals = RequestTotals {
            untaxed_cents: 1500,
            tax_cents: 315,
            total_cents: 1815,
        };
        assert_eq!(totals.amount_due(Money::from_cents(800)).cents(), 1015);
        assert_eq!(totals.amount_due(Money::zero()).cents(), 1815);
    }

    #[test]
    fn test_can_deliver_all_lines_ready() {
        let lines = vec![
            line(LineState::ToDeliver, 100, 0),
            line(LineState::Delivered, 100, 0),
        ];
        assert!(can_deliver(RequestState::InProgress, &lines));
    }

    /// A later line still waiting must block readiness even when the first
    /// line is already ready.
    #[test]
    fn test_can_deliver_checks_every_line() {
        let lines = vec![
            line(LineState::ToDeliver, 100, 0),
            line(LineState::InProgress, 100, 0),
        ];
        assert!(!can_deliver(RequestState::InProgress, &lines));
    }

    #[test]
    fn test_can_deliver_ignores_cancelled_lines() {
        let lines = vec![
            line(LineState::Cancel, 100, 0),
            line(LineState::ToDeliver, 100, 0),
        ];
        assert!(can_deliver(RequestState::InProgress, &lines));
    }

    #[test]
    fn test_can_deliver_terminal_states() {
        let waiting = vec![line(LineState::InProgress, 100, 0)];
        assert!(can_deliver(RequestState::Delivered, &waiting));
        assert!(can_deliver(RequestState::Done, &waiting));
        assert!(!can_deliver(RequestState::Cancel, &[]));
    }

    #[test]
    fn test_can_deliver_empty_request_is_vacuously_true() {
        assert!(can_deliver(RequestState::InProgress, &[]));
    }

    #[test]
    fn test_load_window_start() {
        let config = RequestConfig {
            id: "cfg".to_string(),
            name: "Main till".to_string(),
            request_product_id: None,
            previous_days: 15,
            create_procurements: false,
            warehouse_id: None,
            virtual_location_id: None,
            allow_reference: false,
            filter_products: false,
            show_all: false,
            customer_required: false,
            delivery_date_required: false,
            default_fiscal_position_id: None,
        };
        let opened = Utc::now();
        assert_eq!(config.load_window_start(opened), opened - Duration::days(15));
    }
}
