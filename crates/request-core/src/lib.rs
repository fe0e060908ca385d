//! # request-core: Pure Business Logic for POS Pre-Orders
//!
//! This crate is the **heart** of the pre-order ("request") extension. It
//! contains all business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     POS Request Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                POS Terminal Front-End                           │   │
//! │  │   Register pre-order ──► Track fulfillment ──► Hand over        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ request-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │    tax    │  │ validation│  │   │
//! │  │   │  Request  │  │   Money   │  │ TaxEngine │  │   rules   │  │   │
//! │  │   │   Line    │  │ Currency  │  │ FiscalPos │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  request-db (Database Layer)                    │   │
//! │  │            SQLite queries, migrations, repositories             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Request, RequestLine, RequestConfig, etc.)
//! - [`money`] - Money and Currency types with integer arithmetic
//! - [`tax`] - Line-total computation and fiscal-position mapping
//! - [`order`] - Order-finalization payload and dedup rule
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: totals and readiness are deterministic functions
//!    of their inputs - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use request_core::money::Money;
//! use request_core::tax::{compute_line_totals, Tax};
//!
//! let vat = Tax {
//!     id: "tax-10".into(),
//!     name: "VAT 10%".into(),
//!     rate_bps: 1000,
//!     price_included: false,
//!     company_id: None,
//!     is_active: true,
//! };
//!
//! // Two cakes at 18.50 with 10% VAT
//! let totals = compute_line_totals(Money::from_cents(1850), 2, &[vat]);
//! assert_eq!(totals.total_cents, totals.subtotal_cents + totals.tax_cents);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use request_core::Money` instead of
// `use request_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Currency, Money};
pub use order::{parse_order_lines, requests_to_finalize, OrderLinePayload, RequestRef};
pub use tax::{
    compute_line_totals, resolve_line_taxes, FiscalPosition, LineTotals, Tax, TaxMapping, TaxRate,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default company ID (single-company runtime with multi-company schema).
///
/// The schema carries company_id columns so a future multi-company rollout
/// only needs dynamic resolution, not a migration.
pub const DEFAULT_COMPANY_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum lines allowed on a single request.
///
/// Prevents runaway pre-orders and keeps fulfillment tickets printable.
pub const MAX_REQUEST_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;
