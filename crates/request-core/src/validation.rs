//! # Validation Module
//!
//! Input validation for pre-order registration.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: POS front-end (TypeScript)                                   │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business + terminal-config rules               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Product, RequestConfig};
use crate::{MAX_LINE_QUANTITY, MAX_REQUEST_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (giveaway lines)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a prepaid amount in cents.
///
/// ## Rules
/// - Must be non-negative; the customer cannot prepay a negative amount.
pub fn validate_prepaid_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "prepaid amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Validates an operator reference.
///
/// ## Rules
/// - Maximum 64 characters; empty is fine (the field is optional)
pub fn validate_reference(reference: &str) -> ValidationResult<()> {
    if reference.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "reference".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Terminal-Config Rules
// =============================================================================

/// Validates a new request against the terminal's configuration toggles.
///
/// ## Rules (all config-driven)
/// - `customer_required`: a partner must be set
/// - `delivery_date_required`: a delivery date must be set
/// - `allow_reference`: a reference may only be entered when enabled
pub fn validate_request_against_config(
    config: &RequestConfig,
    partner_id: Option<&str>,
    deliver_by: Option<DateTime<Utc>>,
    reference: Option<&str>,
) -> ValidationResult<()> {
    if config.customer_required && partner_id.is_none() {
        return Err(ValidationError::Required {
            field: "customer".to_string(),
        });
    }

    if config.delivery_date_required && deliver_by.is_none() {
        return Err(ValidationError::Required {
            field: "delivery date".to_string(),
        });
    }

    match reference {
        Some(reference) if !config.allow_reference => {
            if !reference.trim().is_empty() {
                return Err(ValidationError::NotAllowed {
                    field: "reference".to_string(),
                });
            }
        }
        Some(reference) => validate_reference(reference)?,
        None => {}
    }

    Ok(())
}

/// Checks that a product may be pre-ordered on this terminal.
///
/// When the terminal filters products, only those flagged
/// `available_for_request` can go on a request line.
pub fn validate_requestable_product(config: &RequestConfig, product: &Product) -> CoreResult<()> {
    if config.filter_products && !product.available_for_request {
        return Err(CoreError::ProductNotRequestable {
            sku: product.sku.clone(),
        });
    }

    Ok(())
}

/// Validates the number of lines on a request.
pub fn validate_line_count(current_lines: usize) -> CoreResult<()> {
    if current_lines >= MAX_REQUEST_LINES {
        return Err(CoreError::TooManyLines {
            max: MAX_REQUEST_LINES,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn config() -> RequestConfig {
        RequestConfig {
            id: "cfg".to_string(),
            name: "Main till".to_string(),
            request_product_id: None,
            previous_days: RequestConfig::DEFAULT_PREVIOUS_DAYS,
            create_procurements: false,
            warehouse_id: None,
            virtual_location_id: None,
            allow_reference: false,
            filter_products: false,
            show_all: false,
            customer_required: false,
            delivery_date_required: false,
            default_fiscal_position_id: None,
        }
    }

    fn product(available: bool) -> Product {
        Product {
            id: "prod".to_string(),
            sku: "CAKE-CHOC".to_string(),
            barcode: None,
            name: "Chocolate cake".to_string(),
            list_price_cents: 1850,
            available_for_request: available,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_prepaid_cents() {
        assert!(validate_prepaid_cents(0).is_ok());
        assert!(validate_prepaid_cents(500).is_ok());
        assert!(validate_prepaid_cents(-1).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(2100).is_ok());
        assert!(validate_tax_rate_bps(10000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }

    #[test]
    fn test_customer_required() {
        let mut cfg = config();
        cfg.customer_required = true;

        assert!(validate_request_against_config(&cfg, None, None, None).is_err());
        assert!(validate_request_against_config(&cfg, Some("partner-1"), None, None).is_ok());
    }

    #[test]
    fn test_delivery_date_required() {
        let mut cfg = config();
        cfg.delivery_date_required = true;

        assert!(validate_request_against_config(&cfg, None, None, None).is_err());
        assert!(validate_request_against_config(&cfg, None, Some(Utc::now()), None).is_ok());
    }

    #[test]
    fn test_reference_toggle() {
        let cfg = config();
        // References disabled: a non-empty reference is rejected
        assert!(validate_request_against_config(&cfg, None, None, Some("ORD-7")).is_err());
        // Empty reference slips through (front-end sends empty strings)
        assert!(validate_request_against_config(&cfg, None, None, Some("")).is_ok());

        let mut cfg = config();
        cfg.allow_reference = true;
        assert!(validate_request_against_config(&cfg, None, None, Some("ORD-7")).is_ok());
        let long = "x".repeat(65);
        assert!(validate_request_against_config(&cfg, None, None, Some(&long)).is_err());
    }

    #[test]
    fn test_requestable_product_filter() {
        let mut cfg = config();
        assert!(validate_requestable_product(&cfg, &product(false)).is_ok());

        cfg.filter_products = true;
        assert!(validate_requestable_product(&cfg, &product(false)).is_err());
        assert!(validate_requestable_product(&cfg, &product(true)).is_ok());
    }

    #[test]
    fn test_line_count() {
        assert!(validate_line_count(0).is_ok());
        assert!(validate_line_count(MAX_REQUEST_LINES - 1).is_ok());
        assert!(validate_line_count(MAX_REQUEST_LINES).is_err());
    }
}
