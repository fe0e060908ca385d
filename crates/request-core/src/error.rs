//! # Error Types
//!
//! Domain-specific error types for request-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  request-core errors (this file)                                       │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  request-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → POS front-end           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (request number, SKU, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Request cannot be found.
    #[error("Request not found: {0}")]
    RequestNotFound(String),

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product is not flagged as available for pre-orders.
    ///
    /// ## When This Occurs
    /// - Terminal has `filter_products` enabled
    /// - Product's `available_for_request` flag is false
    #[error("Product {sku} is not available for requests")]
    ProductNotRequestable { sku: String },

    /// Request is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Adding lines to a done/cancelled request
    /// - Marking a cancelled request as delivered
    /// - Finalizing a request twice
    #[error("Request {request_id} is {current_state}, cannot perform operation")]
    InvalidRequestState {
        request_id: String,
        current_state: String,
    },

    /// Line is not in a state that allows the requested operation.
    #[error("Request line {line_id} is {current_state}, cannot perform operation")]
    InvalidLineState {
        line_id: String,
        current_state: String,
    },

    /// Request has exceeded the maximum allowed lines.
    #[error("Request cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Field is disabled by the terminal configuration.
    #[error("{field} is not allowed on this terminal")]
    NotAllowed { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidRequestState {
            request_id: "req-1".to_string(),
            current_state: "done".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Request req-1 is done, cannot perform operation"
        );

        let err = CoreError::ProductNotRequestable {
            sku: "CAKE-CHOC".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Product CAKE-CHOC is not available for requests"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer".to_string(),
        };
        assert_eq!(err.to_string(), "customer is required");

        let err = ValidationError::NotAllowed {
            field: "reference".to_string(),
        };
        assert_eq!(err.to_string(), "reference is not allowed on this terminal");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
