//! # Order Finalization Payload
//!
//! Types for the order-submission payload the POS front-end sends when a
//! till order is completed, and the rule deciding which requests that order
//! finalizes.
//!
//! ## The Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator scans a pickup ticket ──► front-end attaches RequestRef      │
//! │  to the order line and flags it for delivery                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Order completed ──► payload read back during finalization             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  requests_to_finalize() ← distinct request ids, delivery-flagged       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Each referenced request marked done EXACTLY ONCE                      │
//! │  (several lines may reference the same request)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};

// =============================================================================
// Payload Types
// =============================================================================

/// Reference from an order line back to the request it pays/delivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RequestRef {
    /// The referenced request.
    pub request_id: String,

    /// Whether completing this order hands the request over.
    /// False when the line only collects a deposit.
    pub deliver: bool,
}

/// One line of the order-submission payload.
///
/// Only the fields the request flow reads back are modelled here; the rest
/// of the order line belongs to the host order pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLinePayload {
    pub product_id: String,
    pub quantity: i64,
    pub price_unit_cents: i64,
    /// Present when the line was created from a request.
    pub request: Option<RequestRef>,
}

/// Parses the JSON order payload the front-end submits on order completion.
///
/// ## Example
/// ```rust
/// use request_core::order::parse_order_lines;
///
/// let lines = parse_order_lines(
///     r#"[{"product_id": "prod-1", "quantity": 1, "price_unit_cents": 500,
///          "request": {"request_id": "req-1", "deliver": true}}]"#,
/// ).unwrap();
/// assert_eq!(lines[0].request.as_ref().unwrap().request_id, "req-1");
/// ```
pub fn parse_order_lines(json: &str) -> CoreResult<Vec<OrderLinePayload>> {
    let lines = serde_json::from_str(json).map_err(|e| ValidationError::InvalidFormat {
        field: "order payload".to_string(),
        reason: e.to_string(),
    })?;
    Ok(lines)
}

// =============================================================================
// Finalization Rule
// =============================================================================

/// Extracts the distinct request ids an order finalizes.
///
/// A request id appears at most once in the result even when several lines
/// reference it, so each request is marked done exactly once. Lines without
/// a request reference, or whose reference is not delivery-flagged, are
/// ignored. Order of first appearance is preserved.
pub fn requests_to_finalize(lines: &[OrderLinePayload]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for line in lines {
        if let Some(request) = &line.request {
            if request.deliver && !ids.iter().any(|id| id == &request.request_id) {
                ids.push(request.request_id.clone());
            }
        }
    }
    ids
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(request: Option<RequestRef>) -> OrderLinePayload {
        OrderLinePayload {
            product_id: "prod".to_string(),
            quantity: 1,
            price_unit_cents: 100,
            request,
        }
    }

    fn req(id: &str, deliver: bool) -> Option<RequestRef> {
        Some(RequestRef {
            request_id: id.to_string(),
            deliver,
        })
    }

    #[test]
    fn test_no_references() {
        let lines = vec![payload(None), payload(None)];
        assert!(requests_to_finalize(&lines).is_empty());
    }

    #[test]
    fn test_deduplicates_repeated_references() {
        // Two deposit lines for the same request: finalize it once
        let lines = vec![
            payload(req("req-1", true)),
            payload(req("req-1", true)),
            payload(req("req-2", true)),
        ];
        assert_eq!(requests_to_finalize(&lines), vec!["req-1", "req-2"]);
    }

    #[test]
    fn test_ignores_non_delivery_references() {
        let lines = vec![payload(req("req-1", false)), payload(req("req-2", true))];
        assert_eq!(requests_to_finalize(&lines), vec!["req-2"]);
    }

    #[test]
    fn test_parse_order_lines() {
        let json = r#"[
            {"product_id": "prod-1", "quantity": 2, "price_unit_cents": 1850,
             "request": {"request_id": "req-1", "deliver": true}},
            {"product_id": "prod-2", "quantity": 1, "price_unit_cents": 500,
             "request": null}
        ]"#;

        let lines = parse_order_lines(json).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].request.as_ref().unwrap().request_id, "req-1");
        assert!(lines[1].request.is_none());
        assert_eq!(requests_to_finalize(&lines), vec!["req-1"]);
    }

    #[test]
    fn test_parse_order_lines_rejects_malformed_payload() {
        assert!(parse_order_lines("not json").is_err());
        assert!(parse_order_lines(r#"[{"quantity": 1}]"#).is_err());
    }

    #[test]
    fn test_preserves_first_appearance_order() {
        let lines = vec![
            payload(req("req-b", true)),
            payload(req("req-a", true)),
            payload(req("req-b", true)),
        ];
        assert_eq!(requests_to_finalize(&lines), vec!["req-b", "req-a"]);
    }
}
