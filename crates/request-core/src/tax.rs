//! # Tax Module
//!
//! Tax computation for request lines and fiscal-position mapping.
//!
//! ## How Line Totals Are Derived
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      compute_line_totals                                │
//! │                                                                         │
//! │  price_unit × quantity = base                                          │
//! │       │                                                                 │
//! │       ├── price-included taxes? extract them from the gross base        │
//! │       │   subtotal = base − included_tax(base)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each tax: amount = subtotal × rate (rounded per tax)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  total = subtotal + Σ tax amounts                                      │
//! │                                                                         │
//! │  INVARIANT: total == subtotal + tax, always, by construction           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fiscal Positions
//! A fiscal position maps the taxes nominally attached to a product to the
//! taxes actually applicable for a customer/region (e.g., replace domestic
//! VAT with an intra-community 0% tax). The POS terminal's default position
//! wins; the customer's position is the fallback.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 2100 bps = 21% (Spanish general VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tax
// =============================================================================

/// A tax that can apply to a request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Tax {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, e.g. "VAT 21%".
    pub name: String,

    /// Rate in basis points (2100 = 21%).
    pub rate_bps: u32,

    /// Whether the tax is already contained in the product's list price.
    pub price_included: bool,

    /// Company this tax belongs to. `None` means any company.
    pub company_id: Option<String>,

    /// Whether the tax is active (soft delete).
    pub is_active: bool,
}

impl Tax {
    /// Returns the tax rate.
    #[inline]
    pub fn rate(&self) -> TaxRate {
        TaxRate::from_bps(self.rate_bps)
    }

    /// Checks whether this tax applies for the given company.
    ///
    /// A tax without a company applies everywhere.
    pub fn applies_to_company(&self, company_id: Option<&str>) -> bool {
        match (&self.company_id, company_id) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(own), Some(line)) => own == line,
        }
    }
}

// =============================================================================
// Line Totals
// =============================================================================

/// Computed tax-exclusive/inclusive totals for a request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTotals {
    /// Tax-exclusive amount.
    pub subtotal_cents: i64,

    /// Sum of tax amounts.
    pub tax_cents: i64,

    /// Tax-inclusive amount (subtotal + tax).
    pub total_cents: i64,
}

impl LineTotals {
    /// Zeroed totals (line with no price yet).
    pub const fn zero() -> Self {
        LineTotals {
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
        }
    }
}

/// Computes a line's subtotal, tax and total from unit price, quantity and
/// applicable taxes.
///
/// The result is a pure function of its inputs: callers re-run it whenever
/// the price, quantity or tax set changes.
///
/// ## Example
/// ```rust
/// use request_core::money::Money;
/// use request_core::tax::{compute_line_totals, Tax};
///
/// let vat = Tax {
///     id: "tax-21".into(),
///     name: "VAT 21%".into(),
///     rate_bps: 2100,
///     price_included: false,
///     company_id: None,
///     is_active: true,
/// };
///
/// let totals = compute_line_totals(Money::from_cents(1000), 2, &[vat]);
/// assert_eq!(totals.subtotal_cents, 2000);
/// assert_eq!(totals.tax_cents, 420);
/// assert_eq!(totals.total_cents, 2420);
/// ```
pub fn compute_line_totals(price_unit: Money, quantity: i64, taxes: &[Tax]) -> LineTotals {
    let base = price_unit.multiply_quantity(quantity);

    // Price-included taxes are baked into the unit price; strip them off to
    // obtain the tax-exclusive base before computing per-tax amounts.
    let included_bps: u32 = taxes
        .iter()
        .filter(|t| t.price_included)
        .map(|t| t.rate_bps)
        .sum();

    let subtotal = if included_bps > 0 {
        base - base.extract_included_tax(TaxRate::from_bps(included_bps))
    } else {
        base
    };

    let mut tax_total = Money::zero();
    for tax in taxes {
        tax_total += subtotal.calculate_tax(tax.rate());
    }

    LineTotals {
        subtotal_cents: subtotal.cents(),
        tax_cents: tax_total.cents(),
        total_cents: (subtotal + tax_total).cents(),
    }
}

// =============================================================================
// Fiscal Position
// =============================================================================

/// One tax substitution rule inside a fiscal position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxMapping {
    /// The nominal tax being replaced.
    pub src_tax_id: String,

    /// The replacement tax. `None` removes the tax entirely
    /// (e.g., an export exemption).
    pub dst_tax_id: Option<String>,
}

/// A rule set mapping nominal taxes to the taxes actually applicable for a
/// given customer or region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalPosition {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, e.g. "Intra-EU B2B".
    pub name: String,

    /// Substitution rules. Taxes without a rule pass through unchanged.
    pub mappings: Vec<TaxMapping>,
}

impl FiscalPosition {
    /// Maps a set of taxes through this fiscal position.
    ///
    /// ## Arguments
    /// * `taxes` - The nominal taxes (already filtered to the line's company)
    /// * `lookup` - Resolves a replacement tax id to the tax record
    ///
    /// ## Behavior
    /// - Tax has a mapping to another tax → replaced
    /// - Tax has a mapping to nothing → dropped
    /// - Replacement tax cannot be resolved → dropped
    /// - No mapping → kept as-is
    pub fn map_taxes<F>(&self, taxes: &[Tax], lookup: F) -> Vec<Tax>
    where
        F: Fn(&str) -> Option<Tax>,
    {
        let mut mapped = Vec::with_capacity(taxes.len());
        for tax in taxes {
            match self.mappings.iter().find(|m| m.src_tax_id == tax.id) {
                Some(mapping) => {
                    if let Some(dst_id) = &mapping.dst_tax_id {
                        if let Some(dst) = lookup(dst_id) {
                            mapped.push(dst);
                        }
                    }
                    // Mapping to nothing drops the tax.
                }
                None => mapped.push(tax.clone()),
            }
        }
        mapped
    }
}

/// Resolves the taxes applicable to a request line.
///
/// ## Resolution Order (matches the terminal behavior)
/// 1. Start from the product's tax set
/// 2. Filter to the line's company
/// 3. Map through the fiscal position, when one applies
///    (the terminal's default position wins over the customer's)
///
/// ## Example
/// ```rust,ignore
/// let taxes = resolve_line_taxes(
///     &product_taxes,
///     Some(&company_id),
///     fiscal_position.as_ref(),
///     |id| all_taxes.iter().find(|t| t.id == id).cloned(),
/// );
/// ```
pub fn resolve_line_taxes<F>(
    product_taxes: &[Tax],
    company_id: Option<&str>,
    fiscal_position: Option<&FiscalPosition>,
    lookup: F,
) -> Vec<Tax>
where
    F: Fn(&str) -> Option<Tax>,
{
    let company_taxes: Vec<Tax> = product_taxes
        .iter()
        .filter(|t| t.applies_to_company(company_id))
        .cloned()
        .collect();

    match fiscal_position {
        Some(fpos) => fpos.map_taxes(&company_taxes, lookup),
        None => company_taxes,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tax(id: &str, bps: u32, included: bool) -> Tax {
        Tax {
            id: id.to_string(),
            name: format!("Tax {}", id),
            rate_bps: bps,
            price_included: included,
            company_id: None,
            is_active: true,
        }
    }

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(2100);
        assert_eq!(rate.bps(), 2100);
        assert!((rate.percentage() - 21.0).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(8.25);
        assert_eq!(rate.bps(), 825);
    }

    #[test]
    fn test_totals_no_taxes() {
        let totals = compute_line_totals(Money::from_cents(500), 3, &[]);
        assert_eq!(totals.subtotal_cents, 1500);
        assert_eq!(totals.tax_cents, 0);
        assert_eq!(totals.total_cents, 1500);
    }

    #[test]
    fn test_totals_excluded_tax() {
        // 10.00 × 2 at 21% = subtotal 20.00, tax 4.20, total 24.20
        let totals = compute_line_totals(Money::from_cents(1000), 2, &[tax("t21", 2100, false)]);
        assert_eq!(totals.subtotal_cents, 2000);
        assert_eq!(totals.tax_cents, 420);
        assert_eq!(totals.total_cents, 2420);
    }

    #[test]
    fn test_totals_included_tax() {
        // 11.00 gross × 1 with 10% included: subtotal 10.00, tax 1.00
        let totals = compute_line_totals(Money::from_cents(1100), 1, &[tax("t10", 1000, true)]);
        assert_eq!(totals.subtotal_cents, 1000);
        assert_eq!(totals.tax_cents, 100);
        assert_eq!(totals.total_cents, 1100);
    }

    #[test]
    fn test_totals_mixed_taxes() {
        // 11.00 gross with 10% included + 5% excluded surcharge:
        // subtotal 10.00, tax 1.00 + 0.50, total 11.50
        let taxes = [tax("inc", 1000, true), tax("exc", 500, false)];
        let totals = compute_line_totals(Money::from_cents(1100), 1, &taxes);
        assert_eq!(totals.subtotal_cents, 1000);
        assert_eq!(totals.tax_cents, 150);
        assert_eq!(totals.total_cents, 1150);
    }

    #[test]
    fn test_totals_invariant_total_is_subtotal_plus_tax() {
        // Awkward amounts that force rounding
        let taxes = [tax("a", 825, false), tax("b", 433, false)];
        for price in [1_i64, 37, 99, 1001, 12345] {
            for qty in [1_i64, 3, 7] {
                let t = compute_line_totals(Money::from_cents(price), qty, &taxes);
                assert_eq!(t.total_cents, t.subtotal_cents + t.tax_cents);
            }
        }
    }

    #[test]
    fn test_company_filter() {
        let mut t = tax("t", 1000, false);
        t.company_id = Some("company-a".to_string());

        assert!(t.applies_to_company(Some("company-a")));
        assert!(!t.applies_to_company(Some("company-b")));
        // Line without a company accepts any tax
        assert!(t.applies_to_company(None));
    }

    #[test]
    fn test_fiscal_position_maps_and_drops() {
        let domestic = tax("vat21", 2100, false);
        let reduced = tax("vat10", 1000, false);
        let surcharge = tax("sur", 500, false);

        let fpos = FiscalPosition {
            id: "fp-1".to_string(),
            name: "Reduced regime".to_string(),
            mappings: vec![
                TaxMapping {
                    src_tax_id: "vat21".to_string(),
                    dst_tax_id: Some("vat10".to_string()),
                },
                TaxMapping {
                    src_tax_id: "sur".to_string(),
                    dst_tax_id: None,
                },
            ],
        };

        let reduced_clone = reduced.clone();
        let mapped = fpos.map_taxes(&[domestic, surcharge], |id| {
            (id == "vat10").then(|| reduced_clone.clone())
        });

        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].id, "vat10");
    }

    #[test]
    fn test_resolve_line_taxes_filters_then_maps() {
        let mut other_company = tax("other", 400, false);
        other_company.company_id = Some("company-b".to_string());
        let domestic = tax("vat21", 2100, false);
        let reduced = tax("vat10", 1000, false);

        let fpos = FiscalPosition {
            id: "fp-1".to_string(),
            name: "Reduced regime".to_string(),
            mappings: vec![TaxMapping {
                src_tax_id: "vat21".to_string(),
                dst_tax_id: Some("vat10".to_string()),
            }],
        };

        let reduced_clone = reduced.clone();
        let resolved = resolve_line_taxes(
            &[domestic, other_company],
            Some("company-a"),
            Some(&fpos),
            |id| (id == "vat10").then(|| reduced_clone.clone()),
        );

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "vat10");
    }

    #[test]
    fn test_resolve_without_fiscal_position_keeps_taxes() {
        let domestic = tax("vat21", 2100, false);
        let resolved = resolve_line_taxes(&[domestic.clone()], None, None, |_| None);
        assert_eq!(resolved, vec![domestic]);
    }
}
