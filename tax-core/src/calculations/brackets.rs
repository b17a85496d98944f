//! Progressive bracket tax.
//!
//! Income is consumed from the lowest bracket upward; each slice is taxed at
//! its bracket's marginal rate:
//!
//! ```text
//! tax = Σ min(remaining, bracket width) × rate
//! ```
//!
//! Slices are summed unrounded and the total is rounded to cents once, so
//! many small slices cannot accumulate rounding drift.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::BracketTaxCalculator;
//! use tax_core::{BracketSchedule, TaxBracket};
//!
//! let schedule = BracketSchedule::new(vec![
//!     TaxBracket::new(dec!(0), Some(dec!(11000)), dec!(0.10)),
//!     TaxBracket::new(dec!(11000), Some(dec!(44725)), dec!(0.12)),
//!     TaxBracket::new(dec!(44725), None, dec!(0.22)),
//! ])
//! .unwrap();
//!
//! let tax = BracketTaxCalculator::new(&schedule).calculate(dec!(16150));
//!
//! // 11,000 × 10% + 5,150 × 12%
//! assert_eq!(tax, dec!(1718.00));
//! ```

use rust_decimal::Decimal;

use crate::BracketSchedule;
use crate::calculations::common::round_half_up;

/// Applies a validated [`BracketSchedule`] to a taxable-income amount.
#[derive(Debug, Clone, Copy)]
pub struct BracketTaxCalculator<'a> {
    schedule: &'a BracketSchedule,
}

impl<'a> BracketTaxCalculator<'a> {
    pub fn new(schedule: &'a BracketSchedule) -> Self {
        Self { schedule }
    }

    /// Tax owed on `taxable_income`, rounded to cents.
    ///
    /// Zero or negative income yields zero.
    pub fn calculate(
        &self,
        taxable_income: Decimal,
    ) -> Decimal {
        if taxable_income <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let mut remaining = taxable_income;
        let mut tax = Decimal::ZERO;

        for bracket in self.schedule.brackets() {
            if remaining <= Decimal::ZERO {
                break;
            }
            let in_bracket = match bracket.width() {
                Some(width) => remaining.min(width),
                None => remaining,
            };
            tax += in_bracket * bracket.rate;
            remaining -= in_bracket;
        }

        round_half_up(tax)
    }

    /// Average rate paid across all brackets, or zero for no income.
    pub fn effective_rate(
        &self,
        taxable_income: Decimal,
    ) -> Decimal {
        if taxable_income <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.calculate(taxable_income) / taxable_income
    }
}
