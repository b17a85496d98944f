use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{max, round_half_up};

/// Final liability for one (user, year, state) calculation.
///
/// Built once by [`TaxLiability::compose`]; `total` is never negative.
/// `local_tax` is carried for callers but not modeled and is always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLiability {
    pub federal_tax: Decimal,
    pub state_tax: Decimal,
    pub local_tax: Decimal,
    pub self_employment_tax: Decimal,
    pub medicare: Decimal,
    pub social_security: Decimal,
    pub total: Decimal,
}

impl TaxLiability {
    pub fn compose(
        federal_tax: Decimal,
        state_tax: Decimal,
        self_employment_tax: Decimal,
        medicare: Decimal,
        social_security: Decimal,
        total_credits: Decimal,
    ) -> Self {
        let gross = federal_tax + state_tax + self_employment_tax + medicare + social_security;
        Self {
            federal_tax,
            state_tax,
            local_tax: Decimal::ZERO,
            self_employment_tax,
            medicare,
            social_security,
            total: max(round_half_up(gross - total_credits), Decimal::ZERO),
        }
    }

    /// Sum of every tax component before credits.
    pub fn gross_tax(&self) -> Decimal {
        self.federal_tax
            + self.state_tax
            + self.local_tax
            + self.self_employment_tax
            + self.medicare
            + self.social_security
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn compose_subtracts_credits() {
        let liability = TaxLiability::compose(
            dec!(1718.00),
            dec!(500.00),
            dec!(0.00),
            dec!(435.00),
            dec!(1860.00),
            dec!(1000.00),
        );

        assert_eq!(liability.total, dec!(3513.00));
        assert_eq!(liability.local_tax, Decimal::ZERO);
    }

    #[test]
    fn compose_floors_total_at_zero() {
        let liability = TaxLiability::compose(
            dec!(100.00),
            dec!(0.00),
            dec!(0.00),
            dec!(10.00),
            dec!(20.00),
            dec!(5000.00),
        );

        assert_eq!(liability.total, Decimal::ZERO);
        assert_eq!(liability.gross_tax(), dec!(130.00));
    }
}
