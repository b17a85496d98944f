use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Income by category for one user and tax year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxableIncome {
    pub wages: Decimal,
    pub self_employment: Decimal,
    pub investments: Decimal,
    pub rental: Decimal,
    pub other: Decimal,
}

impl TaxableIncome {
    /// Adjusted gross income: the sum of every category, saturating at
    /// `Decimal::MAX`.
    pub fn total(&self) -> Decimal {
        saturating_sum([
            self.wages,
            self.self_employment,
            self.investments,
            self.rental,
            self.other,
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemizedDeductions {
    pub mortgage: Decimal,
    pub charity: Decimal,
    pub state_tax: Decimal,
    pub property_tax: Decimal,
    pub medical: Decimal,
    pub other: Decimal,
}

impl ItemizedDeductions {
    pub fn total(&self) -> Decimal {
        saturating_sum([
            self.mortgage,
            self.charity,
            self.state_tax,
            self.property_tax,
            self.medical,
            self.other,
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deductions {
    pub standard: Decimal,
    pub itemized: ItemizedDeductions,
}

/// Tax credits. Summed flat; no phase-out by AGI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credits {
    pub child_tax: Decimal,
    pub earned_income: Decimal,
    pub education: Decimal,
    pub retirement: Decimal,
    pub other: Decimal,
}

impl Credits {
    pub fn total(&self) -> Decimal {
        saturating_sum([
            self.child_tax,
            self.earned_income,
            self.education,
            self.retirement,
            self.other,
        ])
    }
}

fn saturating_sum<const N: usize>(amounts: [Decimal; N]) -> Decimal {
    amounts.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}
