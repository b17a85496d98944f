use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-year constants used by the liability calculation.
///
/// Amounts are single-filer figures. Rates are fractions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearConfig {
    pub tax_year: i32,
    pub standard_deduction: Decimal,
    pub ss_wage_base: Decimal,
    pub ss_tax_rate: Decimal,
    pub medicare_tax_rate: Decimal,
    pub additional_medicare_rate: Decimal,
    pub additional_medicare_threshold: Decimal,
    pub se_tax_rate: Decimal,
}
