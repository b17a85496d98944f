//! Payroll taxes: self-employment tax, Medicare and Social Security.
//!
//! | Tax                | Formula |
//! |--------------------|---------|
//! | Self-employment    | SE income × 15.3% |
//! | Medicare           | AGI × 1.45%, plus (AGI − threshold) × 0.9% above the threshold |
//! | Social Security    | min(AGI, wage base) × 6.2% |
//!
//! All rates and limits come from [`PayrollConfig`], which is built from the
//! requested year's [`TaxYearConfig`], so the wage base follows the tax year.
//!
//! Known simplifications: the SE half-deduction is not applied to AGI, and
//! the Additional Medicare threshold is the single-filer amount for every
//! filer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{non_negative, round_half_up};
use crate::{TaxYearConfig, TaxableIncome};

/// Errors raised by an out-of-range [`PayrollConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayrollConfigError {
    #[error("{name} must be between 0 and 1, got {value}")]
    RateOutOfRange { name: &'static str, value: Decimal },

    #[error("social security wage base must be positive, got {0}")]
    InvalidWageBase(Decimal),

    #[error("additional medicare threshold must be non-negative, got {0}")]
    InvalidMedicareThreshold(Decimal),
}

/// Rates and limits for one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollConfig {
    /// Combined OASDI + Medicare rate on self-employment income (15.3%).
    pub se_tax_rate: Decimal,
    /// Base Medicare rate (1.45%).
    pub medicare_tax_rate: Decimal,
    /// Additional Medicare Tax rate (0.9%).
    pub additional_medicare_rate: Decimal,
    /// Income above which the additional rate applies ($200,000).
    pub additional_medicare_threshold: Decimal,
    /// Social Security rate (6.2%).
    pub ss_tax_rate: Decimal,
    /// Income ceiling for Social Security tax.
    pub ss_wage_base: Decimal,
}

impl PayrollConfig {
    pub fn from_tax_year_config(config: &TaxYearConfig) -> Self {
        Self {
            se_tax_rate: config.se_tax_rate,
            medicare_tax_rate: config.medicare_tax_rate,
            additional_medicare_rate: config.additional_medicare_rate,
            additional_medicare_threshold: config.additional_medicare_threshold,
            ss_tax_rate: config.ss_tax_rate,
            ss_wage_base: config.ss_wage_base,
        }
    }

    pub fn validate(&self) -> Result<(), PayrollConfigError> {
        let rates = [
            ("se_tax_rate", self.se_tax_rate),
            ("medicare_tax_rate", self.medicare_tax_rate),
            ("additional_medicare_rate", self.additional_medicare_rate),
            ("ss_tax_rate", self.ss_tax_rate),
        ];
        for (name, value) in rates {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(PayrollConfigError::RateOutOfRange { name, value });
            }
        }
        if self.ss_wage_base <= Decimal::ZERO {
            return Err(PayrollConfigError::InvalidWageBase(self.ss_wage_base));
        }
        if self.additional_medicare_threshold < Decimal::ZERO {
            return Err(PayrollConfigError::InvalidMedicareThreshold(
                self.additional_medicare_threshold,
            ));
        }
        Ok(())
    }
}

/// The three payroll components of a liability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTaxes {
    pub self_employment_tax: Decimal,
    pub medicare: Decimal,
    pub social_security: Decimal,
}

#[derive(Debug, Clone)]
pub struct PayrollTaxCalculator {
    config: PayrollConfig,
}

impl PayrollTaxCalculator {
    pub fn new(config: PayrollConfig) -> Self {
        Self { config }
    }

    /// Validates the configuration and computes all three components.
    pub fn calculate(
        &self,
        income: &TaxableIncome,
    ) -> Result<PayrollTaxes, PayrollConfigError> {
        self.config.validate()?;

        let taxes = PayrollTaxes {
            self_employment_tax: self.self_employment_tax(income),
            medicare: self.medicare(income),
            social_security: self.social_security(income),
        };
        debug!(
            se = %taxes.self_employment_tax,
            medicare = %taxes.medicare,
            social_security = %taxes.social_security,
            "payroll taxes computed"
        );
        Ok(taxes)
    }

    pub fn self_employment_tax(
        &self,
        income: &TaxableIncome,
    ) -> Decimal {
        round_half_up(non_negative(income.self_employment) * self.config.se_tax_rate)
    }

    pub fn medicare(
        &self,
        income: &TaxableIncome,
    ) -> Decimal {
        let total = non_negative(income.total());
        let mut tax = total * self.config.medicare_tax_rate;
        if total > self.config.additional_medicare_threshold {
            tax += (total - self.config.additional_medicare_threshold)
                * self.config.additional_medicare_rate;
        }
        round_half_up(tax)
    }

    pub fn social_security(
        &self,
        income: &TaxableIncome,
    ) -> Decimal {
        let capped = non_negative(income.total()).min(self.config.ss_wage_base);
        round_half_up(capped * self.config.ss_tax_rate)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rust_decimal_macros::dec;

    use super::*;

    fn config_2021() -> PayrollConfig {
        PayrollConfig {
            se_tax_rate: dec!(0.153),
            medicare_tax_rate: dec!(0.0145),
            additional_medicare_rate: dec!(0.009),
            additional_medicare_threshold: dec!(200000),
            ss_tax_rate: dec!(0.062),
            ss_wage_base: dec!(142800),
        }
    }

    fn wages(amount: Decimal) -> TaxableIncome {
        TaxableIncome {
            wages: amount,
            ..Default::default()
        }
    }

    // =========================================================================
    // self-employment tax
    // =========================================================================

    #[test]
    fn self_employment_tax_is_flat_rate() {
        let calculator = PayrollTaxCalculator::new(config_2021());
        let income = TaxableIncome {
            self_employment: dec!(10000),
            ..Default::default()
        };

        assert_eq!(calculator.self_employment_tax(&income), dec!(1530.00));
    }

    #[test]
    fn self_employment_tax_ignores_wages() {
        let calculator = PayrollTaxCalculator::new(config_2021());

        assert_eq!(calculator.self_employment_tax(&wages(dec!(90000))), dec!(0.00));
    }

    // =========================================================================
    // medicare
    // =========================================================================

    #[test]
    fn medicare_below_threshold_is_base_rate() {
        let calculator = PayrollTaxCalculator::new(config_2021());

        assert_eq!(calculator.medicare(&wages(dec!(100000))), dec!(1450.00));
    }

    #[test]
    fn medicare_at_threshold_has_no_surcharge() {
        let calculator = PayrollTaxCalculator::new(config_2021());

        assert_eq!(calculator.medicare(&wages(dec!(200000))), dec!(2900.00));
    }

    #[test]
    fn medicare_surcharge_applies_only_to_excess() {
        let calculator = PayrollTaxCalculator::new(config_2021());

        // 250000 × 1.45% + 50000 × 0.9% = 3625 + 450
        assert_eq!(calculator.medicare(&wages(dec!(250000))), dec!(4075.00));
    }

    // =========================================================================
    // social security
    // =========================================================================

    #[test]
    fn social_security_below_wage_base() {
        let calculator = PayrollTaxCalculator::new(config_2021());

        assert_eq!(calculator.social_security(&wages(dec!(30000))), dec!(1860.00));
    }

    #[test]
    fn social_security_is_capped_at_wage_base() {
        let calculator = PayrollTaxCalculator::new(config_2021());

        assert_eq!(
            calculator.social_security(&wages(dec!(1000000))),
            dec!(8853.60)
        );
    }

    #[test]
    fn wage_base_follows_the_configured_year() {
        let config_2023 = PayrollConfig {
            ss_wage_base: dec!(160200),
            ..config_2021()
        };
        let calculator = PayrollTaxCalculator::new(config_2023);

        assert_eq!(
            calculator.social_security(&wages(dec!(1000000))),
            dec!(9932.40)
        );
    }

    #[test]
    fn social_security_never_exceeds_cap() {
        let calculator = PayrollTaxCalculator::new(config_2021());
        let cap = dec!(142800) * dec!(0.062);
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..500 {
            let income = TaxableIncome {
                wages: Decimal::new(rng.gen_range(0..100_000_000_000i64), 2),
                self_employment: Decimal::new(rng.gen_range(0..10_000_000_000i64), 2),
                ..Default::default()
            };

            assert!(calculator.social_security(&income) <= cap);
        }
    }

    #[test]
    fn medicare_matches_base_rate_up_to_threshold() {
        let calculator = PayrollTaxCalculator::new(config_2021());
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..500 {
            let amount = Decimal::new(rng.gen_range(0..=20_000_000i64), 2);

            assert_eq!(
                calculator.medicare(&wages(amount)),
                round_half_up(amount * dec!(0.0145))
            );
        }
    }

    // =========================================================================
    // calculate / validate
    // =========================================================================

    #[test]
    fn calculate_returns_all_components() {
        let calculator = PayrollTaxCalculator::new(config_2021());
        let income = TaxableIncome {
            self_employment: dec!(10000),
            ..Default::default()
        };

        let taxes = calculator.calculate(&income).expect("valid config");

        assert_eq!(
            taxes,
            PayrollTaxes {
                self_employment_tax: dec!(1530.00),
                medicare: dec!(145.00),
                social_security: dec!(620.00),
            }
        );
    }

    #[test]
    fn calculate_rejects_percent_style_rate() {
        let calculator = PayrollTaxCalculator::new(PayrollConfig {
            ss_tax_rate: dec!(6.2),
            ..config_2021()
        });

        assert_eq!(
            calculator.calculate(&wages(dec!(1000))),
            Err(PayrollConfigError::RateOutOfRange {
                name: "ss_tax_rate",
                value: dec!(6.2),
            })
        );
    }

    #[test]
    fn validate_rejects_zero_wage_base() {
        let config = PayrollConfig {
            ss_wage_base: dec!(0),
            ..config_2021()
        };

        assert_eq!(
            config.validate(),
            Err(PayrollConfigError::InvalidWageBase(dec!(0)))
        );
    }
}
