//! Plain-text rendering of a [`LiabilityBreakdown`].

use std::fmt;

use rust_decimal::Decimal;

use crate::calculations::common::round_half_up;
use crate::engine::LiabilityBreakdown;

/// Formats an amount in dollars with thousands separators: `$1,234.56`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_half_up(value);
    let cents = format!("{:.2}", rounded.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Formats a fractional rate as a percentage: `0.0495` is `4.95%`.
pub fn format_percent(rate: Decimal) -> String {
    format!("{:.2}%", round_half_up(rate * Decimal::ONE_HUNDRED))
}

/// Renders every intermediate figure of a calculation.
pub fn render_summary(breakdown: &LiabilityBreakdown) -> String {
    breakdown.to_string()
}

impl fmt::Display for LiabilityBreakdown {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let money = format_currency;
        let income = &self.income;
        let itemized = &self.deductions.itemized;
        let l = &self.liability;

        writeln!(f, "Tax Summary for {} ({})", self.year, self.state)?;
        if self.effective_year != self.year {
            writeln!(f, "Using {} tax tables", self.effective_year)?;
        }
        writeln!(f)?;
        writeln!(f, "Income:")?;
        writeln!(f, "- Wages: {}", money(income.wages))?;
        writeln!(f, "- Self-Employment: {}", money(income.self_employment))?;
        writeln!(f, "- Investments: {}", money(income.investments))?;
        writeln!(f, "- Rental: {}", money(income.rental))?;
        writeln!(f, "- Other: {}", money(income.other))?;
        writeln!(f, "Adjusted Gross Income: {}", money(self.agi))?;
        writeln!(f)?;
        writeln!(f, "Deductions:")?;
        writeln!(f, "- Standard Deduction: {}", money(self.deductions.standard))?;
        writeln!(f, "- Itemized Deductions: {}", money(itemized.total()))?;
        writeln!(f, "  * Mortgage Interest: {}", money(itemized.mortgage))?;
        writeln!(f, "  * Charitable Contributions: {}", money(itemized.charity))?;
        writeln!(f, "  * State/Local Taxes: {}", money(itemized.state_tax))?;
        writeln!(f, "  * Property Taxes: {}", money(itemized.property_tax))?;
        writeln!(f, "  * Medical Expenses: {}", money(itemized.medical))?;
        writeln!(f, "  * Other: {}", money(itemized.other))?;
        writeln!(
            f,
            "- Deduction Applied: {} ({})",
            money(self.resolved_deduction.amount),
            if self.resolved_deduction.used_itemized { "itemized" } else { "standard" }
        )?;
        writeln!(f, "Taxable Income: {}", money(self.taxable_income))?;
        writeln!(f)?;
        writeln!(f, "Tax Liability:")?;
        writeln!(f, "- Federal Tax: {}", money(l.federal_tax))?;
        writeln!(f, "- State Tax: {}", money(l.state_tax))?;
        writeln!(f, "- Self-Employment Tax: {}", money(l.self_employment_tax))?;
        writeln!(f, "- Medicare: {}", money(l.medicare))?;
        writeln!(f, "- Social Security: {}", money(l.social_security))?;
        writeln!(f, "Gross Tax: {}", money(l.gross_tax()))?;
        writeln!(f, "- Credits: -{}", money(self.total_credits))?;
        writeln!(f, "Federal Marginal Rate: {}", format_percent(self.federal_marginal_rate))?;
        writeln!(f, "Federal Effective Rate: {}", format_percent(self.federal_effective_rate))?;
        writeln!(f)?;
        writeln!(f, "Total Tax Liability: {}", money(l.total))
    }
}
