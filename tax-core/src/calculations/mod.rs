//! Calculation components for the tax-liability engine.
//!
//! Each component is a pure function over value types; the only I/O in the
//! engine happens in [`crate::engine`] before these are called.

pub mod aggregation;
pub mod brackets;
pub mod common;
pub mod credits;
pub mod deductions;
pub mod payroll;

pub use aggregation::{Aggregation, DocumentAggregator};
pub use brackets::BracketTaxCalculator;
pub use credits::{CreditSource, FixedCredits, UnimplementedCredits, total_credits};
pub use deductions::{ResolvedDeduction, resolve_deduction};
pub use payroll::{PayrollConfig, PayrollConfigError, PayrollTaxCalculator, PayrollTaxes};
