//! Checks on form data extracted from an uploaded document.
//!
//! Three passes run over an [`ExtractedFormData`]:
//!
//! | Check        | Rule                                  | Outcome |
//! |--------------|---------------------------------------|---------|
//! | Required     | per-form field list                   | error   |
//! | Format       | regex per field name                  | error   |
//! | Plausibility | numeric range per field name          | warning |
//!
//! Fields and form types without a rule pass. Validation never fails; the
//! outcome is always a [`ValidationReport`].

use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DocumentType, ExtractedFormData, FieldValue};

/// Outcome of validating one form. Errors block acceptance, warnings do not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

fn required_fields(form_type: &str) -> &'static [&'static str] {
    match DocumentType::parse(form_type).as_str() {
        "w2" => &["employerEIN", "employerName", "employeeSSN", "wages"],
        "1099" => &["payerTIN", "payerName", "recipientTIN", "amount"],
        "1040" => &["ssn", "filingStatus", "totalIncome"],
        _ => &[],
    }
}

static FORMAT_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("ssn", r"^\d{3}-?\d{2}-?\d{4}$"),
        ("ein", r"^\d{2}-?\d{7}$"),
        ("zip", r"^\d{5}(-\d{4})?$"),
        ("phone", r"^\d{3}-?\d{3}-?\d{4}$"),
        ("email", r"^[^\s@]+@[^\s@]+\.[^\s@]+$"),
    ]
    .into_iter()
    .map(|(field, pattern)| (field, Regex::new(pattern).expect("format patterns are valid")))
    .collect()
});

#[derive(Debug, Clone)]
pub struct FieldValidator {
    current_year: i32,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldValidator {
    /// Validator whose `year` rule ends at today's calendar year.
    pub fn new() -> Self {
        Self::with_current_year(Utc::now().year())
    }

    pub fn with_current_year(current_year: i32) -> Self {
        Self { current_year }
    }

    pub fn validate(
        &self,
        data: &ExtractedFormData,
    ) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for &field in required_fields(&data.form_type) {
            if !data.fields.get(field).is_some_and(FieldValue::is_present) {
                errors.push(format!("Missing required field: {field}"));
            }
        }

        for (field, value) in &data.fields {
            if !self.format_ok(field, value) {
                errors.push(format!("Invalid format for field: {field}"));
            }
            if !self.value_plausible(field, value) {
                warnings.push(format!("Unusual value for field: {field}"));
            }
        }

        debug!(
            form_type = %data.form_type,
            errors = errors.len(),
            warnings = warnings.len(),
            "validated extracted form"
        );

        ValidationReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn format_ok(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> bool {
        match FORMAT_RULES.iter().find(|(name, _)| *name == field) {
            Some((_, re)) => re.is_match(&value.to_string()),
            None => true,
        }
    }

    fn value_plausible(
        &self,
        field: &str,
        value: &FieldValue,
    ) -> bool {
        // Inclusive lower bound, upper bound and whether the upper bound is inclusive.
        let (low, high, inclusive) = match field {
            "wages" => (Decimal::ZERO, Decimal::from(10_000_000), false),
            "year" => (Decimal::from(2000), Decimal::from(self.current_year), true),
            "age" => (Decimal::ZERO, Decimal::from(120), true),
            _ => return true,
        };
        // Non-numeric values for a ranged field are unusual too.
        value
            .as_decimal()
            .is_some_and(|n| n >= low && if inclusive { n <= high } else { n < high })
    }
}
