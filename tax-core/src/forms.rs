//! Form-type and tax-year detection for extracted field maps.
//!
//! Used when an upload arrives without a declared form type: the field names
//! and text values are searched for keywords, and the first plausible year
//! found becomes the document's tax year.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{ExtractedFormData, FieldMap};

/// Keyword lists checked in order; the first form with a hit wins.
const FORM_KEYWORDS: &[(&str, &[&str])] = &[
    ("w2", &["wages", "salary", "compensation", "employer"]),
    ("1099", &["nonemployee", "independent contractor", "miscellaneous"]),
    ("1040", &["income tax return", "filing status", "exemptions"]),
];

/// How many years back a detected year may lie.
const YEAR_WINDOW: i32 = 5;

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"20\d{2}").expect("year pattern is valid"));

/// Names and values of every field, one `name: value` entry per line.
fn haystack(fields: &FieldMap) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Guesses the form type from field names and values, or `"unknown"`.
pub fn identify_form_type(fields: &FieldMap) -> String {
    let text = haystack(fields).to_lowercase();
    FORM_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map_or("unknown", |(form, _)| *form)
        .to_string()
}

/// First `20xx` year in the fields within the last five years, otherwise
/// the year before `current_year`.
///
/// Only the first match is considered.
pub fn extract_year(
    fields: &FieldMap,
    current_year: i32,
) -> i32 {
    let text = haystack(fields);
    let detected = YEAR_PATTERN
        .find(&text)
        .and_then(|m| m.as_str().parse::<i32>().ok());

    match detected {
        Some(year) if (current_year - YEAR_WINDOW..=current_year).contains(&year) => year,
        other => {
            debug!(?other, current_year, "no usable tax year in fields; using prior year");
            current_year - 1
        }
    }
}

/// Builds [`ExtractedFormData`] from raw fields using the two detectors.
pub fn classify(
    fields: FieldMap,
    current_year: i32,
) -> ExtractedFormData {
    ExtractedFormData {
        form_type: identify_form_type(&fields),
        year: extract_year(&fields, current_year),
        fields,
    }
}
