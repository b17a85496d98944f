//! Folds a user's documents into income and itemized-deduction buckets.
//!
//! | Document    | Field                     | Bucket |
//! |-------------|---------------------------|--------|
//! | `w2`        | `wages`                   | income.wages |
//! | `1099`      | `nonEmployeeCompensation` | income.self_employment |
//! | `1099-B`    | `proceedsFromBroker`      | income.investments |
//! | `1099-MISC` | `otherIncome`             | income.other |
//! | `1098`      | `mortgageInterest`        | itemized.mortgage |
//! | `1098`      | `propertyTax`             | itemized.property_tax |
//! | `charity`   | `amount`                  | itemized.charity |
//! | `medical`   | `amount`                  | itemized.medical |
//!
//! Other document types are ignored. A missing, non-numeric or negative
//! amount counts as zero so one bad document never aborts the calculation.
//! So does an amount that would push a bucket past [`BUCKET_CEILING`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Document, DocumentType, ItemizedDeductions, TaxableIncome};

/// Result of aggregating one user's documents for a tax year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    pub income: TaxableIncome,
    pub itemized: ItemizedDeductions,
    /// Documents that contributed to a bucket.
    pub documents_used: usize,
}

pub struct DocumentAggregator;

impl DocumentAggregator {
    /// Aggregates every document belonging to `year`.
    ///
    /// Documents from other years are skipped.
    pub fn aggregate(
        documents: &[Document],
        year: i32,
    ) -> Aggregation {
        let mut result = Aggregation::default();

        for doc in documents {
            if doc.year != year {
                debug!(id = doc.id, doc_year = doc.year, year, "skipping document from another year");
                continue;
            }

            let used = match doc.doc_type {
                DocumentType::W2 => {
                    add(&mut result.income.wages, doc, "wages");
                    true
                }
                DocumentType::Form1099 => {
                    add(&mut result.income.self_employment, doc, "nonEmployeeCompensation");
                    true
                }
                DocumentType::Form1099B => {
                    add(&mut result.income.investments, doc, "proceedsFromBroker");
                    true
                }
                DocumentType::Form1099Misc => {
                    add(&mut result.income.other, doc, "otherIncome");
                    true
                }
                DocumentType::Form1098 => {
                    add(&mut result.itemized.mortgage, doc, "mortgageInterest");
                    add(&mut result.itemized.property_tax, doc, "propertyTax");
                    true
                }
                DocumentType::Charity => {
                    add(&mut result.itemized.charity, doc, "amount");
                    true
                }
                DocumentType::Medical => {
                    add(&mut result.itemized.medical, doc, "amount");
                    true
                }
                DocumentType::Other(ref kind) => {
                    debug!(id = doc.id, kind = %kind, "ignoring unrecognized document type");
                    false
                }
            };

            if used {
                result.documents_used += 1;
            }
        }

        result
    }
}

/// Largest total a single bucket may reach (10^24). Keeps every later sum
/// and bracket product well inside `Decimal`'s range.
pub const BUCKET_CEILING: Decimal = Decimal::from_parts(0xA100_0000, 0x1BCE_CCED, 0xD3C2, false, 0);

/// Adds `field` from `doc` to `bucket`, skipping amounts that would overflow it.
fn add(
    bucket: &mut Decimal,
    doc: &Document,
    field: &str,
) {
    let value = amount(doc, field);
    match bucket.checked_add(value).filter(|total| *total <= BUCKET_CEILING) {
        Some(total) => *bucket = total,
        None => {
            warn!(id = doc.id, doc_type = %doc.doc_type, field, value = %value, "amount overflows its bucket; counting as zero");
        }
    }
}

/// Reads a non-negative amount from a document, treating bad data as zero.
fn amount(
    doc: &Document,
    field: &str,
) -> Decimal {
    let Some(value) = doc.content.get(field) else {
        debug!(id = doc.id, doc_type = %doc.doc_type, field, "field missing; counting as zero");
        return Decimal::ZERO;
    };

    match value.as_decimal() {
        Some(n) if n < Decimal::ZERO => {
            warn!(id = doc.id, doc_type = %doc.doc_type, field, value = %n, "negative amount; counting as zero");
            Decimal::ZERO
        }
        Some(n) => n,
        None => {
            warn!(id = doc.id, doc_type = %doc.doc_type, field, value = %value, "non-numeric amount; counting as zero");
            Decimal::ZERO
        }
    }
}
