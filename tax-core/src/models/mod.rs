mod document;
mod financial_profile;
mod state_tax_info;
mod tax_bracket;
mod tax_liability;
mod tax_year_config;

pub use document::{Document, DocumentType, ExtractedFormData, FieldMap, FieldValue, NewDocument};
pub use financial_profile::{Credits, Deductions, ItemizedDeductions, TaxableIncome};
pub use state_tax_info::StateTaxInfo;
pub use tax_bracket::{BracketError, BracketSchedule, TaxBracket};
pub use tax_liability::TaxLiability;
pub use tax_year_config::TaxYearConfig;
