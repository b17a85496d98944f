//! CSV import of tax tables: federal and state bracket schedules and the
//! per-year constants, written through any [`tax_core::TaxRepository`].

mod loader;

pub use loader::{
    BracketLoader, BracketLoaderError, BracketRecord, FEDERAL, LoadSummary, TaxYearConfigLoader,
};
