//! Standard vs. itemized deduction choice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Deductions;
use crate::calculations::common::round_half_up;

/// The deduction amount that will be subtracted from AGI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDeduction {
    pub amount: Decimal,
    pub used_itemized: bool,
}

/// Picks the larger of the standard deduction and the itemized total.
///
/// Ties go to the standard deduction.
pub fn resolve_deduction(deductions: &Deductions) -> ResolvedDeduction {
    let itemized = deductions.itemized.total();
    if itemized > deductions.standard {
        ResolvedDeduction {
            amount: round_half_up(itemized),
            used_itemized: true,
        }
    } else {
        ResolvedDeduction {
            amount: round_half_up(deductions.standard),
            used_itemized: false,
        }
    }
}
