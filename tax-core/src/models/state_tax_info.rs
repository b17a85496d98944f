use serde::{Deserialize, Serialize};

use super::BracketSchedule;

/// Income tax table for one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTaxInfo {
    pub state_code: String,
    pub state_name: String,
    pub brackets: BracketSchedule,
}

impl StateTaxInfo {
    /// Canonical form of a state code: trimmed and upper-case.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_ascii_uppercase()
    }
}
