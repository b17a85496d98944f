use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single marginal-rate bracket.
///
/// `rate` is a fraction (`0.22` is 22%). `max_income` of `None` means the
/// bracket is unbounded above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub min_income: Decimal,
    pub max_income: Option<Decimal>,
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn new(
        min_income: Decimal,
        max_income: Option<Decimal>,
        rate: Decimal,
    ) -> Self {
        Self {
            min_income,
            max_income,
            rate,
        }
    }

    /// Width of the bracket, or `None` for the unbounded top bracket.
    pub fn width(&self) -> Option<Decimal> {
        self.max_income.map(|max| max - self.min_income)
    }
}

/// Reasons a bracket table is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketError {
    #[error("bracket table is empty")]
    Empty,

    #[error("first bracket must start at 0, starts at {0}")]
    DoesNotStartAtZero(Decimal),

    #[error("bracket {index} has rate {rate} outside [0, 1]")]
    InvalidRate { index: usize, rate: Decimal },

    #[error("bracket {index} is unbounded but is not the last bracket")]
    UnboundedBeforeLast { index: usize },

    #[error("bracket {index} has an empty or inverted range")]
    EmptyRange { index: usize },

    #[error("bracket {index} starts at {start}, previous bracket ends at {previous_end}")]
    NotContiguous {
        index: usize,
        start: Decimal,
        previous_end: Decimal,
    },

    #[error("last bracket must be unbounded")]
    LastBracketBounded,
}

/// An ordered, contiguous bracket table.
///
/// The only way to build one is [`BracketSchedule::new`], which enforces:
/// the first bracket starts at zero, every bracket starts where the previous
/// one ends, ranges are non-empty, rates lie in `[0, 1]` and only the last
/// bracket is unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxBracket>", into = "Vec<TaxBracket>")]
pub struct BracketSchedule {
    brackets: Vec<TaxBracket>,
}

impl BracketSchedule {
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, BracketError> {
        let first = brackets.first().ok_or(BracketError::Empty)?;
        if first.min_income != Decimal::ZERO {
            return Err(BracketError::DoesNotStartAtZero(first.min_income));
        }

        let last_index = brackets.len() - 1;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(BracketError::InvalidRate {
                    index,
                    rate: bracket.rate,
                });
            }

            match bracket.max_income {
                None if index != last_index => {
                    return Err(BracketError::UnboundedBeforeLast { index });
                }
                None => {}
                Some(_) if index == last_index => return Err(BracketError::LastBracketBounded),
                Some(max) if max <= bracket.min_income => {
                    return Err(BracketError::EmptyRange { index });
                }
                Some(_) => {}
            }

            if index > 0 {
                let previous_end = brackets[index - 1].max_income.unwrap_or(Decimal::MAX);
                if bracket.min_income != previous_end {
                    return Err(BracketError::NotContiguous {
                        index,
                        start: bracket.min_income,
                        previous_end,
                    });
                }
            }
        }

        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    /// Marginal rate that applies to the next dollar above `income`.
    pub fn marginal_rate(
        &self,
        income: Decimal,
    ) -> Decimal {
        self.brackets
            .iter()
            .find(|b| b.max_income.is_none_or(|max| income < max))
            .map(|b| b.rate)
            .unwrap_or(Decimal::ZERO)
    }
}

impl TryFrom<Vec<TaxBracket>> for BracketSchedule {
    type Error = BracketError;

    fn try_from(brackets: Vec<TaxBracket>) -> Result<Self, Self::Error> {
        Self::new(brackets)
    }
}

impl From<BracketSchedule> for Vec<TaxBracket> {
    fn from(schedule: BracketSchedule) -> Self {
        schedule.brackets
    }
}
