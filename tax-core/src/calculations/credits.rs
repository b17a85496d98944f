//! Tax credit sources.
//!
//! Credit eligibility rules (phase-outs by AGI, dependents, education
//! expenses) are not implemented. [`UnimplementedCredits`] is the default
//! source and always reports zero credits; callers with real credit figures
//! can inject their own [`CreditSource`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

use crate::Credits;
use crate::calculations::common::round_half_up;
use crate::db::RepositoryError;

#[async_trait]
pub trait CreditSource: Send + Sync {
    async fn credits_for(
        &self,
        user_id: &str,
        year: i32,
    ) -> Result<Credits, RepositoryError>;
}

/// Always returns zero credits.
#[derive(Debug, Default)]
pub struct UnimplementedCredits {
    logged: AtomicBool,
}

#[async_trait]
impl CreditSource for UnimplementedCredits {
    async fn credits_for(
        &self,
        _user_id: &str,
        _year: i32,
    ) -> Result<Credits, RepositoryError> {
        if !self.logged.swap(true, Ordering::Relaxed) {
            debug!("tax credit rules are not implemented; applying zero credits");
        }
        Ok(Credits::default())
    }
}

/// Returns the same credits for every user and year.
#[derive(Debug, Clone, Default)]
pub struct FixedCredits(pub Credits);

#[async_trait]
impl CreditSource for FixedCredits {
    async fn credits_for(
        &self,
        _user_id: &str,
        _year: i32,
    ) -> Result<Credits, RepositoryError> {
        Ok(self.0.clone())
    }
}

/// Flat sum of the five credit fields.
pub fn total_credits(credits: &Credits) -> Decimal {
    round_half_up(credits.total())
}
