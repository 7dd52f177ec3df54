//! Caller-side helpers for top-up batches
//!
//! The policy trusts whatever balances it is handed. These helpers read them
//! fresh from a [`LedgerReader`] right before a batch, which is what keeps
//! a retried batch from paying someone twice.

use crate::core::{Address, LedgerReader};
use crate::treasury::policy::{Shortfall, TopUpRequest};
use crate::treasury::treasury::TreasuryError;
use serde::{Deserialize, Serialize};

/// Flat amount and threshold applied to every recipient of a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopUpSettings {
    pub amount: u128,
    pub threshold: u128,
}

/// Build a batch from the recipients' current ledger balances
pub fn snapshot_requests<R>(
    reader: &R,
    recipients: &[Option<Address>],
    settings: TopUpSettings,
) -> Vec<TopUpRequest>
where
    R: LedgerReader + ?Sized,
{
    recipients
        .iter()
        .map(|recipient| TopUpRequest {
            recipient: *recipient,
            current_balance: recipient
                .map(|address| reader.balance_of(&address))
                .unwrap_or(0),
            amount: settings.amount,
            threshold: settings.threshold,
        })
        .collect()
}

/// Why a batch could not be funded, in a form fit for end users
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortfallReport {
    pub required: u128,
    pub available: u128,
    /// Amount the treasury must receive before the batch can succeed
    pub missing: u128,
    pub short: Vec<Shortfall>,
}

impl ShortfallReport {
    /// Extract the report from an `InsufficientTreasury` error
    pub fn from_error(err: &TreasuryError) -> Option<Self> {
        match err {
            TreasuryError::InsufficientTreasury {
                required,
                available,
                short,
            } => Some(Self {
                required: *required,
                available: *available,
                missing: required.saturating_sub(*available),
                short: short.clone(),
            }),
            _ => None,
        }
    }

    /// One line per short recipient
    pub fn lines(&self) -> Vec<String> {
        self.short
            .iter()
            .map(|s| {
                format!(
                    "{} has {} (threshold {}, {} below), top-up {}",
                    s.recipient,
                    s.current_balance,
                    s.threshold,
                    s.deficit(),
                    s.amount
                )
            })
            .collect()
    }
}
