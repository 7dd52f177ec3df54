//! Contract-held treasury
//!
//! A [`Treasury`] owns a native-value balance and the role set that guards
//! it. Every mutating call takes the treasury and the ledger by `&mut`, so a
//! batch runs to completion without another operation on the same treasury
//! observing it halfway.

use crate::core::{Address, LedgerError, LedgerWriter, Transfer};
use crate::treasury::policy::{self, RecipientOutcome, Shortfall, TopUpRequest};
use crate::treasury::roles::Roles;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Treasury errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    #[error("Unauthorized: {caller} is not the controller")]
    Unauthorized { caller: Address },
    #[error("Insufficient treasury: required {required}, available {available}")]
    InsufficientTreasury {
        required: u128,
        available: u128,
        short: Vec<Shortfall>,
    },
    #[error("Transfer to {recipient} rejected: {reason}")]
    TransferRejected { recipient: Address, reason: String },
    #[error("Not a minter: {0}")]
    NotMinter(Address),
    #[error("Amount overflow")]
    AmountOverflow,
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Invalid recipient: the zero address cannot hold a role")]
    InvalidRecipient,
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl TreasuryError {
    /// Map a failed batch commit onto the recipient the ledger refused
    fn from_commit(err: LedgerError, transfers: &[Transfer]) -> Self {
        match err {
            LedgerError::Rejected { recipient, reason } => {
                TreasuryError::TransferRejected { recipient, reason }
            }
            other => TreasuryError::TransferRejected {
                recipient: transfers.first().map(|t| t.to).unwrap_or_default(),
                reason: other.to_string(),
            },
        }
    }
}

/// Result of a successful disbursement batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementOutcome {
    pub outcomes: Vec<RecipientOutcome>,
    pub total_sent: u128,
    pub treasury_before: u128,
    pub treasury_after: u128,
}

impl DisbursementOutcome {
    /// Recipients that received value, in request order (duplicates kept)
    pub fn paid(&self) -> Vec<Address> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                RecipientOutcome::Sent { recipient, .. } => Some(*recipient),
                RecipientOutcome::Skipped { .. } => None,
            })
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_sent()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.sent_count()
    }
}

/// Emitted when value enters the treasury
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositEvent {
    pub from: Address,
    pub amount: u128,
    pub balance_after: u128,
    pub timestamp: DateTime<Utc>,
}

/// Emitted when the controller sweeps value out
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepEvent {
    pub to: Address,
    pub amount: u128,
    pub balance_after: u128,
    pub timestamp: DateTime<Utc>,
}

/// Lifetime counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryStats {
    pub total_deposited: u128,
    pub total_disbursed: u128,
    pub total_swept: u128,
    pub batches: u64,
}

/// The treasury held by a deployed contract
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Treasury {
    balance: u128,
    roles: Roles,
    #[serde(default)]
    stats: TreasuryStats,
}

impl Treasury {
    /// Create an empty treasury controlled by `controller`
    pub fn new(controller: Address) -> Self {
        Self {
            balance: 0,
            roles: Roles::new(controller),
            stats: TreasuryStats::default(),
        }
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn controller(&self) -> &Address {
        self.roles.controller()
    }

    pub fn stats(&self) -> &TreasuryStats {
        &self.stats
    }

    fn ensure_controller(&self, caller: &Address) -> Result<(), TreasuryError> {
        if self.roles.is_controller(caller) {
            Ok(())
        } else {
            Err(TreasuryError::Unauthorized { caller: *caller })
        }
    }

    // =========================================================================
    // Value movements
    // =========================================================================

    /// Move `amount` from `from`'s ledger account into the treasury.
    ///
    /// Anyone may deposit.
    pub fn deposit<L>(
        &mut self,
        from: &Address,
        amount: u128,
        ledger: &mut L,
    ) -> Result<DepositEvent, TreasuryError>
    where
        L: LedgerWriter + ?Sized,
    {
        if amount == 0 {
            return Err(TreasuryError::InvalidAmount);
        }
        let balance_after = self
            .balance
            .checked_add(amount)
            .ok_or(TreasuryError::AmountOverflow)?;

        ledger.debit(from, amount)?;

        self.balance = balance_after;
        self.stats.total_deposited = self.stats.total_deposited.saturating_add(amount);

        log::info!(
            "Treasury deposit: {} from {} (balance {})",
            amount,
            from.short(),
            balance_after
        );

        Ok(DepositEvent {
            from: *from,
            amount,
            balance_after,
            timestamp: Utc::now(),
        })
    }

    /// Top up every listed recipient whose snapshot balance is below its
    /// threshold.
    ///
    /// The batch is all-or-nothing: it is refused up front when the
    /// treasury cannot cover every eligible top-up, and a ledger rejection
    /// of any single transfer aborts the whole batch with no balance
    /// changed anywhere.
    pub fn distribute_if_below<L>(
        &mut self,
        caller: &Address,
        requests: &[TopUpRequest],
        ledger: &mut L,
    ) -> Result<DisbursementOutcome, TreasuryError>
    where
        L: LedgerWriter + ?Sized,
    {
        self.ensure_controller(caller)?;

        let plan = match policy::evaluate(self.balance, requests) {
            Ok(plan) => plan,
            Err(err) => {
                log::warn!("Top-up batch refused: {}", err);
                return Err(err);
            }
        };

        if !plan.transfers.is_empty() {
            if let Err(err) = ledger.commit(&plan.transfers) {
                let err = TreasuryError::from_commit(err, &plan.transfers);
                log::warn!("Top-up batch aborted: {}", err);
                return Err(err);
            }
        }

        let treasury_before = self.balance;
        // required <= balance was checked by the policy
        self.balance -= plan.required;
        self.stats.total_disbursed = self.stats.total_disbursed.saturating_add(plan.required);
        self.stats.batches += 1;

        let outcome = DisbursementOutcome {
            outcomes: plan.outcomes,
            total_sent: plan.required,
            treasury_before,
            treasury_after: self.balance,
        };

        log::info!(
            "Top-up batch: {} sent, {} skipped, {} disbursed (treasury {} -> {})",
            outcome.sent_count(),
            outcome.skipped_count(),
            outcome.total_sent,
            outcome.treasury_before,
            outcome.treasury_after
        );

        Ok(outcome)
    }

    /// Send an arbitrary amount out of the treasury, bypassing thresholds
    pub fn sweep<L>(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: u128,
        ledger: &mut L,
    ) -> Result<SweepEvent, TreasuryError>
    where
        L: LedgerWriter + ?Sized,
    {
        self.ensure_controller(caller)?;

        if amount == 0 {
            return Err(TreasuryError::InvalidAmount);
        }
        if amount > self.balance {
            return Err(TreasuryError::InsufficientTreasury {
                required: amount,
                available: self.balance,
                short: Vec::new(),
            });
        }

        let transfers = [Transfer { to: *to, amount }];
        ledger
            .commit(&transfers)
            .map_err(|err| TreasuryError::from_commit(err, &transfers))?;

        self.balance -= amount;
        self.stats.total_swept = self.stats.total_swept.saturating_add(amount);

        log::info!(
            "Treasury sweep: {} to {} (balance {})",
            amount,
            to.short(),
            self.balance
        );

        Ok(SweepEvent {
            to: *to,
            amount,
            balance_after: self.balance,
            timestamp: Utc::now(),
        })
    }

    // =========================================================================
    // Role management
    // =========================================================================

    /// Grant minting rights. Returns false when `minter` already had them.
    pub fn add_minter(&mut self, caller: &Address, minter: &Address) -> Result<bool, TreasuryError> {
        self.ensure_controller(caller)?;
        if minter.is_zero() {
            return Err(TreasuryError::InvalidRecipient);
        }

        let added = self.roles.insert_minter(*minter);
        if added {
            log::info!("Minter added: {}", minter);
        } else {
            log::debug!("Minter already present: {}", minter);
        }
        Ok(added)
    }

    /// Revoke minting rights
    pub fn remove_minter(&mut self, caller: &Address, minter: &Address) -> Result<(), TreasuryError> {
        self.ensure_controller(caller)?;
        if !self.roles.remove_minter(minter) {
            return Err(TreasuryError::NotMinter(*minter));
        }
        log::info!("Minter removed: {}", minter);
        Ok(())
    }

    /// Hand the controller role to another address
    pub fn transfer_controller(
        &mut self,
        caller: &Address,
        new_controller: &Address,
    ) -> Result<(), TreasuryError> {
        self.ensure_controller(caller)?;
        if new_controller.is_zero() {
            return Err(TreasuryError::InvalidRecipient);
        }
        self.roles.set_controller(*new_controller);
        log::info!("Controller transferred to {}", new_controller);
        Ok(())
    }
}
