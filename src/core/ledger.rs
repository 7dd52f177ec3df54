//! Native-value ledger
//!
//! The treasury never talks to a chain directly. It reads balances through
//! [`LedgerReader`] and commits value movements through [`LedgerWriter`].
//! [`MemoryLedger`] is the in-process implementation used by the CLI, the
//! REST API and the tests; it is persisted as part of the chain state.

use crate::core::address::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Maximum number of entries kept in the ledger history
pub const MAX_HISTORY: usize = 1000;

/// Ledger-layer failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transfer to {recipient} rejected: {reason}")]
    Rejected { recipient: Address, reason: String },
    #[error("Insufficient funds in {address}: have {have}, need {need}")]
    InsufficientFunds {
        address: Address,
        have: u128,
        need: u128,
    },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
}

/// A single credit of native value to an address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: Address,
    pub amount: u128,
}

/// Read access to account balances
pub trait LedgerReader {
    /// Current balance of an address (zero when unknown)
    fn balance_of(&self, address: &Address) -> u128;
}

/// Write access to account balances
pub trait LedgerWriter: LedgerReader {
    /// Apply every transfer or none of them.
    ///
    /// On error the ledger is left exactly as it was before the call.
    fn commit(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError>;

    /// Remove value from an account (used for deposits into a contract)
    fn debit(&mut self, from: &Address, amount: u128) -> Result<(), LedgerError>;
}

/// Kind of ledger history entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Allocation,
    Credit,
    Debit,
}

/// Ledger history entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: EntryKind,
    pub address: Address,
    pub amount: u128,
    pub timestamp: DateTime<Utc>,
}

/// In-memory ledger with atomic batch commits
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryLedger {
    balances: BTreeMap<Address, u128>,
    /// Addresses that refuse incoming value
    #[serde(default)]
    rejecting: BTreeSet<Address>,
    #[serde(default)]
    history: Vec<LedgerEntry>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an address with funds outside of any transfer (genesis/faucet)
    pub fn allocate(&mut self, address: &Address, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let current = self.balance_of(address);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Rejected {
                recipient: *address,
                reason: "balance overflow".to_string(),
            })?;
        self.balances.insert(*address, updated);
        self.record(EntryKind::Allocation, address, amount);
        Ok(())
    }

    /// Make an address refuse (or accept again) incoming value
    pub fn set_rejecting(&mut self, address: &Address, rejecting: bool) {
        if rejecting {
            self.rejecting.insert(*address);
        } else {
            self.rejecting.remove(address);
        }
    }

    /// Addresses with a non-zero balance
    pub fn accounts(&self) -> Vec<(&Address, &u128)> {
        self.balances.iter().filter(|(_, &b)| b > 0).collect()
    }

    /// Sum of all balances held in the ledger
    pub fn total_supply(&self) -> u128 {
        self.balances.values().fold(0u128, |acc, b| acc.saturating_add(*b))
    }

    /// Most recent history entries, newest last
    pub fn history(&self) -> &[LedgerEntry] {
        &self.history
    }

    fn check_credit(&self, to: &Address, current: u128, amount: u128) -> Result<u128, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::Rejected {
                recipient: *to,
                reason: "cannot send value to the zero address".to_string(),
            });
        }
        if self.rejecting.contains(to) {
            return Err(LedgerError::Rejected {
                recipient: *to,
                reason: "recipient refuses incoming value".to_string(),
            });
        }
        current.checked_add(amount).ok_or_else(|| LedgerError::Rejected {
            recipient: *to,
            reason: "balance overflow".to_string(),
        })
    }

    fn record(&mut self, kind: EntryKind, address: &Address, amount: u128) {
        self.history.push(LedgerEntry {
            kind,
            address: *address,
            amount,
            timestamp: Utc::now(),
        });
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }
}

impl LedgerReader for MemoryLedger {
    fn balance_of(&self, address: &Address) -> u128 {
        *self.balances.get(address).unwrap_or(&0)
    }
}

impl LedgerWriter for MemoryLedger {
    fn commit(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError> {
        // Stage every resulting balance first; nothing is written unless all pass.
        let mut staged: BTreeMap<Address, u128> = BTreeMap::new();
        for transfer in transfers {
            let current = staged
                .get(&transfer.to)
                .copied()
                .unwrap_or_else(|| self.balance_of(&transfer.to));
            let updated = self.check_credit(&transfer.to, current, transfer.amount)?;
            staged.insert(transfer.to, updated);
        }

        self.balances.extend(staged);
        for transfer in transfers {
            self.record(EntryKind::Credit, &transfer.to, transfer.amount);
        }

        log::debug!("Ledger committed {} transfer(s)", transfers.len());
        Ok(())
    }

    fn debit(&mut self, from: &Address, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let have = self.balance_of(from);
        if have < amount {
            return Err(LedgerError::InsufficientFunds {
                address: *from,
                have,
                need: amount,
            });
        }
        self.balances.insert(*from, have - amount);
        self.record(EntryKind::Debit, from, amount);
        Ok(())
    }
}
