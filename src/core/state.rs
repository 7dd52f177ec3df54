//! Chain state
//!
//! The ledger plus every deployed contract: the unit the CLI loads and
//! saves, and the unit the REST API guards with one lock. Each operation
//! takes `&mut self`, so a top-up batch reads its balance snapshot,
//! evaluates and commits without anything else touching the same state.

use crate::contract::{ContractError, ContractManager};
use crate::core::address::Address;
use crate::core::ledger::{LedgerError, LedgerReader, MemoryLedger};
use crate::token::{CheckInEvent, MintEvent};
use crate::treasury::{
    snapshot_requests, DepositEvent, DisbursementOutcome, SweepEvent, TopUpSettings,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger and deployed contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainState {
    pub ledger: MemoryLedger,
    pub contracts: ContractManager,
    pub created_at: DateTime<Utc>,
}

/// Summary numbers for display
#[derive(Debug, Clone, Serialize)]
pub struct StateStats {
    pub funded_accounts: usize,
    pub total_value: u128,
    pub contracts: usize,
}

impl Default for ChainState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainState {
    pub fn new() -> Self {
        Self {
            ledger: MemoryLedger::new(),
            contracts: ContractManager::new(),
            created_at: Utc::now(),
        }
    }

    /// Seed demo funds
    pub fn allocate(&mut self, address: &Address, amount: u128) -> Result<(), LedgerError> {
        self.ledger.allocate(address, amount)
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.ledger.balance_of(address)
    }

    pub fn deploy(
        &mut self,
        deployer: &Address,
        name: &str,
        symbol: &str,
    ) -> Result<Address, ContractError> {
        self.contracts.deploy(deployer, name, symbol)
    }

    pub fn deposit(
        &mut self,
        contract: Option<&Address>,
        from: &Address,
        amount: u128,
    ) -> Result<DepositEvent, ContractError> {
        let address = self.contracts.resolve(contract)?;
        let contract = self.contracts.get_mut(&address)?;
        contract.deposit(from, amount, &mut self.ledger)
    }

    /// Snapshot the recipients' balances and run one disbursement batch
    pub fn top_up(
        &mut self,
        contract: Option<&Address>,
        caller: &Address,
        recipients: &[Option<Address>],
        settings: TopUpSettings,
    ) -> Result<DisbursementOutcome, ContractError> {
        let address = self.contracts.resolve(contract)?;
        let requests = snapshot_requests(&self.ledger, recipients, settings);
        let contract = self.contracts.get_mut(&address)?;
        contract.distribute_if_below_from_treasury(caller, &requests, &mut self.ledger)
    }

    pub fn sweep(
        &mut self,
        contract: Option<&Address>,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<SweepEvent, ContractError> {
        let address = self.contracts.resolve(contract)?;
        let contract = self.contracts.get_mut(&address)?;
        contract.sweep(caller, to, amount, &mut self.ledger)
    }

    pub fn add_minter(
        &mut self,
        contract: Option<&Address>,
        caller: &Address,
        minter: &Address,
    ) -> Result<bool, ContractError> {
        let address = self.contracts.resolve(contract)?;
        self.contracts.get_mut(&address)?.add_minter(caller, minter)
    }

    pub fn remove_minter(
        &mut self,
        contract: Option<&Address>,
        caller: &Address,
        minter: &Address,
    ) -> Result<(), ContractError> {
        let address = self.contracts.resolve(contract)?;
        self.contracts.get_mut(&address)?.remove_minter(caller, minter)
    }

    pub fn mint(
        &mut self,
        contract: Option<&Address>,
        caller: &Address,
        to: &Address,
        token_uri: &str,
    ) -> Result<MintEvent, ContractError> {
        let address = self.contracts.resolve(contract)?;
        self.contracts.get_mut(&address)?.mint(caller, to, token_uri)
    }

    pub fn check_in(
        &mut self,
        contract: Option<&Address>,
        caller: &Address,
    ) -> Result<CheckInEvent, ContractError> {
        let address = self.contracts.resolve(contract)?;
        self.contracts.get_mut(&address)?.check_in(caller)
    }

    pub fn stats(&self) -> StateStats {
        StateStats {
            funded_accounts: self.ledger.accounts().len(),
            total_value: self.ledger.total_supply(),
            contracts: self.contracts.count(),
        }
    }
}
