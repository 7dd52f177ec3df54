//! Deployed treasury contracts
//!
//! A [`TreasuryContract`] bundles a treasury and an NFT collection at one
//! address, sharing a single role set. [`ContractManager`] handles
//! deployment and lookup.

use crate::core::{Address, LedgerWriter};
use crate::crypto::account_id;
use crate::token::{CheckInEvent, CollectionMetadata, MintEvent, NftCollection, TokenError};
use crate::treasury::{
    DepositEvent, DisbursementOutcome, SweepEvent, TopUpRequest, Treasury, TreasuryError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Contract errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Contract not found: {0}")]
    NotFound(Address),
    #[error("Contract already exists: {0}")]
    AlreadyExists(Address),
    #[error("No contract deployed yet")]
    NoDeployment,
    #[error("Treasury error: {0}")]
    Treasury(#[from] TreasuryError),
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// A deployed contract: treasury + collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryContract {
    pub address: Address,
    pub deployer: Address,
    pub deployed_at: DateTime<Utc>,
    pub treasury: Treasury,
    pub collection: NftCollection,
}

impl TreasuryContract {
    /// Create a new contract; the deployer becomes controller and minter
    pub fn new(address: Address, deployer: Address, metadata: CollectionMetadata) -> Self {
        Self {
            address,
            deployer,
            deployed_at: Utc::now(),
            treasury: Treasury::new(deployer),
            collection: NftCollection::new(metadata),
        }
    }

    /// Anyone may fund the treasury
    pub fn deposit<L>(
        &mut self,
        from: &Address,
        amount: u128,
        ledger: &mut L,
    ) -> Result<DepositEvent, ContractError>
    where
        L: LedgerWriter + ?Sized,
    {
        Ok(self.treasury.deposit(from, amount, ledger)?)
    }

    /// Top up under-threshold recipients from the treasury
    pub fn distribute_if_below_from_treasury<L>(
        &mut self,
        caller: &Address,
        requests: &[TopUpRequest],
        ledger: &mut L,
    ) -> Result<DisbursementOutcome, ContractError>
    where
        L: LedgerWriter + ?Sized,
    {
        Ok(self.treasury.distribute_if_below(caller, requests, ledger)?)
    }

    pub fn sweep<L>(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: u128,
        ledger: &mut L,
    ) -> Result<SweepEvent, ContractError>
    where
        L: LedgerWriter + ?Sized,
    {
        Ok(self.treasury.sweep(caller, to, amount, ledger)?)
    }

    pub fn add_minter(&mut self, caller: &Address, minter: &Address) -> Result<bool, ContractError> {
        Ok(self.treasury.add_minter(caller, minter)?)
    }

    pub fn remove_minter(&mut self, caller: &Address, minter: &Address) -> Result<(), ContractError> {
        Ok(self.treasury.remove_minter(caller, minter)?)
    }

    pub fn mint(
        &mut self,
        caller: &Address,
        to: &Address,
        token_uri: &str,
    ) -> Result<MintEvent, ContractError> {
        let roles = self.treasury.roles();
        Ok(self.collection.mint(caller, roles, to, token_uri)?)
    }

    pub fn check_in(&mut self, caller: &Address) -> Result<CheckInEvent, ContractError> {
        Ok(self.collection.check_in(caller)?)
    }
}

/// Manages all deployed contracts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractManager {
    contracts: BTreeMap<Address, TreasuryContract>,
    /// Deployment counter for address generation
    nonce: u64,
    /// Most recent deployment
    latest: Option<Address>,
}

impl ContractManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a new contract
    pub fn deploy(
        &mut self,
        deployer: &Address,
        name: &str,
        symbol: &str,
    ) -> Result<Address, ContractError> {
        let metadata = CollectionMetadata::new(name.to_string(), symbol.to_string())?;

        let address = self.generate_address(deployer);
        self.nonce += 1;

        if self.contracts.contains_key(&address) {
            return Err(ContractError::AlreadyExists(address));
        }

        let contract = TreasuryContract::new(address, *deployer, metadata);
        self.contracts.insert(address, contract);
        self.latest = Some(address);

        log::info!("Contract deployed at {} by {}", address, deployer);

        Ok(address)
    }

    /// Contract address derived from deployer and nonce
    fn generate_address(&self, deployer: &Address) -> Address {
        let input = format!("{}:{}", deployer, self.nonce);
        Address::from_bytes(account_id(input.as_bytes()))
    }

    pub fn get(&self, address: &Address) -> Result<&TreasuryContract, ContractError> {
        self.contracts
            .get(address)
            .ok_or(ContractError::NotFound(*address))
    }

    pub fn get_mut(&mut self, address: &Address) -> Result<&mut TreasuryContract, ContractError> {
        self.contracts
            .get_mut(address)
            .ok_or(ContractError::NotFound(*address))
    }

    /// Address of the most recent deployment
    pub fn latest(&self) -> Result<Address, ContractError> {
        self.latest.ok_or(ContractError::NoDeployment)
    }

    /// Explicit address if given, otherwise the latest deployment
    pub fn resolve(&self, address: Option<&Address>) -> Result<Address, ContractError> {
        match address {
            Some(address) => self.get(address).map(|c| c.address),
            None => self.latest(),
        }
    }

    pub fn list(&self) -> Vec<&TreasuryContract> {
        self.contracts.values().collect()
    }

    pub fn count(&self) -> usize {
        self.contracts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LedgerReader, MemoryLedger};

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn test_deploy() {
        let mut manager = ContractManager::new();
        let address = manager.deploy(&addr(1), "Badges", "BDG").unwrap();

        let contract = manager.get(&address).unwrap();
        assert_eq!(contract.deployer, addr(1));
        assert_eq!(contract.treasury.controller(), &addr(1));
        assert!(contract.treasury.roles().is_minter(&addr(1)));
        assert_eq!(manager.latest().unwrap(), address);
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_deploy_addresses_are_unique() {
        let mut manager = ContractManager::new();
        let a = manager.deploy(&addr(1), "A", "A").unwrap();
        let b = manager.deploy(&addr(1), "B", "B").unwrap();
        assert_ne!(a, b);
        assert_eq!(manager.latest().unwrap(), b);
        assert_eq!(manager.resolve(Some(&a)).unwrap(), a);
    }

    #[test]
    fn test_deploy_validates_metadata() {
        let mut manager = ContractManager::new();
        let result = manager.deploy(&addr(1), "", "X");
        assert!(matches!(
            result,
            Err(ContractError::Token(TokenError::InvalidName))
        ));
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn test_lookup_errors() {
        let manager = ContractManager::new();
        assert_eq!(manager.latest().unwrap_err(), ContractError::NoDeployment);
        assert_eq!(
            manager.get(&addr(9)).unwrap_err(),
            ContractError::NotFound(addr(9))
        );
        assert!(manager.resolve(Some(&addr(9))).is_err());
    }

    #[test]
    fn test_contract_flow() {
        let mut manager = ContractManager::new();
        let mut ledger = MemoryLedger::new();
        ledger.allocate(&addr(1), 500).unwrap();

        let address = manager.deploy(&addr(1), "Badges", "BDG").unwrap();
        let contract = manager.get_mut(&address).unwrap();

        contract.deposit(&addr(1), 100, &mut ledger).unwrap();
        contract.add_minter(&addr(1), &addr(2)).unwrap();

        let requests = vec![TopUpRequest::new(addr(2), 0, 25, 10)];
        contract
            .distribute_if_below_from_treasury(&addr(1), &requests, &mut ledger)
            .unwrap();
        assert_eq!(ledger.balance_of(&addr(2)), 25);

        let minted = contract.mint(&addr(2), &addr(3), "ipfs://1").unwrap();
        assert_eq!(minted.token_id, 1);
        contract.check_in(&addr(3)).unwrap();

        contract.remove_minter(&addr(1), &addr(2)).unwrap();
        assert!(matches!(
            contract.mint(&addr(2), &addr(3), "ipfs://2"),
            Err(ContractError::Token(TokenError::NotMinter(_)))
        ));
    }
}
