//! ERC-721 style collection
//!
//! Non-fungible tokens with sequential ids, per-token URIs, minting gated on
//! the minter role, and a per-address check-in counter.

use crate::core::Address;
use crate::treasury::Roles;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Collection-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Not a minter: {0}")]
    NotMinter(Address),
    #[error("Not the owner of token {token_id}: {caller}")]
    NotOwner { caller: Address, token_id: u64 },
    #[error("Token not found: {0}")]
    TokenNotFound(u64),
    #[error("Invalid recipient: cannot use the zero address")]
    InvalidRecipient,
    #[error("Invalid address: cannot transfer to self")]
    SelfTransfer,
    #[error("Invalid symbol: must be 1-10 characters")]
    InvalidSymbol,
    #[error("Invalid name: must be 1-50 characters")]
    InvalidName,
    #[error("Invalid token URI: must be 1-256 characters")]
    InvalidUri,
}

/// Collection metadata (immutable after deployment)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CollectionMetadata {
    /// Collection name (e.g., "Demo Badges")
    pub name: String,
    /// Collection symbol (e.g., "BADGE")
    pub symbol: String,
    pub created_at: DateTime<Utc>,
}

impl CollectionMetadata {
    /// Create new metadata with validation
    pub fn new(name: String, symbol: String) -> Result<Self, TokenError> {
        if name.is_empty() || name.len() > 50 {
            return Err(TokenError::InvalidName);
        }

        if symbol.is_empty() || symbol.len() > 10 {
            return Err(TokenError::InvalidSymbol);
        }

        Ok(Self {
            name,
            symbol,
            created_at: Utc::now(),
        })
    }
}

/// Emitted when a token is minted
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MintEvent {
    pub token_id: u64,
    pub minter: Address,
    pub to: Address,
    pub token_uri: String,
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a token changes owner
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferEvent {
    pub token_id: u64,
    pub from: Address,
    pub to: Address,
    pub timestamp: DateTime<Utc>,
}

/// Emitted on every check-in
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckInEvent {
    pub address: Address,
    pub count: u64,
    pub timestamp: DateTime<Utc>,
}

/// Check-in record for one address
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckIn {
    pub count: u64,
    pub last_at: DateTime<Utc>,
}

/// An ERC-721 style collection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NftCollection {
    pub metadata: CollectionMetadata,
    /// Next id to assign; ids start at 1
    next_token_id: u64,
    owners: BTreeMap<u64, Address>,
    token_uris: BTreeMap<u64, String>,
    balances: HashMap<Address, u64>,
    #[serde(default)]
    check_ins: HashMap<Address, CheckIn>,
}

impl NftCollection {
    pub fn new(metadata: CollectionMetadata) -> Self {
        Self {
            metadata,
            next_token_id: 1,
            owners: BTreeMap::new(),
            token_uris: BTreeMap::new(),
            balances: HashMap::new(),
            check_ins: HashMap::new(),
        }
    }

    // =========================================================================
    // View functions
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    /// Number of tokens minted so far
    pub fn total_supply(&self) -> u64 {
        self.owners.len() as u64
    }

    /// Number of tokens owned by an address
    pub fn balance_of(&self, owner: &Address) -> u64 {
        *self.balances.get(owner).unwrap_or(&0)
    }

    pub fn owner_of(&self, token_id: u64) -> Result<Address, TokenError> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(TokenError::TokenNotFound(token_id))
    }

    pub fn token_uri(&self, token_id: u64) -> Result<&str, TokenError> {
        self.token_uris
            .get(&token_id)
            .map(String::as_str)
            .ok_or(TokenError::TokenNotFound(token_id))
    }

    /// Token ids owned by an address, ascending
    pub fn tokens_of(&self, owner: &Address) -> Vec<u64> {
        self.owners
            .iter()
            .filter(|(_, o)| *o == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn check_in_of(&self, address: &Address) -> Option<&CheckIn> {
        self.check_ins.get(address)
    }

    // =========================================================================
    // Mutating functions
    // =========================================================================

    /// Mint the next token to `to`
    ///
    /// # Arguments
    /// * `caller` - Must hold the minter role in `roles`
    /// * `roles` - Role set of the owning contract
    /// * `to` - Recipient of the new token
    /// * `token_uri` - Metadata URI stored with the token
    pub fn mint(
        &mut self,
        caller: &Address,
        roles: &Roles,
        to: &Address,
        token_uri: &str,
    ) -> Result<MintEvent, TokenError> {
        if !roles.is_minter(caller) {
            return Err(TokenError::NotMinter(*caller));
        }
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }
        if token_uri.is_empty() || token_uri.len() > 256 {
            return Err(TokenError::InvalidUri);
        }

        let token_id = self.next_token_id;
        self.next_token_id += 1;

        self.owners.insert(token_id, *to);
        self.token_uris.insert(token_id, token_uri.to_string());
        *self.balances.entry(*to).or_insert(0) += 1;

        log::info!(
            "Minted {} #{} to {}",
            self.metadata.symbol,
            token_id,
            to.short()
        );

        Ok(MintEvent {
            token_id,
            minter: *caller,
            to: *to,
            token_uri: token_uri.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Move a token owned by `caller` to `to`
    pub fn transfer(
        &mut self,
        caller: &Address,
        to: &Address,
        token_id: u64,
    ) -> Result<TransferEvent, TokenError> {
        let owner = self.owner_of(token_id)?;
        if owner != *caller {
            return Err(TokenError::NotOwner {
                caller: *caller,
                token_id,
            });
        }
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }
        if to == caller {
            return Err(TokenError::SelfTransfer);
        }

        self.owners.insert(token_id, *to);
        if let Some(count) = self.balances.get_mut(caller) {
            *count -= 1;
        }
        *self.balances.entry(*to).or_insert(0) += 1;

        Ok(TransferEvent {
            token_id,
            from: *caller,
            to: *to,
            timestamp: Utc::now(),
        })
    }

    /// Record a check-in for `caller`
    pub fn check_in(&mut self, caller: &Address) -> Result<CheckInEvent, TokenError> {
        if caller.is_zero() {
            return Err(TokenError::InvalidRecipient);
        }

        let now = Utc::now();
        let record = self.check_ins.entry(*caller).or_insert(CheckIn {
            count: 0,
            last_at: now,
        });
        record.count += 1;
        record.last_at = now;

        log::debug!("Check-in #{} for {}", record.count, caller.short());

        Ok(CheckInEvent {
            address: *caller,
            count: record.count,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn create_test_collection() -> (NftCollection, Roles) {
        let metadata =
            CollectionMetadata::new("Demo Badges".to_string(), "BADGE".to_string()).unwrap();
        (NftCollection::new(metadata), Roles::new(addr(1)))
    }

    #[test]
    fn test_collection_creation() {
        let (collection, _) = create_test_collection();
        assert_eq!(collection.name(), "Demo Badges");
        assert_eq!(collection.symbol(), "BADGE");
        assert_eq!(collection.total_supply(), 0);
    }

    #[test]
    fn test_metadata_validation() {
        assert_eq!(
            CollectionMetadata::new("".to_string(), "B".to_string()).unwrap_err(),
            TokenError::InvalidName
        );
        assert_eq!(
            CollectionMetadata::new("Badges".to_string(), "TOOLONGSYMBOL".to_string())
                .unwrap_err(),
            TokenError::InvalidSymbol
        );
    }

    #[test]
    fn test_mint() {
        let (mut collection, roles) = create_test_collection();

        let first = collection
            .mint(&addr(1), &roles, &addr(2), "ipfs://badge/1")
            .unwrap();
        let second = collection
            .mint(&addr(1), &roles, &addr(2), "ipfs://badge/2")
            .unwrap();

        assert_eq!(first.token_id, 1);
        assert_eq!(second.token_id, 2);
        assert_eq!(collection.owner_of(1).unwrap(), addr(2));
        assert_eq!(collection.token_uri(2).unwrap(), "ipfs://badge/2");
        assert_eq!(collection.balance_of(&addr(2)), 2);
        assert_eq!(collection.tokens_of(&addr(2)), vec![1, 2]);
        assert_eq!(collection.total_supply(), 2);
    }

    #[test]
    fn test_mint_requires_minter() {
        let (mut collection, roles) = create_test_collection();

        let result = collection.mint(&addr(3), &roles, &addr(2), "ipfs://x");
        assert_eq!(result.unwrap_err(), TokenError::NotMinter(addr(3)));
        assert_eq!(collection.total_supply(), 0);
    }

    #[test]
    fn test_mint_validation() {
        let (mut collection, roles) = create_test_collection();

        assert_eq!(
            collection
                .mint(&addr(1), &roles, &Address::ZERO, "ipfs://x")
                .unwrap_err(),
            TokenError::InvalidRecipient
        );
        assert_eq!(
            collection.mint(&addr(1), &roles, &addr(2), "").unwrap_err(),
            TokenError::InvalidUri
        );
    }

    #[test]
    fn test_transfer() {
        let (mut collection, roles) = create_test_collection();
        collection
            .mint(&addr(1), &roles, &addr(2), "ipfs://x")
            .unwrap();

        let event = collection.transfer(&addr(2), &addr(3), 1).unwrap();
        assert_eq!(event.from, addr(2));
        assert_eq!(collection.owner_of(1).unwrap(), addr(3));
        assert_eq!(collection.balance_of(&addr(2)), 0);
        assert_eq!(collection.balance_of(&addr(3)), 1);
    }

    #[test]
    fn test_transfer_errors() {
        let (mut collection, roles) = create_test_collection();
        collection
            .mint(&addr(1), &roles, &addr(2), "ipfs://x")
            .unwrap();

        assert_eq!(
            collection.transfer(&addr(3), &addr(4), 1).unwrap_err(),
            TokenError::NotOwner {
                caller: addr(3),
                token_id: 1
            }
        );
        assert_eq!(
            collection.transfer(&addr(2), &addr(4), 9).unwrap_err(),
            TokenError::TokenNotFound(9)
        );
        assert_eq!(
            collection.transfer(&addr(2), &addr(2), 1).unwrap_err(),
            TokenError::SelfTransfer
        );
    }

    #[test]
    fn test_check_in_counts() {
        let (mut collection, _) = create_test_collection();

        assert!(collection.check_in_of(&addr(2)).is_none());
        collection.check_in(&addr(2)).unwrap();
        let event = collection.check_in(&addr(2)).unwrap();

        assert_eq!(event.count, 2);
        assert_eq!(collection.check_in_of(&addr(2)).unwrap().count, 2);
        assert!(collection.check_in(&Address::ZERO).is_err());
    }
}
