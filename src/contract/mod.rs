//! Treasury contracts
//!
//! Each deployment holds a treasury and an ERC-721 style collection behind a
//! single controller/minter role set, mirroring a contract that both mints
//! badges and funds its users' gas.
//!
//! # Example
//!
//! ```rust
//! use gas_treasury::contract::ContractManager;
//! use gas_treasury::core::Address;
//!
//! let operator = Address::from_bytes([0xAA; 20]);
//! let mut manager = ContractManager::new();
//! let address = manager.deploy(&operator, "Demo Badges", "BADGE").unwrap();
//!
//! let contract = manager.get_mut(&address).unwrap();
//! let event = contract.mint(&operator, &operator, "ipfs://badge/1").unwrap();
//! assert_eq!(event.token_id, 1);
//! ```

pub mod contract;

pub use contract::{ContractError, ContractManager, TreasuryContract};
