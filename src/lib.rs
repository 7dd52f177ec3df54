//! Gas Treasury: threshold-gated wallet top-ups from a shared treasury
//!
//! This crate provides:
//! - A treasury with an aggregate pre-check and all-or-nothing batch top-ups
//! - Controller and minter roles
//! - An NFT collection with minter-gated minting and check-ins
//! - An in-memory ledger with atomic batch commits, persisted as JSON
//! - Local secp256k1 wallets with operator child wallets
//! - A flat-file user store and a REST API with a WebSocket event feed
//! - Retry with capped exponential backoff for orchestration I/O
//!
//! # Example
//!
//! ```rust
//! use gas_treasury::core::{Address, ChainState};
//! use gas_treasury::treasury::TopUpSettings;
//!
//! let operator = Address::from_bytes([1; 20]);
//! let wallet = Address::from_bytes([2; 20]);
//!
//! let mut state = ChainState::new();
//! state.allocate(&operator, 1_000).unwrap();
//! state.deploy(&operator, "Badges", "BDG").unwrap();
//! state.deposit(None, &operator, 500).unwrap();
//!
//! let settings = TopUpSettings { amount: 100, threshold: 50 };
//! let outcome = state.top_up(None, &operator, &[Some(wallet)], settings).unwrap();
//! assert_eq!(outcome.total_sent, 100);
//! assert_eq!(state.balance_of(&wallet), 100);
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod contract;
pub mod core;
pub mod crypto;
pub mod retry;
pub mod storage;
pub mod token;
pub mod treasury;
pub mod wallet;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use config::AppConfig;
pub use contract::{ContractManager, TreasuryContract};
pub use core::{Address, ChainState, LedgerReader, LedgerWriter, MemoryLedger};
pub use crypto::KeyPair;
pub use retry::{retry, retry_async, RetryConfig};
pub use storage::{Storage, UserStore};
pub use token::NftCollection;
pub use treasury::{
    evaluate, DisbursementOutcome, RecipientOutcome, TopUpRequest, Treasury, TreasuryError,
};
pub use wallet::Wallet;
