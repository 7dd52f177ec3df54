//! Wallet module for local key and child-wallet management

pub mod wallet;

pub use wallet::{Wallet, WalletError, WalletInfo, WalletManager};
