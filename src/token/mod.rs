//! ERC-721 style collection
//!
//! Provides a non-fungible token collection with:
//! - Sequential token ids with per-token URIs
//! - Minting restricted to the contract's minter set
//! - Owner-initiated transfers
//! - Per-address check-in records

pub mod collection;

pub use collection::{
    CheckIn, CheckInEvent, CollectionMetadata, MintEvent, NftCollection, TokenError,
    TransferEvent,
};
