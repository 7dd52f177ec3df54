//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-256 hashing
//! - secp256k1 key management
//! - EVM-style address derivation

pub mod hash;
pub mod keys;

pub use hash::{account_id, sha256, sha256_hex};
pub use keys::{public_key_to_address, KeyError, KeyPair};
