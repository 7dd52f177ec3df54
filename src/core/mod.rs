//! Core chain components
//!
//! This module contains the building blocks everything else sits on:
//! - Addresses (20-byte, `0x`-hex)
//! - The native-value ledger and its reader/writer capabilities
//! - Chain state (ledger + deployed contracts)

pub mod address;
pub mod ledger;
pub mod state;

pub use address::{Address, AddressError, ADDRESS_LEN};
pub use ledger::{
    EntryKind, LedgerEntry, LedgerError, LedgerReader, LedgerWriter, MemoryLedger, Transfer,
    MAX_HISTORY,
};
pub use state::{ChainState, StateStats};
