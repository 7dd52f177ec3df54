//! Treasury disbursement
//!
//! A contract-held treasury that tops up recipients whose balance sits below
//! a threshold, plus the controller/minter roles guarding it.
//!
//! # Example
//!
//! ```rust
//! use gas_treasury::core::{Address, LedgerReader, MemoryLedger};
//! use gas_treasury::treasury::{TopUpRequest, Treasury};
//!
//! let controller = Address::from_bytes([0xC0; 20]);
//! let child = Address::from_bytes([0x01; 20]);
//!
//! let mut ledger = MemoryLedger::new();
//! ledger.allocate(&controller, 1_000).unwrap();
//!
//! let mut treasury = Treasury::new(controller);
//! treasury.deposit(&controller, 100, &mut ledger).unwrap();
//!
//! let batch = vec![TopUpRequest::new(child, ledger.balance_of(&child), 30, 1)];
//! let outcome = treasury
//!     .distribute_if_below(&controller, &batch, &mut ledger)
//!     .unwrap();
//!
//! assert_eq!(outcome.treasury_after, 70);
//! assert_eq!(ledger.balance_of(&child), 30);
//! ```

pub mod policy;
pub mod roles;
pub mod topup;
pub mod treasury;

pub use policy::{
    evaluate, DisbursementPlan, RecipientOutcome, Shortfall, SkipReason, TopUpRequest,
};
pub use roles::{Role, Roles};
pub use topup::{snapshot_requests, ShortfallReport, TopUpSettings};
pub use treasury::{
    DepositEvent, DisbursementOutcome, SweepEvent, Treasury, TreasuryError, TreasuryStats,
};
