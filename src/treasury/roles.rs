//! Authorization store
//!
//! One controller at a time plus a set of minters. Role membership is the
//! only state; there is no separate permission table.

use crate::core::Address;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

bitflags! {
    /// Roles an address can hold
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Role: u8 {
        const CONTROLLER = 0b0000_0001;
        const MINTER = 0b0000_0010;
    }
}

impl Role {
    /// Lowercase flag names, e.g. `["controller", "minter"]`
    pub fn names(&self) -> Vec<String> {
        self.iter_names()
            .map(|(name, _)| name.to_lowercase())
            .collect()
    }
}

/// Controller identity and minter set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    controller: Address,
    minters: BTreeSet<Address>,
}

impl Roles {
    /// The controller starts out as the only minter
    pub fn new(controller: Address) -> Self {
        let mut minters = BTreeSet::new();
        minters.insert(controller);
        Self {
            controller,
            minters,
        }
    }

    pub fn controller(&self) -> &Address {
        &self.controller
    }

    pub fn is_controller(&self, address: &Address) -> bool {
        self.controller == *address
    }

    pub fn is_minter(&self, address: &Address) -> bool {
        self.minters.contains(address)
    }

    pub fn minters(&self) -> impl Iterator<Item = &Address> {
        self.minters.iter()
    }

    pub fn minter_count(&self) -> usize {
        self.minters.len()
    }

    /// All roles held by an address
    pub fn roles_of(&self, address: &Address) -> Role {
        let mut role = Role::empty();
        if self.is_controller(address) {
            role |= Role::CONTROLLER;
        }
        if self.is_minter(address) {
            role |= Role::MINTER;
        }
        role
    }

    /// Returns false when the address already was a minter
    pub(crate) fn insert_minter(&mut self, address: Address) -> bool {
        self.minters.insert(address)
    }

    /// Returns false when the address was not a minter
    pub(crate) fn remove_minter(&mut self, address: &Address) -> bool {
        self.minters.remove(address)
    }

    pub(crate) fn set_controller(&mut self, address: Address) {
        self.controller = address;
    }
}
