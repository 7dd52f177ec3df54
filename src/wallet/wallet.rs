//! Local wallets
//!
//! Key pairs stored one JSON file per address. A wallet may name a parent
//! wallet, which is how the operator's child wallets are tracked.

use crate::core::{Address, AddressError};
use crate::crypto::{KeyError, KeyPair};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
    #[error("Address error: {0}")]
    AddressError(#[from] AddressError),
    #[error("Wallet not found: {0}")]
    NotFound(String),
}

/// Serializable wallet data for persistence
#[derive(Debug, Serialize, Deserialize)]
struct WalletData {
    private_key_hex: String,
    address: Address,
    label: Option<String>,
    #[serde(default)]
    parent: Option<Address>,
}

/// A local key wallet
pub struct Wallet {
    key_pair: KeyPair,
    pub label: Option<String>,
    /// Wallet this one was created for, if it is a child wallet
    pub parent: Option<Address>,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn new() -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: None,
            parent: None,
        }
    }

    /// Create a wallet with a label
    pub fn with_label(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::new()
        }
    }

    /// Create a child wallet of `parent`
    pub fn child_of(parent: &Address, label: Option<&str>) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: label.map(str::to_string),
            parent: Some(*parent),
        }
    }

    /// Import a wallet from a private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        let key_pair = KeyPair::from_private_key_hex(private_key_hex)?;
        Ok(Self {
            key_pair,
            label: None,
            parent: None,
        })
    }

    pub fn address(&self) -> Address {
        self.key_pair.address()
    }

    /// Get the wallet's public key (hex)
    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// Get the wallet's private key (hex)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        let data = WalletData {
            private_key_hex: self.private_key(),
            address: self.address(),
            label: self.label.clone(),
            parent: self.parent,
        };

        let json = serde_json::to_string_pretty(&data)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let json = fs::read_to_string(path)?;
        let data: WalletData = serde_json::from_str(&json)?;

        let mut wallet = Self::from_private_key(&data.private_key_hex)?;
        wallet.label = data.label;
        wallet.parent = data.parent;
        Ok(wallet)
    }

    /// Export wallet info (without private key)
    pub fn export_public_info(&self) -> WalletInfo {
        WalletInfo {
            address: self.address(),
            public_key: self.public_key(),
            label: self.label.clone(),
            parent: self.parent,
        }
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Public wallet information (safe to share)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub address: Address,
    pub public_key: String,
    pub label: Option<String>,
    pub parent: Option<Address>,
}

/// Wallet manager for handling multiple wallets
pub struct WalletManager {
    wallets_dir: PathBuf,
}

impl WalletManager {
    pub fn new(wallets_dir: &Path) -> Result<Self, WalletError> {
        fs::create_dir_all(wallets_dir)?;
        Ok(Self {
            wallets_dir: wallets_dir.to_path_buf(),
        })
    }

    fn path_for(&self, address: &Address) -> PathBuf {
        self.wallets_dir.join(format!("{}.json", address))
    }

    fn store(&self, wallet: Wallet) -> Result<Wallet, WalletError> {
        wallet.save(&self.path_for(&wallet.address()))?;
        Ok(wallet)
    }

    /// Create and save a new wallet
    pub fn create_wallet(&self, label: Option<&str>) -> Result<Wallet, WalletError> {
        let wallet = match label {
            Some(l) => Wallet::with_label(l),
            None => Wallet::new(),
        };
        self.store(wallet)
    }

    /// Create and save one child wallet of `parent`
    pub fn create_child(&self, parent: &Address, label: Option<&str>) -> Result<Wallet, WalletError> {
        let wallet = self.store(Wallet::child_of(parent, label))?;
        log::info!("Child wallet {} created for {}", wallet.address(), parent.short());
        Ok(wallet)
    }

    /// Create `count` child wallets labelled `{prefix}-{n}`, numbering on
    /// from the children that already exist
    pub fn create_children(
        &self,
        parent: &Address,
        count: usize,
        prefix: &str,
    ) -> Result<Vec<Wallet>, WalletError> {
        let existing = self.children_of(parent)?.len();
        (0..count)
            .map(|i| {
                let label = format!("{}-{}", prefix, existing + i + 1);
                self.create_child(parent, Some(&label))
            })
            .collect()
    }

    /// All wallets in the directory
    pub fn list(&self) -> Result<Vec<Wallet>, WalletError> {
        let mut wallets = Vec::new();

        for entry in fs::read_dir(&self.wallets_dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match Wallet::load(&path) {
                    Ok(wallet) => wallets.push(wallet),
                    Err(e) => log::warn!("Skipping unreadable wallet {:?}: {}", path, e),
                }
            }
        }

        wallets.sort_by(|a, b| a.label.cmp(&b.label).then(a.address().cmp(&b.address())));
        Ok(wallets)
    }

    /// List all wallet addresses
    pub fn list_wallets(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.list()?.iter().map(Wallet::address).collect())
    }

    /// Child wallets of `parent`
    pub fn children_of(&self, parent: &Address) -> Result<Vec<Wallet>, WalletError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|w| w.parent.as_ref() == Some(parent))
            .collect())
    }

    /// First wallet carrying `label`
    pub fn find_by_label(&self, label: &str) -> Result<Option<Wallet>, WalletError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|w| w.label.as_deref() == Some(label)))
    }

    /// Load a specific wallet by address
    pub fn load_wallet(&self, address: &Address) -> Result<Wallet, WalletError> {
        let path = self.path_for(address);
        if !path.exists() {
            return Err(WalletError::NotFound(address.to_string()));
        }
        Wallet::load(&path)
    }

    pub fn delete_wallet(&self, address: &Address) -> Result<(), WalletError> {
        fs::remove_file(self.path_for(address))?;
        Ok(())
    }
}
