//! Flat-file user store
//!
//! Maps usernames to the child wallet created for them. The whole store is
//! one JSON file rewritten on every change.

use crate::core::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum username length
pub const MAX_USERNAME_LEN: usize = 32;

/// User store errors
#[derive(Error, Debug)]
pub enum UserStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("User already exists: {0}")]
    AlreadyExists(String),
    #[error("User not found: {0}")]
    NotFound(String),
    #[error("Invalid username: must be 1-32 characters of [A-Za-z0-9_-]")]
    InvalidUsername,
}

/// A registered user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub address: Address,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserFile {
    users: Vec<UserRecord>,
}

/// JSON-file backed user database
pub struct UserStore {
    path: PathBuf,
    users: Vec<UserRecord>,
}

/// Check a username against the allowed alphabet and length
pub fn validate_username(username: &str) -> Result<(), UserStoreError> {
    let valid = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(UserStoreError::InvalidUsername)
    }
}

impl UserStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open(path: &Path) -> Result<Self, UserStoreError> {
        let users = if path.exists() {
            let json = fs::read_to_string(path)?;
            let file: UserFile = serde_json::from_str(&json)?;
            file.users
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            users,
        })
    }

    /// Write the store back to disk
    pub fn save(&self) -> Result<(), UserStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = UserFile {
            users: self.users.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Register a user and persist the store
    pub fn create(&mut self, username: &str, address: Address) -> Result<UserRecord, UserStoreError> {
        validate_username(username)?;
        if self.get(username).is_some() {
            return Err(UserStoreError::AlreadyExists(username.to_string()));
        }

        let record = UserRecord {
            username: username.to_string(),
            address,
            created_at: Utc::now(),
        };
        self.users.push(record.clone());
        if let Err(e) = self.save() {
            self.users.pop();
            return Err(e);
        }

        log::info!("User {} registered with wallet {}", username, address);
        Ok(record)
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn require(&self, username: &str) -> Result<&UserRecord, UserStoreError> {
        self.get(username)
            .ok_or_else(|| UserStoreError::NotFound(username.to_string()))
    }

    pub fn list(&self) -> &[UserRecord] {
        &self.users
    }

    /// Wallet addresses of every user, in registration order
    pub fn addresses(&self) -> Vec<Address> {
        self.users.iter().map(|u| u.address).collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
