//! Chain state persistence
//!
//! Saves and loads the [`ChainState`] as pretty JSON with rotating backups.

use crate::core::ChainState;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".treasury_data"),
            state_file: "chain.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Chain state storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Get the data directory
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the chain state file path
    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    /// Get a backup file path
    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, index))
    }

    /// Save the chain state to disk
    pub fn save(&self, state: &ChainState) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self.config.data_dir.join("chain.tmp");
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, state)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::debug!("Chain state saved to {:?}", path);
        Ok(())
    }

    /// Load the chain state from disk
    pub fn load(&self) -> Result<ChainState, StorageError> {
        let path = self.state_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Chain state file not found".to_string(),
            ));
        }

        load_from_file(&path)
    }

    /// Load the saved state, or start a fresh one
    pub fn load_or_default(&self) -> Result<ChainState, StorageError> {
        if self.exists() {
            self.load()
        } else {
            Ok(ChainState::new())
        }
    }

    /// Check if a saved chain state exists
    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<ChainState, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        load_from_file(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

/// Save chain state to a specific file path
pub fn save_to_file(state: &ChainState, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, state)?;
    Ok(())
}

/// Load chain state from a specific file path
pub fn load_from_file(path: &Path) -> Result<ChainState, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Address;

    fn storage_in(dir: &Path, max_backups: usize) -> Storage {
        Storage::new(StorageConfig {
            data_dir: dir.to_path_buf(),
            max_backups,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_save_load_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 5);

        let operator = Address::from_bytes([1; 20]);
        let mut state = ChainState::new();
        state.allocate(&operator, 1_000).unwrap();
        let contract = state.deploy(&operator, "Badges", "BDG").unwrap();
        state.deposit(None, &operator, 400).unwrap();

        storage.save(&state).unwrap();
        assert!(storage.exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.balance_of(&operator), 600);
        assert_eq!(loaded.contracts.latest().unwrap(), contract);
        assert_eq!(
            loaded.contracts.get(&contract).unwrap().treasury.balance(),
            400
        );
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 5);

        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
        let fresh = storage.load_or_default().unwrap();
        assert_eq!(fresh.contracts.count(), 0);
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage_in(temp_dir.path(), 3);
        let mut state = ChainState::new();

        for i in 0..5u8 {
            state.allocate(&Address::from_bytes([i + 1; 20]), 1).unwrap();
            storage.save(&state).unwrap();
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);

        // Backup 0 is the state before the last save.
        let restored = storage.restore_backup(0).unwrap();
        assert_eq!(restored.stats().funded_accounts, 4);
        assert!(storage.restore_backup(7).is_err());
    }

    #[test]
    fn test_export_import_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("export.json");

        let mut state = ChainState::new();
        state.allocate(&Address::from_bytes([9; 20]), 99).unwrap();
        save_to_file(&state, &path).unwrap();

        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded.balance_of(&Address::from_bytes([9; 20])), 99);
    }
}
