//! Storage module for chain state and user persistence

pub mod persistence;
pub mod users;

pub use persistence::{load_from_file, save_to_file, Storage, StorageConfig, StorageError};
pub use users::{validate_username, UserRecord, UserStore, UserStoreError, MAX_USERNAME_LEN};
