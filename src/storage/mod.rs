// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! File-backed persistence for user records and avatar images.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   users/
//!     {user_id}.json          # UserRecord (includes the password hash)
//!   avatars/
//!     {user_id}/
//!       {uuid}.{ext}          # Uploaded avatar images
//! ```
//!
//! ## Important Notes
//!
//! - All writes are atomic (temp file + rename)
//! - User IDs are checked with [`paths::is_safe_component`] before they
//!   become path components
//! - [`InMemoryUserStore`] implements the same port for tests and
//!   development setups without a data directory

use std::io;

pub mod avatars;
pub mod file_storage;
pub mod paths;
pub mod users;

pub use avatars::FileAvatarStore;
pub use file_storage::FileStorage;
pub use paths::StoragePaths;
pub use users::{FileUserStore, InMemoryUserStore};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Storage not initialized
    #[error("Storage not initialized")]
    NotInitialized,

    /// Backend cannot serve requests right now
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err: StorageError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StorageError::NotFound(_)));

        let err: StorageError = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
