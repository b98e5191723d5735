// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the on-disk storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for persistent storage.
pub const DATA_ROOT: &str = "./data";

/// Whether `id` is safe to use as a single path component.
///
/// IDs come from signed tokens, but they still never reach the filesystem
/// unless they are plain `[A-Za-z0-9_-]` strings.
pub fn is_safe_component(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== User Paths ==========

    /// Directory containing all user records.
    pub fn users_dir(&self) -> PathBuf {
        self.root.join("users")
    }

    /// Path to a specific user record.
    pub fn user(&self, user_id: &str) -> PathBuf {
        self.users_dir().join(format!("{user_id}.json"))
    }

    // ========== Avatar Paths ==========

    /// Directory containing all avatar images.
    pub fn avatars_dir(&self) -> PathBuf {
        self.root.join("avatars")
    }

    /// Directory holding one user's avatar images.
    pub fn user_avatars_dir(&self, user_id: &str) -> PathBuf {
        self.avatars_dir().join(user_id)
    }

    /// Path to a stored avatar image.
    pub fn avatar(&self, user_id: &str, file_name: &str) -> PathBuf {
        self.user_avatars_dir(user_id).join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_data_root() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("./data"));
    }

    #[test]
    fn user_and_avatar_layout() {
        let paths = StoragePaths::new("/srv/gate");
        assert_eq!(paths.user("u-1"), PathBuf::from("/srv/gate/users/u-1.json"));
        assert_eq!(
            paths.avatar("u-1", "a.png"),
            PathBuf::from("/srv/gate/avatars/u-1/a.png")
        );
    }

    #[test]
    fn unsafe_components_are_rejected() {
        assert!(is_safe_component("0b7d9a3e-1c2f-4d5e-8f90-123456789abc"));
        assert!(is_safe_component("user_123"));
        assert!(!is_safe_component(""));
        assert!(!is_safe_component(".."));
        assert!(!is_safe_component("a/b"));
        assert!(!is_safe_component("a\\b"));
        assert!(!is_safe_component(&"x".repeat(129)));
    }
}
