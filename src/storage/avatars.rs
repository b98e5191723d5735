// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Avatar image store.
//!
//! Files live at `avatars/{user_id}/{uuid}.{ext}` and are published as
//! `{base_url}/{user_id}/{uuid}.{ext}`. Serving them is left to whatever
//! hosts `base_url`.

use uuid::Uuid;

use super::paths::is_safe_component;
use super::{FileStorage, StorageError, StorageResult};
use crate::account::AvatarStore;

/// File extension for an image MIME type (`image/svg+xml` -> `svg`).
fn extension_for(content_type: &str) -> String {
    let subtype = content_type
        .split(';')
        .next()
        .and_then(|mime| mime.trim().split_once('/'))
        .map(|(_, subtype)| subtype)
        .unwrap_or_default();
    let subtype = subtype.split('+').next().unwrap_or_default().to_ascii_lowercase();

    match subtype.as_str() {
        "jpeg" | "pjpeg" => "jpg".to_string(),
        other if !other.is_empty() && other.bytes().all(|b| b.is_ascii_alphanumeric()) => {
            other.to_string()
        }
        _ => "img".to_string(),
    }
}

fn is_safe_file_name(name: &str) -> bool {
    match name.split_once('.') {
        Some((stem, ext)) => is_safe_component(stem) && is_safe_component(ext),
        None => false,
    }
}

/// Avatar store on the local filesystem.
#[derive(Debug)]
pub struct FileAvatarStore {
    storage: FileStorage,
    base_url: String,
}

impl FileAvatarStore {
    /// Create a store publishing files under `base_url`.
    pub fn new(storage: FileStorage, base_url: impl Into<String>) -> Self {
        Self {
            storage,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Split a published URL back into `(user_id, file_name)`.
    fn locate<'a>(&self, url: &'a str) -> Option<(&'a str, &'a str)> {
        let rest = url.strip_prefix(&self.base_url)?.strip_prefix('/')?;
        let (user_id, file_name) = rest.split_once('/')?;
        (is_safe_component(user_id) && is_safe_file_name(file_name)).then_some((user_id, file_name))
    }
}

impl AvatarStore for FileAvatarStore {
    fn put(&self, user_id: &str, content_type: &str, bytes: &[u8]) -> StorageResult<String> {
        if !is_safe_component(user_id) {
            return Err(StorageError::Unavailable(format!(
                "user ID {user_id:?} cannot own files"
            )));
        }

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension_for(content_type));
        self.storage
            .write_raw(self.storage.paths().avatar(user_id, &file_name), bytes)?;

        Ok(format!("{}/{user_id}/{file_name}", self.base_url))
    }

    fn remove(&self, url: &str) -> StorageResult<()> {
        let Some((user_id, file_name)) = self.locate(url) else {
            tracing::debug!(url, "not a stored avatar URL, nothing to remove");
            return Ok(());
        };

        match self.storage.delete(self.storage.paths().avatar(user_id, file_name)) {
            Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn remove_all(&self, user_id: &str) -> StorageResult<()> {
        if !is_safe_component(user_id) {
            return Ok(());
        }
        self.storage
            .delete_dir(self.storage.paths().user_avatars_dir(user_id))
    }
}
