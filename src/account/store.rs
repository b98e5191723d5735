// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistence ports used by the account service.
//!
//! The service only ever talks to these traits. File-backed and in-memory
//! implementations live in [`crate::storage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountError;
use crate::models::UserView;
use crate::storage::StorageResult;

/// Stored user record.
///
/// `password_hash` never leaves the service; callers get a [`UserView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Public representation of this record.
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            avatar_url: self.avatar_url.clone(),
            created_at: self.created_at,
            last_login_at: self.last_login_at,
        }
    }
}

/// Mutation applied to a record under the store's write lock.
///
/// Returning an error aborts the update and nothing is written.
pub type RecordUpdate<'a> = &'a mut (dyn FnMut(&mut UserRecord) -> Result<(), AccountError> + Send);

/// User record persistence.
///
/// Implementations serialize `update` calls for the same user so the closure
/// always sees the state that is about to be committed.
pub trait UserStore: Send + Sync {
    /// Load a record. A missing record is `StorageError::NotFound`.
    fn get(&self, user_id: &str) -> StorageResult<UserRecord>;

    /// Insert a new record. Fails with `AlreadyExists` if the ID is taken.
    fn insert(&self, record: &UserRecord) -> StorageResult<()>;

    /// Read-modify-write one record atomically and return the committed state.
    fn update(&self, user_id: &str, apply: RecordUpdate<'_>) -> Result<UserRecord, AccountError>;

    /// Remove a record.
    fn delete(&self, user_id: &str) -> StorageResult<()>;

    /// Look up a record by email (case-insensitive).
    fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>>;

    /// Probe used by the readiness endpoint.
    fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Avatar image persistence.
pub trait AvatarStore: Send + Sync {
    /// Store an image for `user_id` and return its public URL.
    fn put(&self, user_id: &str, content_type: &str, bytes: &[u8]) -> StorageResult<String>;

    /// Remove a previously stored image by URL. Unknown URLs are ignored.
    fn remove(&self, url: &str) -> StorageResult<()>;

    /// Remove every image belonging to `user_id`.
    fn remove_all(&self, user_id: &str) -> StorageResult<()>;
}
