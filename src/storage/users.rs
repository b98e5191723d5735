// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User record stores.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::paths::is_safe_component;
use super::{FileStorage, StorageError, StorageResult};
use crate::account::{AccountError, RecordUpdate, UserRecord, UserStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn not_found(user_id: &str) -> StorageError {
    StorageError::NotFound(format!("user {user_id}"))
}

/// One JSON file per user under `users/`.
///
/// Writes are serialized through a single lock, which is what makes
/// [`UserStore::update`] a true read-modify-write.
#[derive(Debug)]
pub struct FileUserStore {
    storage: FileStorage,
    write_lock: Mutex<()>,
}

impl FileUserStore {
    pub fn new(storage: FileStorage) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    fn read(&self, user_id: &str) -> StorageResult<UserRecord> {
        if !is_safe_component(user_id) {
            return Err(not_found(user_id));
        }
        self.storage
            .read_json(self.storage.paths().user(user_id))
            .map_err(|e| match e {
                StorageError::NotFound(_) => not_found(user_id),
                other => other,
            })
    }
}

impl UserStore for FileUserStore {
    fn get(&self, user_id: &str) -> StorageResult<UserRecord> {
        self.read(user_id)
    }

    fn insert(&self, record: &UserRecord) -> StorageResult<()> {
        if !is_safe_component(&record.id) {
            return Err(StorageError::Unavailable(format!(
                "user ID {:?} cannot be stored",
                record.id
            )));
        }

        let _guard = lock(&self.write_lock);
        let path = self.storage.paths().user(&record.id);
        if self.storage.exists(&path) {
            return Err(StorageError::AlreadyExists(format!("user {}", record.id)));
        }
        self.storage.write_json(path, record)
    }

    fn update(&self, user_id: &str, apply: RecordUpdate<'_>) -> Result<UserRecord, AccountError> {
        let _guard = lock(&self.write_lock);

        let current = self.read(user_id)?;
        let mut working = current.clone();
        apply(&mut working)?;

        if working != current {
            self.storage
                .write_json(self.storage.paths().user(user_id), &working)?;
        }
        Ok(working)
    }

    fn delete(&self, user_id: &str) -> StorageResult<()> {
        if !is_safe_component(user_id) {
            return Err(not_found(user_id));
        }

        let _guard = lock(&self.write_lock);
        self.storage
            .delete(self.storage.paths().user(user_id))
            .map_err(|e| match e {
                StorageError::NotFound(_) => not_found(user_id),
                other => other,
            })
    }

    fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().users_dir(), "json")?;

        for id in ids {
            // Skip records deleted between listing and reading
            let record = match self.read(&id) {
                Ok(record) => record,
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if record.email.eq_ignore_ascii_case(email) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn health_check(&self) -> StorageResult<()> {
        self.storage.health_check()
    }
}

/// Map-backed store for tests and runs without a data directory.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn get(&self, user_id: &str) -> StorageResult<UserRecord> {
        lock(&self.users)
            .get(user_id)
            .cloned()
            .ok_or_else(|| not_found(user_id))
    }

    fn insert(&self, record: &UserRecord) -> StorageResult<()> {
        let mut users = lock(&self.users);
        if users.contains_key(&record.id) {
            return Err(StorageError::AlreadyExists(format!("user {}", record.id)));
        }
        users.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn update(&self, user_id: &str, apply: RecordUpdate<'_>) -> Result<UserRecord, AccountError> {
        let mut users = lock(&self.users);
        let current = users.get(user_id).ok_or_else(|| not_found(user_id))?;

        let mut working = current.clone();
        apply(&mut working)?;
        users.insert(user_id.to_string(), working.clone());
        Ok(working)
    }

    fn delete(&self, user_id: &str) -> StorageResult<()> {
        lock(&self.users)
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| not_found(user_id))
    }

    fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        Ok(lock(&self.users)
            .values()
            .find(|record| record.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}
