// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit and router tests.
//!
//! [`test_state`] wires a real gate and account service over in-memory
//! collaborators that can be told to fail, so collaborator-failure paths can
//! be exercised without touching the filesystem or network.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use url::Url;

use crate::account::{
    password, AccountError, AccountService, AvatarStore, MailError, RecordUpdate, UserRecord,
    UserStore, VerificationEmail, VerificationLinks, VerificationMailer,
};
use crate::auth::{
    AuthenticatedUser, GateConfig, RevocationList, SessionGate, TokenIssuer, TokenVerifier,
};
use crate::state::AppState;
use crate::storage::{InMemoryUserStore, StorageError, StorageResult};

pub const TEST_SECRET: &[u8] = b"test-session-secret-0123456789abcdef";

/// Password of every user created by [`TestContext::seed_user`].
pub const TEST_PASSWORD: &str = "correct horse battery";

fn test_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| password::hash_password(TEST_PASSWORD).unwrap())
}

fn injected() -> StorageError {
    StorageError::Unavailable("injected failure".to_string())
}

/// In-memory user store whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyUserStore {
    inner: InMemoryUserStore,
    fail_writes: AtomicBool,
}

impl FlakyUserStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.fail_writes.load(Ordering::SeqCst)
    }
}

impl UserStore for FlakyUserStore {
    fn get(&self, user_id: &str) -> StorageResult<UserRecord> {
        self.inner.get(user_id)
    }

    fn insert(&self, record: &UserRecord) -> StorageResult<()> {
        if self.failing() {
            return Err(injected());
        }
        self.inner.insert(record)
    }

    fn update(&self, user_id: &str, apply: RecordUpdate<'_>) -> Result<UserRecord, AccountError> {
        if self.failing() {
            // Run the mutation so its checks happen, then fail the commit.
            let mut working = self.inner.get(user_id)?;
            apply(&mut working)?;
            return Err(injected().into());
        }
        self.inner.update(user_id, apply)
    }

    fn delete(&self, user_id: &str) -> StorageResult<()> {
        if self.failing() {
            return Err(injected());
        }
        self.inner.delete(user_id)
    }

    fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        self.inner.find_by_email(email)
    }
}

/// Avatar store that only remembers URLs.
#[derive(Default)]
pub struct MemoryAvatarStore {
    urls: Mutex<BTreeSet<String>>,
    fail_puts: AtomicBool,
}

impl MemoryAvatarStore {
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Currently stored URLs, sorted.
    pub fn stored(&self) -> Vec<String> {
        self.urls.lock().unwrap().iter().cloned().collect()
    }
}

impl AvatarStore for MemoryAvatarStore {
    fn put(&self, user_id: &str, _content_type: &str, _bytes: &[u8]) -> StorageResult<String> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let url = format!("/avatars/{user_id}/{}", uuid::Uuid::new_v4().simple());
        self.urls.lock().unwrap().insert(url.clone());
        Ok(url)
    }

    fn remove(&self, url: &str) -> StorageResult<()> {
        self.urls.lock().unwrap().remove(url);
        Ok(())
    }

    fn remove_all(&self, user_id: &str) -> StorageResult<()> {
        let prefix = format!("/avatars/{user_id}/");
        self.urls.lock().unwrap().retain(|url| !url.starts_with(&prefix));
        Ok(())
    }
}

/// Mailer that records messages and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<VerificationEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<VerificationEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationMailer for RecordingMailer {
    async fn send(&self, email: &VerificationEmail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected(503));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// App state plus handles on its collaborators.
pub struct TestContext {
    pub state: AppState,
    pub issuer: TokenIssuer,
    pub users: Arc<FlakyUserStore>,
    pub avatars: Arc<MemoryAvatarStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestContext {
    /// Fresh session token for `user_id`.
    pub fn token_for(&self, user_id: &str) -> String {
        self.session_for(user_id).0
    }

    /// Fresh session token and the identity the gate derives from it.
    pub fn session_for(&self, user_id: &str) -> (String, AuthenticatedUser) {
        let (token, claims) = self.issuer.issue(user_id, Utc::now()).unwrap();
        (token, AuthenticatedUser::from_claims(claims))
    }

    /// Insert an unverified user `{user_id}@example.test` with [`TEST_PASSWORD`].
    pub fn seed_user(&self, user_id: &str) -> UserRecord {
        let record = UserRecord {
            id: user_id.to_string(),
            name: "Test User".to_string(),
            email: format!("{user_id}@example.test"),
            email_verified: false,
            avatar_url: None,
            password_hash: test_password_hash().to_string(),
            created_at: Utc::now(),
            last_login_at: None,
        };
        self.users.insert(&record).unwrap();
        record
    }
}

pub fn test_state() -> TestContext {
    let revocations = Arc::new(RevocationList::new(Duration::hours(1)));
    let users = Arc::new(FlakyUserStore::default());
    let avatars = Arc::new(MemoryAvatarStore::default());
    let mailer = Arc::new(RecordingMailer::default());

    let gate = SessionGate::new(
        GateConfig::default(),
        TokenVerifier::new(TEST_SECRET).with_max_lifetime(Duration::hours(1)),
        revocations.clone(),
    );
    let links = VerificationLinks::new(
        TEST_SECRET,
        Url::parse("https://app.example.test").unwrap(),
        Duration::hours(24),
    )
    .unwrap();
    let accounts = AccountService::new(
        users.clone(),
        avatars.clone(),
        mailer.clone(),
        links,
        revocations,
    );

    TestContext {
        state: AppState::new(gate, accounts).with_cookie_secure(false),
        issuer: TokenIssuer::new(TEST_SECRET, Duration::hours(1)),
        users,
        avatars,
        mailer,
    }
}
