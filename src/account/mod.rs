// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Service
//!
//! Identity-scoped account operations. Every operation takes the
//! [`AuthenticatedUser`] established by the session gate and acts on that
//! user's own record; nothing here accepts a target user ID from a request.
//!
//! ## Atomicity
//!
//! Record changes go through [`UserStore::update`], which applies a closure to
//! the record as it is at commit time and writes only if the closure
//! succeeds. Validation runs before any collaborator is called, so a
//! rejected operation leaves the stored record exactly as it was.
//!
//! ## Collaborators
//!
//! | Port | Used by |
//! |------|---------|
//! | [`UserStore`] | every operation |
//! | [`AvatarStore`] | avatar upload, account deletion |
//! | [`VerificationMailer`] | resend verification |
//! | [`RevocationList`] | logout, account deletion |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, RevocationList, SessionClaims};
use crate::models::UserView;
use crate::storage::{StorageError, StorageResult};

pub mod error;
pub mod mailer;
pub mod password;
pub mod store;
pub mod validation;
pub mod verification;

pub use error::{AccountError, ValidationError};
pub use mailer::{LogMailer, MailError, VerificationEmail, VerificationMailer, WebhookMailer};
pub use store::{AvatarStore, RecordUpdate, UserRecord, UserStore};
pub use verification::{VerificationLinks, VerifiedEmail};

use validation::{normalize_name, validate_avatar, validate_new_password};

/// Password change request.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Avatar upload as received from the client.
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    /// Declared MIME type, if the client sent one
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Account operations over the configured collaborators.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    avatars: Arc<dyn AvatarStore>,
    mailer: Arc<dyn VerificationMailer>,
    links: VerificationLinks,
    revocations: Arc<RevocationList>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        avatars: Arc<dyn AvatarStore>,
        mailer: Arc<dyn VerificationMailer>,
        links: VerificationLinks,
        revocations: Arc<RevocationList>,
    ) -> Self {
        Self {
            users,
            avatars,
            mailer,
            links,
            revocations,
        }
    }

    /// Current view of the caller's record.
    pub fn read_profile(&self, user: &AuthenticatedUser) -> Result<UserView, AccountError> {
        self.users
            .get(&user.user_id)
            .map(|record| record.view())
            .map_err(|e| AccountError::from(e).missing_as_unauthenticated())
    }

    /// Change the display name.
    pub fn update_profile(&self, user: &AuthenticatedUser, name: &str) -> Result<UserView, AccountError> {
        let name = normalize_name(name)?;

        let record = self
            .users
            .update(&user.user_id, &mut |record| {
                record.name.clone_from(&name);
                Ok(())
            })
            .map_err(|e| self.failed("update_profile", user, e))?;

        tracing::info!(user_id = %user.user_id, "profile updated");
        Ok(record.view())
    }

    /// Replace the password after checking the current one.
    ///
    /// The current-password check runs inside the store update, against the
    /// credential that is about to be replaced.
    pub fn update_password(&self, user: &AuthenticatedUser, change: &PasswordChange) -> Result<(), AccountError> {
        validate_new_password(&change.new_password, &change.confirm_password)?;
        let new_hash = password::hash_password(&change.new_password)?;

        self.users
            .update(&user.user_id, &mut |record| {
                if !password::verify_password(&change.current_password, &record.password_hash) {
                    return Err(AccountError::IncorrectCurrentPassword);
                }
                record.password_hash.clone_from(&new_hash);
                Ok(())
            })
            .map_err(|e| self.failed("update_password", user, e))?;

        tracing::info!(user_id = %user.user_id, "password changed");
        Ok(())
    }

    /// Store a new avatar and point the record at it. Returns the new URL.
    ///
    /// If the record update fails the new image is removed again and the
    /// previous `avatar_url` stays in place. After a successful update the
    /// previous image is removed best-effort.
    pub fn upload_avatar(&self, user: &AuthenticatedUser, upload: &AvatarUpload) -> Result<String, AccountError> {
        validate_avatar(upload.content_type.as_deref(), upload.bytes.len())?;
        let content_type = upload.content_type.as_deref().unwrap_or_default().trim();

        // No files for sessions without an account
        self.users
            .get(&user.user_id)
            .map_err(|e| self.failed("upload_avatar", user, e.into()))?;

        let url = self
            .avatars
            .put(&user.user_id, content_type, &upload.bytes)
            .map_err(|e| self.failed("upload_avatar", user, AccountError::AvatarStorage(e)))?;

        let mut previous = None;
        let committed = self.users.update(&user.user_id, &mut |record| {
            previous = record.avatar_url.replace(url.clone());
            Ok(())
        });

        if let Err(e) = committed {
            self.discard_avatar(&url, user);
            return Err(self.failed("upload_avatar", user, e));
        }

        if let Some(old) = previous.filter(|old| *old != url) {
            self.discard_avatar(&old, user);
        }

        tracing::info!(user_id = %user.user_id, bytes = upload.bytes.len(), "avatar updated");
        Ok(url)
    }

    /// Send a fresh verification link. Does not change the record.
    pub async fn resend_verification(&self, user: &AuthenticatedUser, now: DateTime<Utc>) -> Result<(), AccountError> {
        let record = self
            .users
            .get(&user.user_id)
            .map_err(|e| self.failed("resend_verification", user, e.into()))?;

        if record.email_verified {
            return Err(AccountError::AlreadyVerified);
        }

        let link = self
            .links
            .link(&record.id, &record.email, now)
            .map_err(|e| self.failed("resend_verification", user, MailError::from(e).into()))?;

        let email = VerificationEmail {
            to: record.email,
            name: record.name,
            link: link.into(),
        };
        self.mailer
            .send(&email)
            .await
            .map_err(|e| self.failed("resend_verification", user, e.into()))?;

        tracing::info!(user_id = %user.user_id, "verification email sent");
        Ok(())
    }

    /// Mark an email verified from a signed link token.
    ///
    /// The link must still match the stored email. Verifying twice is a no-op.
    pub fn confirm_email(&self, token: &str, now: DateTime<Utc>) -> Result<UserView, AccountError> {
        let verified = self.links.verify(token, now)?;

        let record = self
            .users
            .update(&verified.user_id, &mut |record| {
                if !record.email.eq_ignore_ascii_case(&verified.email) {
                    return Err(ValidationError::InvalidVerificationLink.into());
                }
                record.email_verified = true;
                Ok(())
            })
            .map_err(|e| match e {
                AccountError::Store(StorageError::NotFound(_)) => {
                    ValidationError::InvalidVerificationLink.into()
                }
                other => other,
            })?;

        tracing::info!(user_id = %record.id, "email verified");
        Ok(record.view())
    }

    /// Delete the caller's record and avatar files, then revoke every
    /// session issued up to `now` or the deleting session's own `iat`,
    /// whichever is later.
    ///
    /// If the record cannot be deleted nothing else happens and the session
    /// stays valid.
    pub fn delete_account(
        &self,
        user: &AuthenticatedUser,
        confirmed: bool,
        now: DateTime<Utc>,
    ) -> Result<(), AccountError> {
        if !confirmed {
            return Err(ValidationError::DeletionNotConfirmed.into());
        }

        self.users
            .delete(&user.user_id)
            .map_err(|e| self.failed("delete_account", user, e.into()))?;

        let cutoff = now.max(user.issued_at);
        self.revocations.revoke_subject(&user.user_id, cutoff);

        if let Err(e) = self.avatars.remove_all(&user.user_id) {
            tracing::warn!(user_id = %user.user_id, error = %e, "avatar cleanup after account deletion failed");
        }

        tracing::info!(user_id = %user.user_id, "account deleted");
        Ok(())
    }

    /// End a session. Never fails; without a session there is nothing to do.
    pub fn logout(&self, session: Option<&SessionClaims>, now: DateTime<Utc>) {
        match session {
            Some(claims) => {
                self.revocations.revoke_session(claims, now);
                tracing::info!(user_id = %claims.sub, "logged out");
            }
            None => tracing::debug!("logout without a session"),
        }
    }

    /// Create a user unless one with `email` already exists.
    ///
    /// Returns the new user's view, or `None` when the email is taken.
    pub fn ensure_user(
        &self,
        name: &str,
        email: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserView>, AccountError> {
        let name = normalize_name(name)?;
        validate_new_password(secret, secret)?;

        if self.users.find_by_email(email)?.is_some() {
            return Ok(None);
        }

        let record = UserRecord {
            id: Uuid::new_v4().simple().to_string(),
            name,
            email: email.trim().to_string(),
            email_verified: false,
            avatar_url: None,
            password_hash: password::hash_password(secret)?,
            created_at: now,
            last_login_at: None,
        };
        self.users.insert(&record)?;

        tracing::info!(user_id = %record.id, "user created");
        Ok(Some(record.view()))
    }

    /// Readiness probe for the user store.
    pub fn health_check(&self) -> StorageResult<()> {
        self.users.health_check()
    }

    fn discard_avatar(&self, url: &str, user: &AuthenticatedUser) {
        if let Err(e) = self.avatars.remove(url) {
            tracing::warn!(user_id = %user.user_id, error = %e, "avatar cleanup failed");
        }
    }

    fn failed(&self, operation: &'static str, user: &AuthenticatedUser, error: AccountError) -> AccountError {
        let error = error.missing_as_unauthenticated();
        if error.is_collaborator_failure() {
            tracing::error!(user_id = %user.user_id, operation, error = %error, "account operation failed");
        } else {
            tracing::debug!(user_id = %user.user_id, operation, error = %error, "account operation rejected");
        }
        error
    }
}
