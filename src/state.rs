// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::account::{
    AccountService, LogMailer, MailError, VerificationLinks, VerificationMailer, WebhookMailer,
};
use crate::auth::{RevocationList, SessionGate, TokenVerifier};
use crate::config::AppConfig;
use crate::storage::{FileAvatarStore, FileStorage, FileUserStore, StorageError, StoragePaths};

/// Failure while assembling the application from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error("mailer setup failed: {0}")]
    Mailer(#[from] MailError),

    #[error("verification key rejected: {0}")]
    VerificationKey(String),
}

#[derive(Clone)]
pub struct AppState {
    /// Session gate shared by the middleware and the extractors
    pub gate: Arc<SessionGate>,
    pub accounts: Arc<AccountService>,
    /// Whether cookies emitted by handlers carry `Secure`
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(gate: SessionGate, accounts: AccountService) -> Self {
        Self {
            gate: Arc::new(gate),
            accounts: Arc::new(accounts),
            cookie_secure: true,
        }
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Build the production state: file stores under `DATA_DIR`, the
    /// webhook mailer when configured, one revocation list shared by the gate
    /// and the account service.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let secret = config.session_secret.expose();
        let revocations = Arc::new(RevocationList::new(config.session_ttl));

        let gate = SessionGate::new(
            config.gate_config(),
            TokenVerifier::new(secret).with_max_lifetime(config.session_ttl),
            revocations.clone(),
        );

        let mut storage = FileStorage::new(StoragePaths::new(&config.data_dir));
        storage.initialize()?;

        let mailer: Arc<dyn VerificationMailer> = match &config.mail_webhook_url {
            Some(endpoint) => Arc::new(WebhookMailer::new(endpoint.clone())?),
            None => {
                tracing::warn!("MAIL_WEBHOOK_URL not set, verification emails are only logged");
                Arc::new(LogMailer)
            }
        };

        let links = VerificationLinks::new(
            secret,
            config.public_base_url.clone(),
            config.email_verification_ttl,
        )
        .map_err(|e| StartupError::VerificationKey(e.to_string()))?;

        let accounts = AccountService::new(
            Arc::new(FileUserStore::new(storage.clone())),
            Arc::new(FileAvatarStore::new(storage, config.avatar_base_url.as_str())),
            mailer,
            links,
            revocations,
        );

        Ok(Self::new(gate, accounts).with_cookie_secure(config.cookie_secure))
    }
}
