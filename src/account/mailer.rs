// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification mail collaborator.
//!
//! Delivery itself is external. `WebhookMailer` hands the message to an HTTP
//! mail relay in a single bounded request; `LogMailer` only records it, which
//! is what development setups without a relay use.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

/// Timeout for the single outbound call per send.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// A verification message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationEmail {
    pub to: String,
    pub name: String,
    pub link: String,
}

/// Mail delivery failure.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
    #[error("mail relay rejected the message with status {0}")]
    Rejected(u16),
    #[error("verification link could not be built: {0}")]
    Link(#[from] url::ParseError),
}

/// Sends verification emails. One attempt per call; retries belong to the relay.
#[async_trait]
pub trait VerificationMailer: Send + Sync {
    async fn send(&self, email: &VerificationEmail) -> Result<(), MailError>;
}

/// Mailer that only logs the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl VerificationMailer for LogMailer {
    async fn send(&self, email: &VerificationEmail) -> Result<(), MailError> {
        tracing::info!(to = %email.to, "verification email queued (log mailer)");
        tracing::debug!(link = %email.link, "verification link");
        Ok(())
    }
}

/// Mailer that POSTs the message as JSON to a relay endpoint.
#[derive(Debug, Clone)]
pub struct WebhookMailer {
    client: reqwest::Client,
    endpoint: Url,
}

impl WebhookMailer {
    /// Create a mailer posting to `endpoint`.
    pub fn new(endpoint: Url) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl VerificationMailer for WebhookMailer {
    async fn send(&self, email: &VerificationEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }

        tracing::info!(to = %email.to, "verification email handed to relay");
        Ok(())
    }
}
