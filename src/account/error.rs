// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account operation errors.

use super::mailer::MailError;
use crate::storage::StorageError;

/// Malformed input to a mutation. Messages are shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("New password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please upload an image file")]
    NotAnImage,
    #[error("Image must be less than 5MB")]
    ImageTooLarge,
    #[error("Account deletion must be explicitly confirmed")]
    DeletionNotConfirmed,
    #[error("Invalid or expired verification link")]
    InvalidVerificationLink,
}

/// Failure of an account operation.
///
/// Every variant leaves the stored user record exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// The session's subject has no user record.
    #[error("Not authenticated")]
    Unauthenticated,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Deliberately generic; never says which credential check failed.
    #[error("Incorrect current password")]
    IncorrectCurrentPassword,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("user store failure: {0}")]
    Store(#[from] StorageError),

    #[error("avatar storage failure: {0}")]
    AvatarStorage(StorageError),

    #[error("verification mail failure: {0}")]
    Mail(#[from] MailError),

    #[error("credential hashing failure: {0}")]
    Credential(String),
}

impl AccountError {
    /// Whether an external collaborator caused the failure.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            AccountError::Store(_)
                | AccountError::AvatarStorage(_)
                | AccountError::Mail(_)
                | AccountError::Credential(_)
        )
    }

    /// Treat a missing record as a session without an account.
    pub(crate) fn missing_as_unauthenticated(self) -> Self {
        match self {
            AccountError::Store(StorageError::NotFound(_)) => AccountError::Unauthenticated,
            other => other,
        }
    }
}

impl From<argon2::password_hash::Error> for AccountError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AccountError::Credential(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::PasswordTooShort.to_string(),
            "New password must be at least 8 characters"
        );
        assert_eq!(
            AccountError::from(ValidationError::EmptyName).to_string(),
            "Name cannot be empty"
        );
    }

    #[test]
    fn missing_record_becomes_unauthenticated() {
        let err = AccountError::Store(StorageError::NotFound("user".to_string()));
        assert!(matches!(
            err.missing_as_unauthenticated(),
            AccountError::Unauthenticated
        ));

        let err = AccountError::Store(StorageError::NotInitialized);
        assert!(err.missing_as_unauthenticated().is_collaborator_failure());
    }
}
