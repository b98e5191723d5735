// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Input rules for account mutations.
//!
//! All checks here run before any collaborator is touched.

use unicode_normalization::UnicodeNormalization;

use super::ValidationError;

/// Minimum new password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Largest accepted avatar upload (5 MiB, inclusive).
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Trim and NFC-normalise a display name; reject if nothing is left.
pub fn normalize_name(name: &str) -> Result<String, ValidationError> {
    let normalized: String = name.trim().nfc().collect();
    if normalized.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(normalized)
}

/// Check a new password and its confirmation.
///
/// Length is checked first, then the confirmation match.
pub fn validate_new_password(new_password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if new_password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Check an avatar's declared MIME type and its size.
pub fn validate_avatar(content_type: Option<&str>, size: usize) -> Result<(), ValidationError> {
    let is_image = content_type
        .map(|ct| ct.trim().to_ascii_lowercase())
        .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
        return Err(ValidationError::NotAnImage);
    }
    if size > MAX_AVATAR_BYTES {
        return Err(ValidationError::ImageTooLarge);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_normalized() {
        assert_eq!(normalize_name("  Ada ").unwrap(), "Ada");
        // "e" + combining acute becomes the precomposed form
        assert_eq!(normalize_name("Rene\u{301}").unwrap(), "Ren\u{e9}");
    }

    #[test]
    fn blank_names_are_rejected() {
        assert_eq!(normalize_name(""), Err(ValidationError::EmptyName));
        assert_eq!(normalize_name(" \t\n "), Err(ValidationError::EmptyName));
        assert_eq!(normalize_name("\u{3000}"), Err(ValidationError::EmptyName));
    }

    #[test]
    fn password_length_boundary() {
        assert_eq!(
            validate_new_password("1234567", "1234567"),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(validate_new_password("12345678", "12345678"), Ok(()));
        // Characters, not bytes
        assert_eq!(
            validate_new_password("ééééééé", "ééééééé"),
            Err(ValidationError::PasswordTooShort)
        );
    }

    #[test]
    fn length_is_reported_before_mismatch() {
        assert_eq!(
            validate_new_password("short", "other"),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(
            validate_new_password("long enough", "long enougg"),
            Err(ValidationError::PasswordMismatch)
        );
    }

    #[test]
    fn avatar_size_boundary() {
        assert_eq!(validate_avatar(Some("image/png"), MAX_AVATAR_BYTES), Ok(()));
        assert_eq!(
            validate_avatar(Some("image/png"), MAX_AVATAR_BYTES + 1),
            Err(ValidationError::ImageTooLarge)
        );
    }

    #[test]
    fn avatar_type_must_be_image() {
        assert_eq!(validate_avatar(Some("text/plain"), 1), Err(ValidationError::NotAnImage));
        assert_eq!(validate_avatar(Some("text/plain"), 0), Err(ValidationError::NotAnImage));
        assert_eq!(
            validate_avatar(Some("text/plain"), MAX_AVATAR_BYTES * 2),
            Err(ValidationError::NotAnImage)
        );
        assert_eq!(validate_avatar(None, 1), Err(ValidationError::NotAnImage));
        assert_eq!(validate_avatar(Some("Image/JPEG"), 10), Ok(()));
    }
}
