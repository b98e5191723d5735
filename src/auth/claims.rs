// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the authenticated identity derived from them.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried by an `auth-token` session JWT.
///
/// All four fields are required; a token missing any of them is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID) - the only stable key into the user store
    pub sub: String,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds, exclusive)
    pub exp: i64,

    /// Session ID, the revocation handle used by logout
    pub jti: String,
}

impl SessionClaims {
    /// A token is live strictly before its expiry instant.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.exp
    }
}

/// Authenticated identity established by the session gate.
///
/// This is the primary type handlers receive to know who is calling. Account
/// operations act on `user_id` and never accept a target ID from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    /// Session ID (`jti` claim)
    pub session_id: String,

    /// When the session was issued
    pub issued_at: DateTime<Utc>,

    /// When the session expires
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    /// Create from verified claims.
    pub fn from_claims(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            session_id: claims.jti,
            issued_at: unix_to_datetime(claims.iat),
            expires_at: unix_to_datetime(claims.exp),
        }
    }
}

fn unix_to_datetime(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> SessionClaims {
        SessionClaims {
            sub: "user_123".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            jti: "sess_abc".to_string(),
        }
    }

    #[test]
    fn from_claims_extracts_user_and_session() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.session_id, "sess_abc");
        assert_eq!(user.issued_at.timestamp(), 1_700_000_000);
        assert_eq!(user.expires_at.timestamp(), 1_700_003_600);
    }

    #[test]
    fn expiry_instant_is_exclusive() {
        let claims = sample_claims();
        let just_before = unix_to_datetime(claims.exp - 1);
        let at_expiry = unix_to_datetime(claims.exp);

        assert!(claims.is_live_at(just_before));
        assert!(!claims.is_live_at(at_expiry));
    }
}
