// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session token verification and issuance.
//!
//! Verification is a pure function of the token string, the shared secret and
//! the instant passed in. It never panics: every string, including empty or
//! arbitrarily malformed ones, yields either claims or an [`AuthError`].
//!
//! Tokens are minted by an external login service, so `iat` is only trusted
//! within [`MAX_CLOCK_SKEW_SECS`] of the verifier's clock, and a verifier built
//! with [`TokenVerifier::with_max_lifetime`] refuses tokens that claim to
//! live longer than the configured session TTL. Together these bound how
//! long a revoked subject can hold a live token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

use super::{AuthError, SessionClaims};

/// How far ahead of our clock a token's `iat` may be, in seconds.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Stateless verifier for `auth-token` values.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    max_lifetime: Option<Duration>,
}

impl TokenVerifier {
    /// Create a verifier for tokens signed with `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock in `verify_at`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
            max_lifetime: None,
        }
    }

    /// Reject tokens whose `exp - iat` exceeds `max_lifetime`.
    pub fn with_max_lifetime(mut self, max_lifetime: Duration) -> Self {
        self.max_lifetime = Some(max_lifetime);
        self
    }

    /// Verify against the wall clock.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature and structure, then require `now < exp`, an `iat`
    /// no further ahead than [`MAX_CLOCK_SKEW_SECS`] and a lifetime within the cap.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let token_data =
            decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::MalformedToken,
                }
            })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() || claims.jti.is_empty() {
            return Err(AuthError::MalformedToken);
        }
        if !claims.is_live_at(now) {
            return Err(AuthError::TokenExpired);
        }
        if claims.iat > now.timestamp().saturating_add(MAX_CLOCK_SKEW_SECS) {
            return Err(AuthError::IssuedInFuture);
        }
        if let Some(max) = self.max_lifetime {
            if claims.exp.saturating_sub(claims.iat) > max.num_seconds() {
                return Err(AuthError::LifetimeExceeded);
            }
        }

        Ok(claims)
    }
}

/// Mints session tokens for the login collaborator.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer whose tokens live for `ttl`.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Lifetime of issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh session for `subject`, starting at `now`.
    pub fn issue(
        &self,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, SessionClaims), jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;
        Ok((token, claims))
    }
}
