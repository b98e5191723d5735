// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! The variants exist for logging only. On the wire every variant renders
//! the same 401 body so callers cannot tell a bad token from a missing one.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Message shown for every authentication failure.
pub const UNAUTHENTICATED_MESSAGE: &str = "Not authenticated";

/// Authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No `auth-token` cookie, or an empty one
    #[error("session cookie is missing")]
    MissingToken,
    /// Token does not parse as a session JWT
    #[error("session token is malformed")]
    MalformedToken,
    /// Token signature does not verify against the server secret
    #[error("session token signature is invalid")]
    InvalidSignature,
    /// Token expiry is not in the future
    #[error("session token has expired")]
    TokenExpired,
    /// Token `iat` is further ahead of our clock than the allowed skew
    #[error("session token was issued in the future")]
    IssuedInFuture,
    /// Token claims a lifetime longer than the configured session TTL
    #[error("session token lifetime exceeds the session TTL")]
    LifetimeExceeded,
    /// Token was revoked by logout or account deletion
    #[error("session has been revoked")]
    Revoked,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl AuthError {
    /// Stable code for structured logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::IssuedInFuture => "issued_in_future",
            AuthError::LifetimeExceeded => "lifetime_exceeded",
            AuthError::Revoked => "revoked",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(reason = self.error_code(), "request rejected as unauthenticated");
        let body = Json(AuthErrorBody {
            error: UNAUTHENTICATED_MESSAGE,
        });
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
