// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Cookie-based session authentication for the account area.
//!
//! ## Auth Flow
//!
//! 1. The login collaborator issues an HS256 JWT (`sub`, `iat`, `exp`, `jti`)
//!    and stores it in the `auth-token` cookie
//! 2. On every request the session gate:
//!    - checks whether the path is under a protected prefix
//!    - verifies signature and expiry against the server secret
//!    - rejects sessions revoked by logout or account deletion
//!    - redirects to the landing route on any failure
//! 3. Handlers receive the identity through the `Auth` extractor
//!
//! ## Security
//!
//! - Absent, malformed, expired and revoked tokens are indistinguishable to
//!   the caller
//! - Verification is a pure function of token, secret and clock
//! - No leeway on expiry: a token is dead at its `exp` second
//! - `iat` may run at most a minute ahead of the server clock, and no token
//!   may outlive the configured session TTL

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod revocation;
pub mod verifier;

pub use claims::{AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::{removal_cookie, Auth, OptionalAuth};
pub use middleware::{session_gate, GateConfig, GateDecision, SessionGate};
pub use revocation::RevocationList;
pub use verifier::{TokenIssuer, TokenVerifier, MAX_CLOCK_SKEW_SECS};

/// Name of the session cookie.
pub const AUTH_COOKIE: &str = "auth-token";
