// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session gate for protected route prefixes.
//!
//! The gate makes one decision per request: paths outside every protected
//! prefix pass untouched; protected paths need an `auth-token` cookie that
//! verifies and is not revoked, otherwise the caller is redirected to the
//! unauthenticated landing route. Absent, malformed, expired and revoked
//! tokens all produce the same redirect.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/account", get(account_page))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), session_gate))
//!     .with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};

use super::{AuthError, AuthenticatedUser, RevocationList, SessionClaims, TokenVerifier, AUTH_COOKIE};
use crate::state::AppState;

/// Which paths the gate protects and where it sends rejected callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    protected_prefixes: Vec<String>,
    redirect_to: String,
}

impl GateConfig {
    /// Create a gate configuration.
    ///
    /// Trailing slashes on prefixes are ignored, so `/account/` and
    /// `/account` protect the same paths.
    pub fn new<I, S>(protected_prefixes: I, redirect_to: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let protected_prefixes = protected_prefixes
            .into_iter()
            .map(|prefix| prefix.as_ref().trim().trim_end_matches('/').to_string())
            .collect();

        Self {
            protected_prefixes,
            redirect_to: redirect_to.into(),
        }
    }

    /// Path callers are redirected to when the gate rejects them.
    pub fn redirect_to(&self) -> &str {
        &self.redirect_to
    }

    /// Whether `path` falls under a protected prefix.
    ///
    /// Matching is segment-aware: `/account` covers `/account` and
    /// `/account/security` but not `/accounting`.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| path_has_prefix(path, prefix))
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new(["/account"], "/signup")
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    // An empty prefix came from "/" and covers everything.
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Outcome of running the gate over one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Path is not protected; continue without an identity.
    Pass,
    /// Path is protected and the session is valid.
    Allow(AuthenticatedUser),
    /// Path is protected and the session is absent or invalid.
    Redirect(String),
}

/// Session gate: token verification plus revocation, applied per prefix.
pub struct SessionGate {
    config: GateConfig,
    verifier: TokenVerifier,
    revocations: Arc<RevocationList>,
}

impl SessionGate {
    /// Create a gate.
    pub fn new(config: GateConfig, verifier: TokenVerifier, revocations: Arc<RevocationList>) -> Self {
        Self {
            config,
            verifier,
            revocations,
        }
    }

    /// Gate configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Revocation list consulted on every authentication.
    pub fn revocations(&self) -> &Arc<RevocationList> {
        &self.revocations
    }

    /// Verify a session token and make sure it has not been revoked.
    pub fn verify_session_at(
        &self,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, AuthError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::MissingToken)?;
        let claims = self.verifier.verify_at(token, now)?;
        if self.revocations.is_revoked(&claims) {
            return Err(AuthError::Revoked);
        }
        Ok(claims)
    }

    /// Authenticate a cookie value against the wall clock.
    pub fn authenticate(&self, token: Option<&str>) -> Result<AuthenticatedUser, AuthError> {
        self.verify_session_at(token, Utc::now())
            .map(AuthenticatedUser::from_claims)
    }

    /// Decide what happens to a request for `path` carrying `token`.
    pub fn decide_at(&self, path: &str, token: Option<&str>, now: DateTime<Utc>) -> GateDecision {
        if !self.config.is_protected(path) {
            return GateDecision::Pass;
        }

        match self.verify_session_at(token, now) {
            Ok(claims) => GateDecision::Allow(AuthenticatedUser::from_claims(claims)),
            Err(e) => {
                tracing::debug!(path, reason = e.error_code(), "session gate redirect");
                GateDecision::Redirect(self.config.redirect_to.clone())
            }
        }
    }
}

/// Axum middleware applying the [`SessionGate`] held in [`AppState`].
///
/// On success the [`AuthenticatedUser`] is placed in request extensions so
/// the `Auth` extractor does not verify the token a second time.
pub async fn session_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = jar.get(AUTH_COOKIE).map(|cookie| cookie.value().to_string());
    let decision = state
        .gate
        .decide_at(request.uri().path(), token.as_deref(), Utc::now());

    match decision {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Allow(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        GateDecision::Redirect(target) => Redirect::temporary(&target).into_response(),
    }
}
