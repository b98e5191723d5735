// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require a session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::{AuthError, AuthenticatedUser, AUTH_COOKIE};
use crate::state::AppState;

/// Read the raw `auth-token` value from request headers.
pub fn session_token(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Cookie that clears the session on the client.
///
/// Pass to `CookieJar::remove`; attributes match the ones the login
/// collaborator sets so the browser drops the right cookie.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Extractor for authenticated users.
///
/// Uses the identity placed in extensions by the session gate when present,
/// otherwise verifies the `auth-token` cookie itself.
///
/// # Example
///
/// ```rust,ignore
/// async fn read_profile(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<UserView>, ApiError> {
///     // user.user_id is the only account this handler may touch
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // The gate may already have verified this request.
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = session_token(parts);
        let user = state.gate.authenticate(token.as_deref())?;

        Ok(Auth(user))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid session is present, instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}
