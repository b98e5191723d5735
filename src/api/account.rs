// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints under `/api/auth` plus the gated `/account` page data.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use crate::{
    account::{AccountError, AvatarUpload, PasswordChange, ValidationError},
    auth::{removal_cookie, Auth, OptionalAuth, AUTH_COOKIE},
    error::ApiError,
    models::{
        AvatarResponse, DeleteAccountRequest, MessageResponse, SessionCheckResponse,
        UpdatePasswordRequest, UpdateProfileRequest, UserView, VerifyEmailRequest,
    },
    state::AppState,
};

/// Name of the multipart field carrying the image.
pub const AVATAR_FIELD: &str = "avatar";

/// Report whether the caller has a session and who they are.
///
/// Never fails on a bad session; it reports `isAuthenticated: false` instead.
#[utoipa::path(
    get,
    path = "/api/auth/check",
    tag = "Account",
    responses(
        (status = 200, description = "Session state", body = SessionCheckResponse),
    )
)]
pub async fn check_session(
    OptionalAuth(user): OptionalAuth,
    State(state): State<AppState>,
) -> Result<Json<SessionCheckResponse>, ApiError> {
    let Some(user) = user else {
        return Ok(Json(SessionCheckResponse::anonymous()));
    };

    match state.accounts.read_profile(&user) {
        Ok(view) => Ok(Json(SessionCheckResponse::authenticated(view))),
        Err(AccountError::Unauthenticated) => Ok(Json(SessionCheckResponse::anonymous())),
        Err(e) => Err(e.into()),
    }
}

/// Get the caller's profile.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "Account",
    responses(
        (status = 200, description = "Current profile", body = UserView),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn get_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserView>, ApiError> {
    Ok(Json(state.accounts.read_profile(&user)?))
}

/// Page data for the gated account area (`/account`, `/account/*`).
pub async fn account_page(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserView>, ApiError> {
    Ok(Json(state.accounts.read_profile(&user)?))
}

/// Change the caller's display name.
#[utoipa::path(
    post,
    path = "/api/auth/update-profile",
    tag = "Account",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserView),
        (status = 400, description = "Name is empty"),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn update_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserView>, ApiError> {
    Ok(Json(state.accounts.update_profile(&user, &request.name)?))
}

/// Change the caller's password.
#[utoipa::path(
    post,
    path = "/api/auth/update-password",
    tag = "Account",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password too short or not confirmed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Incorrect current password"),
    )
)]
pub async fn update_password(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let change = PasswordChange {
        confirm_password: request
            .confirm_password
            .unwrap_or_else(|| request.new_password.clone()),
        current_password: request.current_password,
        new_password: request.new_password,
    };

    // Argon2 is CPU-bound; keep it off the async workers.
    let accounts = state.accounts.clone();
    let outcome = tokio::task::spawn_blocking(move || accounts.update_password(&user, &change))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password update task failed");
            ApiError::internal()
        })?;
    outcome?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

fn multipart_error(error: MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::bad_request(ValidationError::ImageTooLarge.to_string())
    } else {
        ApiError::bad_request(error.body_text())
    }
}

/// Upload a new avatar image.
#[utoipa::path(
    post,
    path = "/api/auth/upload-avatar",
    tag = "Account",
    request_body(content = crate::models::AvatarForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Avatar stored", body = AvatarResponse),
        (status = 400, description = "Not an image, too large, or no file"),
        (status = 401, description = "Not authenticated"),
        (status = 502, description = "Avatar storage failed"),
    )
)]
pub async fn upload_avatar(
    Auth(user): Auth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some(AvatarUpload {
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let avatar_url = state.accounts.upload_avatar(&user, &upload)?;

    Ok(Json(AvatarResponse { avatar_url }))
}

/// Send a new verification email.
#[utoipa::path(
    post,
    path = "/api/auth/send-verification",
    tag = "Account",
    responses(
        (status = 200, description = "Email sent", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Email is already verified"),
        (status = 502, description = "Mail delivery failed"),
    )
)]
pub async fn send_verification(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .accounts
        .resend_verification(&user, Utc::now())
        .await?;

    Ok(Json(MessageResponse::new("Verification email sent")))
}

/// Confirm an email address from a verification link.
#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    tag = "Account",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = UserView),
        (status = 400, description = "Invalid or expired verification link"),
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<UserView>, ApiError> {
    Ok(Json(state.accounts.confirm_email(&request.token, Utc::now())?))
}

/// Delete the caller's account and end every session it had.
#[utoipa::path(
    post,
    path = "/api/auth/delete-account",
    tag = "Account",
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "Deletion not confirmed"),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn delete_account(
    Auth(user): Auth,
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<DeleteAccountRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    state
        .accounts
        .delete_account(&user, request.confirm, Utc::now())?;

    Ok((
        jar.remove(removal_cookie(state.cookie_secure)),
        Json(MessageResponse::new("Account deleted")),
    ))
}

/// End the current session. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Account",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let now = Utc::now();
    let token = jar.get(AUTH_COOKIE).map(|cookie| cookie.value());
    let session = state.gate.verify_session_at(token, now).ok();

    state.accounts.logout(session.as_ref(), now);

    (
        jar.remove(removal_cookie(state.cookie_secure)),
        Json(MessageResponse::new("Logged out")),
    )
}
