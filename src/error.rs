// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::account::AccountError;
use crate::auth::{error::UNAUTHENTICATED_MESSAGE, AuthError};

/// Message for every collaborator failure. Details go to the logs only.
pub const OPERATION_FAILED_MESSAGE: &str = "Operation failed";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Identical for every kind of authentication failure.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, UNAUTHENTICATED_MESSAGE)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, OPERATION_FAILED_MESSAGE)
    }

    pub fn bad_gateway() -> Self {
        Self::new(StatusCode::BAD_GATEWAY, OPERATION_FAILED_MESSAGE)
    }
}

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        Self::unauthorized()
    }
}

impl From<AccountError> for ApiError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::Unauthenticated => Self::unauthorized(),
            AccountError::Validation(e) => Self::bad_request(e.to_string()),
            e @ (AccountError::IncorrectCurrentPassword | AccountError::AlreadyVerified) => {
                Self::forbidden(e.to_string())
            }
            AccountError::Store(_) | AccountError::Credential(_) => Self::internal(),
            AccountError::AvatarStorage(_) | AccountError::Mail(_) => Self::bad_gateway(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
