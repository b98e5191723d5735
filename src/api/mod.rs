// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info_span, Span};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    account::validation::MAX_AVATAR_BYTES,
    auth::{session_gate, AUTH_COOKIE},
    models::{
        AvatarForm, AvatarResponse, DeleteAccountRequest, MessageResponse, SessionCheckResponse,
        UpdatePasswordRequest, UpdateProfileRequest, UserView, VerifyEmailRequest,
    },
    state::AppState,
};

pub mod account;
pub mod health;

/// Body limit for avatar uploads: the image plus room for multipart framing,
/// so an image just over the limit still reaches validation.
const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES + 64 * 1024;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/check", get(account::check_session))
        .route("/profile", get(account::get_profile))
        .route("/update-profile", post(account::update_profile))
        .route("/update-password", post(account::update_password))
        .route(
            "/upload-avatar",
            post(account::upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route("/send-verification", post(account::send_verification))
        .route("/verify-email", post(account::verify_email))
        .route("/delete-account", post(account::delete_account))
        .route("/logout", post(account::logout));

    let app = Router::new()
        .nest("/api/auth", auth_routes)
        .route("/account", get(account::account_page))
        .route("/account/{*rest}", get(account::account_page))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state.clone());

    Router::new()
        .merge(app)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state, session_gate))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// Registers the `auth-token` cookie as the security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                AUTH_COOKIE,
                "Signed session token issued at login.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    security(("SessionCookie" = [])),
    paths(
        account::check_session,
        account::get_profile,
        account::update_profile,
        account::update_password,
        account::upload_avatar,
        account::send_verification,
        account::verify_email,
        account::delete_account,
        account::logout,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            UserView,
            SessionCheckResponse,
            UpdateProfileRequest,
            UpdatePasswordRequest,
            AvatarForm,
            AvatarResponse,
            DeleteAccountRequest,
            VerifyEmailRequest,
            MessageResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Account", description = "Session check and account self-service"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_state, TestContext, TEST_PASSWORD};
    use axum::{
        body::to_bytes,
        http::{header, Method, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "avatar-test-boundary";

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{AUTH_COOKIE}={token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn avatar_request(token: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"avatar\"; filename=\"a\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/upload-avatar")
            .header(header::COOKIE, format!("{AUTH_COOKIE}={token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(ctx: &TestContext, request: Request<Body>) -> Response {
        router(ctx.state.clone()).oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn protected_page_redirects_without_cookie() {
        let ctx = test_state();

        for path in ["/account", "/account/security"] {
            let response = send(&ctx, request(Method::GET, path, None, None)).await;
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(response.headers()[header::LOCATION], "/signup");
        }
    }

    #[tokio::test]
    async fn protected_page_redirects_bad_tokens_identically() {
        let ctx = test_state();
        let expired = ctx
            .issuer
            .issue("user_1", chrono::Utc::now() - chrono::Duration::hours(2))
            .unwrap()
            .0;

        for token in ["", "garbage", "a.b.c", expired.as_str()] {
            let response = send(&ctx, request(Method::GET, "/account", Some(token), None)).await;
            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(response.headers()[header::LOCATION], "/signup");
        }
    }

    #[tokio::test]
    async fn protected_page_allows_valid_session() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");

        let response = send(&ctx, request(Method::GET, "/account/settings", Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["id"], "user_1");
    }

    #[tokio::test]
    async fn unprotected_paths_pass_through() {
        let ctx = test_state();

        let response = send(&ctx, request(Method::GET, "/health/live", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        // Not under /account, so the gate stays out of the way
        let response = send(&ctx, request(Method::GET, "/accounting", None, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let ctx = test_state();
        let response = send(&ctx, request(Method::GET, "/health/live", None, None)).await;
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn session_check_reports_state() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");

        let body = json_body(send(&ctx, request(Method::GET, "/api/auth/check", None, None)).await).await;
        assert_eq!(body, json!({"isAuthenticated": false, "user": null}));

        let body = json_body(send(&ctx, request(Method::GET, "/api/auth/check", Some(&token), None)).await).await;
        assert_eq!(body["isAuthenticated"], true);
        assert_eq!(body["user"]["email"], "user_1@example.test");
    }

    #[tokio::test]
    async fn api_auth_failures_are_uniform() {
        let ctx = test_state();

        for token in [None, Some("garbage")] {
            let response = send(&ctx, request(Method::GET, "/api/auth/profile", token, None)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(json_body(response).await, json!({"error": "Not authenticated"}));
        }
    }

    #[tokio::test]
    async fn profile_update_round_trip() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");

        let response = send(
            &ctx,
            request(Method::POST, "/api/auth/update-profile", Some(&token), Some(json!({"name": "Ada"}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["name"], "Ada");

        let body = json_body(send(&ctx, request(Method::GET, "/api/auth/profile", Some(&token), None)).await).await;
        assert_eq!(body["name"], "Ada");
    }

    #[tokio::test]
    async fn empty_name_is_a_validation_error() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");

        let response = send(
            &ctx,
            request(Method::POST, "/api/auth/update-profile", Some(&token), Some(json!({"name": "  "}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Name cannot be empty");
    }

    #[tokio::test]
    async fn password_update_outcomes() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");
        let update = |body: Value| request(Method::POST, "/api/auth/update-password", Some(&token), Some(body));

        let response = send(
            &ctx,
            update(json!({"currentPassword": TEST_PASSWORD, "newPassword": "1234567"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "New password must be at least 8 characters"
        );

        let response = send(
            &ctx,
            update(json!({"currentPassword": "wrong password", "newPassword": "new password!"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"], "Incorrect current password");

        let response = send(
            &ctx,
            update(json!({
                "currentPassword": TEST_PASSWORD,
                "newPassword": "new password!",
                "confirmPassword": "new password!"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn avatar_upload_boundaries_over_http() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");

        let response = send(&ctx, avatar_request(&token, "image/png", &vec![0u8; MAX_AVATAR_BYTES])).await;
        assert_eq!(response.status(), StatusCode::OK);
        let url = json_body(response).await["avatarUrl"].as_str().unwrap().to_string();
        assert!(url.starts_with("/avatars/user_1/"));

        let response = send(&ctx, avatar_request(&token, "image/png", &vec![0u8; MAX_AVATAR_BYTES + 1])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Image must be less than 5MB");

        let response = send(&ctx, avatar_request(&token, "text/plain", b"hello")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Please upload an image file");

        assert_eq!(ctx.avatars.stored(), vec![url]);
    }

    #[tokio::test]
    async fn avatar_storage_failure_is_generic() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");
        ctx.avatars.fail_puts(true);

        let response = send(&ctx, avatar_request(&token, "image/png", b"png")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"], "Operation failed");
    }

    #[tokio::test]
    async fn send_verification_keeps_email_unverified() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");

        let response = send(&ctx, request(Method::POST, "/api/auth/send-verification", Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(send(&ctx, request(Method::GET, "/api/auth/check", Some(&token), None)).await).await;
        assert_eq!(body["user"]["emailVerified"], false);
        assert_eq!(ctx.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn verify_email_rejects_forged_token() {
        let ctx = test_state();

        let response = send(
            &ctx,
            request(Method::POST, "/api/auth/verify-email", None, Some(json!({"token": "x.y"}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Invalid or expired verification link"
        );
    }

    #[tokio::test]
    async fn delete_then_check_is_unauthenticated() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");

        let response = send(
            &ctx,
            request(Method::POST, "/api/auth/delete-account", Some(&token), Some(json!({}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &ctx,
            request(Method::POST, "/api/auth/delete-account", Some(&token), Some(json!({"confirm": true}))),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie(&response).starts_with(&format!("{AUTH_COOKIE}=")));

        let body = json_body(send(&ctx, request(Method::GET, "/api/auth/check", Some(&token), None)).await).await;
        assert_eq!(body["isAuthenticated"], false);

        let response = send(&ctx, request(Method::GET, "/account", Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn logout_twice_succeeds() {
        let ctx = test_state();
        ctx.seed_user("user_1");
        let token = ctx.token_for("user_1");

        for _ in 0..2 {
            let response = send(&ctx, request(Method::POST, "/api/auth/logout", Some(&token), None)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(set_cookie(&response).contains("Max-Age=0"));
        }

        let response = send(&ctx, request(Method::POST, "/api/auth/logout", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&ctx, request(Method::GET, "/account", Some(&token), None)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[test]
    fn openapi_lists_account_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/check",
            "/api/auth/update-password",
            "/api/auth/upload-avatar",
            "/api/auth/logout",
            "/health/ready",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
