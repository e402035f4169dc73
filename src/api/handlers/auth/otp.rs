//! One-time-password issuance and password recovery.

use axum::{
    Json,
    extract::{Extension, Query},
    http::HeaderMap,
    response::IntoResponse,
};
use rand::Rng;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::cli::globals::GlobalArgs;

use super::error::AuthError;
use super::handshake::{handshake_error_response, require_handshake};
use super::password::hash_password;
use super::principal::PrincipalKind;
use super::state::AuthState;
use super::storage::{
    apply_password_change, issue_otp, latest_otp, lookup_principal_by_email, OtpRecord,
    PasswordChangeOutcome,
};
use super::types::{ChangePasswordRequest, Envelope, OtpQuery};
use super::utils::{normalize_email, valid_email};

/// Six decimal digits, zero-padded, full `000000..=999999` range.
fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..=999_999))
}

/// Whether the presented code redeems the principal's authoritative OTP.
/// Only the newest issued code can ever be redeemable; it must be unused,
/// unexpired, and an exact match.
fn otp_redeemable(record: Option<&OtpRecord>, presented: &str) -> bool {
    record.is_some_and(|record| !record.is_used && !record.expired && record.code == presented)
}

#[utoipa::path(
    get,
    path = "/authentication/admin/otp/request",
    params(
        OtpQuery,
        ("X-Handshake-Code" = String, Header, description = "Portal handshake code")
    ),
    responses(
        (status = 200, description = "OTP generated", body = Envelope),
        (status = 400, description = "Invalid request", body = Envelope),
        (status = 403, description = "Handshake rejected or account inactive", body = Envelope),
        (status = 404, description = "Unknown email", body = Envelope)
    ),
    tag = "auth"
)]
pub async fn admin_request_otp(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    query: Option<Query<OtpQuery>>,
) -> impl IntoResponse {
    request_otp(PrincipalKind::Admin, headers, &pool, &auth_state, &globals, query).await
}

#[utoipa::path(
    get,
    path = "/authentication/user/otp/request",
    params(
        OtpQuery,
        ("X-Handshake-Code" = String, Header, description = "Portal handshake code")
    ),
    responses(
        (status = 200, description = "OTP generated", body = Envelope),
        (status = 400, description = "Invalid request", body = Envelope),
        (status = 403, description = "Handshake rejected or account inactive", body = Envelope),
        (status = 404, description = "Unknown email", body = Envelope)
    ),
    tag = "auth"
)]
pub async fn user_request_otp(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    query: Option<Query<OtpQuery>>,
) -> impl IntoResponse {
    request_otp(PrincipalKind::User, headers, &pool, &auth_state, &globals, query).await
}

async fn request_otp(
    kind: PrincipalKind,
    headers: HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    globals: &GlobalArgs,
    query: Option<Query<OtpQuery>>,
) -> axum::response::Response {
    if let Err(err) = require_handshake(&headers, &globals.handshake_code) {
        return handshake_error_response(&err);
    }

    let Some(Query(query)) = query else {
        return AuthError::InvalidRequest.into_response();
    };

    match issue_recovery_code(kind, pool, auth_state, &query.email).await {
        Ok(code) => Json(Envelope::success(
            "OTP generated.",
            Some(json!({ "otp": code })),
        ))
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn issue_recovery_code(
    kind: PrincipalKind,
    pool: &PgPool,
    auth_state: &AuthState,
    email: &str,
) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if !valid_email(&email) {
        return Err(AuthError::InvalidRequest);
    }

    let dir = kind.directory();
    let principal = lookup_recovery_principal(pool, &dir, &email).await?;

    let code = generate_code();
    issue_otp(
        pool,
        &dir,
        principal,
        &code,
        auth_state.config().otp_ttl_seconds(),
    )
    .await?;
    Ok(code)
}

#[utoipa::path(
    put,
    path = "/authentication/admin/change_password",
    request_body = ChangePasswordRequest,
    params(
        ("X-Handshake-Code" = String, Header, description = "Portal handshake code")
    ),
    responses(
        (status = 200, description = "Password changed", body = Envelope),
        (status = 400, description = "Invalid request or OTP", body = Envelope),
        (status = 403, description = "Handshake rejected or account inactive", body = Envelope),
        (status = 404, description = "Unknown email", body = Envelope)
    ),
    tag = "auth"
)]
pub async fn admin_change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> impl IntoResponse {
    change_password(PrincipalKind::Admin, headers, &pool, &globals, payload).await
}

#[utoipa::path(
    put,
    path = "/authentication/user/change_password",
    request_body = ChangePasswordRequest,
    params(
        ("X-Handshake-Code" = String, Header, description = "Portal handshake code")
    ),
    responses(
        (status = 200, description = "Password changed", body = Envelope),
        (status = 400, description = "Invalid request or OTP", body = Envelope),
        (status = 403, description = "Handshake rejected or account inactive", body = Envelope),
        (status = 404, description = "Unknown email", body = Envelope)
    ),
    tag = "auth"
)]
pub async fn user_change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> impl IntoResponse {
    change_password(PrincipalKind::User, headers, &pool, &globals, payload).await
}

async fn change_password(
    kind: PrincipalKind,
    headers: HeaderMap,
    pool: &PgPool,
    globals: &GlobalArgs,
    payload: Option<Json<ChangePasswordRequest>>,
) -> axum::response::Response {
    if let Err(err) = require_handshake(&headers, &globals.handshake_code) {
        return handshake_error_response(&err);
    }

    let Some(Json(request)) = payload else {
        return AuthError::InvalidRequest.into_response();
    };

    match redeem_and_rotate(kind, pool, &request).await {
        Ok(()) => Json(Envelope::success("Password changed successfully.", None)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn redeem_and_rotate(
    kind: PrincipalKind,
    pool: &PgPool,
    request: &ChangePasswordRequest,
) -> Result<(), AuthError> {
    let email = normalize_email(&request.email);
    if !valid_email(&email) || request.new_password.trim().is_empty() {
        return Err(AuthError::InvalidRequest);
    }

    let dir = kind.directory();
    let principal = lookup_recovery_principal(pool, &dir, &email).await?;

    let record = latest_otp(pool, &dir, principal).await?;
    if !otp_redeemable(record.as_ref(), request.otp.trim()) {
        return Err(AuthError::InvalidOrExpiredOtp);
    }

    let hash = hash_password(&request.new_password)?;
    match apply_password_change(pool, &dir, principal, &hash).await? {
        PasswordChangeOutcome::Changed => Ok(()),
        PasswordChangeOutcome::NoActiveCredential => Err(AuthError::NotFound),
    }
}

async fn lookup_recovery_principal(
    pool: &PgPool,
    dir: &super::principal::Directory,
    email: &str,
) -> Result<Uuid, AuthError> {
    let Some(principal) = lookup_principal_by_email(pool, dir, email).await? else {
        return Err(AuthError::NotFound);
    };
    if !principal.is_active {
        return Err(AuthError::AccountInactive);
    }
    Ok(principal.id)
}
