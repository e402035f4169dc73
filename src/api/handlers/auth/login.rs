//! Credential login endpoints for admins and portal users.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::cli::globals::GlobalArgs;

use super::error::AuthError;
use super::guard::{Verdict, evaluate, trips_on_next_failure};
use super::handshake::{handshake_error_response, require_handshake};
use super::password::verify_password;
use super::principal::PrincipalKind;
use super::session::token_cookie;
use super::state::AuthState;
use super::storage::{
    active_flag, flag_ip, insert_attempt, insert_history, lookup_credential, recent_attempts,
};
use super::types::{Envelope, LoginRequest};
use super::utils::extract_client_ip;

const FLAG_REASON: &str = "consecutive failed login attempts";

#[utoipa::path(
    post,
    path = "/authentication/admin/login",
    request_body = LoginRequest,
    params(
        ("X-Handshake-Code" = String, Header, description = "Portal handshake code")
    ),
    responses(
        (status = 200, description = "Authentication successful", body = Envelope),
        (status = 400, description = "Invalid request", body = Envelope),
        (status = 401, description = "Invalid credentials", body = Envelope),
        (status = 403, description = "Handshake rejected or account inactive", body = Envelope),
        (status = 404, description = "Unknown username", body = Envelope),
        (status = 429, description = "Too many failed attempts", body = Envelope),
        (status = 501, description = "Authentication type not implemented", body = Envelope)
    ),
    tag = "auth"
)]
pub async fn admin_login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    login(
        PrincipalKind::Admin,
        headers,
        &pool,
        &auth_state,
        &globals,
        payload,
    )
    .await
}

#[utoipa::path(
    post,
    path = "/authentication/user/login",
    request_body = LoginRequest,
    params(
        ("X-Handshake-Code" = String, Header, description = "Portal handshake code")
    ),
    responses(
        (status = 200, description = "Authentication successful", body = Envelope),
        (status = 400, description = "Invalid request", body = Envelope),
        (status = 401, description = "Invalid credentials", body = Envelope),
        (status = 403, description = "Handshake rejected or account inactive", body = Envelope),
        (status = 404, description = "Unknown username", body = Envelope),
        (status = 429, description = "Too many failed attempts", body = Envelope),
        (status = 501, description = "Authentication type not implemented", body = Envelope)
    ),
    tag = "auth"
)]
pub async fn user_login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    login(
        PrincipalKind::User,
        headers,
        &pool,
        &auth_state,
        &globals,
        payload,
    )
    .await
}

async fn login(
    kind: PrincipalKind,
    headers: HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    globals: &GlobalArgs,
    payload: Option<Json<LoginRequest>>,
) -> axum::response::Response {
    if let Err(err) = require_handshake(&headers, &globals.handshake_code) {
        return handshake_error_response(&err);
    }

    let Some(Json(request)) = payload else {
        return AuthError::InvalidRequest.into_response();
    };

    match request {
        LoginRequest::CredentialLogin { username, password } => {
            match credential_login(kind, &headers, pool, auth_state, &username, &password).await {
                Ok(response) => response,
                Err(err) => err.into_response(),
            }
        }
        LoginRequest::SsoGoogle { .. } | LoginRequest::SsoDiscord { .. }
        | LoginRequest::Mfa { .. } => AuthError::NotImplemented.into_response(),
    }
}

async fn credential_login(
    kind: PrincipalKind,
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    username: &str,
    password: &str,
) -> Result<axum::response::Response, AuthError> {
    let dir = kind.directory();
    let config = auth_state.config();

    // Unknown usernames never reach the attempt ledger.
    let Some(record) = lookup_credential(pool, &dir, username.trim()).await? else {
        return Err(AuthError::NotFound);
    };

    let client_ip = extract_client_ip(headers);

    if !record.credential_active || !record.principal_active {
        insert_attempt(pool, &dir, record.principal_id, client_ip.as_deref(), false).await?;
        return Err(AuthError::AccountInactive);
    }

    if let Some(ip) = client_ip.as_deref() {
        if active_flag(pool, &dir, ip).await? {
            return Err(AuthError::TooManyAttempts);
        }
    }

    let prior = recent_attempts(
        pool,
        &dir,
        record.principal_id,
        client_ip.as_deref(),
        config.attempt_window(),
    )
    .await?;
    if evaluate(&prior, config.failure_threshold()) == Verdict::Tripped {
        if let Some(ip) = client_ip.as_deref() {
            flag_ip(pool, &dir, record.principal_id, ip, FLAG_REASON).await?;
        }
        return Err(AuthError::TooManyAttempts);
    }

    if verify_password(password, &record.password_hash)? {
        insert_attempt(pool, &dir, record.principal_id, client_ip.as_deref(), true).await?;
        insert_history(pool, &dir, record.principal_id, client_ip.as_deref()).await?;
        return success_response(auth_state, record.principal_id, record.tenant_id);
    }

    insert_attempt(pool, &dir, record.principal_id, client_ip.as_deref(), false).await?;

    // This failure may be the one that crosses the threshold; flag now so the
    // very next request is refused outright.
    if trips_on_next_failure(&prior, config.failure_threshold()) {
        if let Some(ip) = client_ip.as_deref() {
            flag_ip(pool, &dir, record.principal_id, ip, FLAG_REASON).await?;
        }
        return Err(AuthError::TooManyAttempts);
    }

    Err(AuthError::InvalidCredentials)
}

fn success_response(
    auth_state: &AuthState,
    principal_id: Uuid,
    tenant_id: Option<Uuid>,
) -> Result<axum::response::Response, AuthError> {
    let config = auth_state.config();
    let token = auth_state.tokens().issue(principal_id, tenant_id, None, None)?;
    let cookie = token_cookie(&token, config.token_ttl_seconds(), config.cookie_secure())?;

    let envelope = Envelope::success(
        "Authentication successful.",
        Some(json!({
            "uid": principal_id,
            "cid": tenant_id,
        })),
    );

    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(envelope)).into_response())
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::super::token::TokenService;
    use super::{admin_login, user_login};
    use crate::cli::globals::GlobalArgs;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, HeaderValue, StatusCode};
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("https://portal.tld".to_string());
        let tokens = TokenService::from_secret(
            b"test-secret",
            config.token_ttl_seconds(),
            config.refresh_window_seconds(),
        );
        Arc::new(AuthState::new(config, tokens))
    }

    fn globals() -> GlobalArgs {
        let mut globals = GlobalArgs::new("https://portal.tld".to_string());
        globals.set_handshake_code(SecretString::from("handshake".to_string()));
        globals
    }

    fn handshake_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-handshake-code", HeaderValue::from_static("handshake"));
        headers
    }

    #[tokio::test]
    async fn admin_login_missing_handshake_is_forbidden() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = admin_login(
            HeaderMap::new(),
            Extension(pool),
            Extension(auth_state()),
            Extension(globals()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn user_login_missing_payload_is_bad_request() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = user_login(
            handshake_headers(),
            Extension(pool),
            Extension(auth_state()),
            Extension(globals()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn sso_login_is_not_implemented() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let payload = super::LoginRequest::SsoGoogle {
            sso_token: "opaque".to_string(),
        };
        let response = user_login(
            handshake_headers(),
            Extension(pool),
            Extension(auth_state()),
            Extension(globals()),
            Some(Json(payload)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        Ok(())
    }
}
