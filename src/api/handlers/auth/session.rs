//! Session cookie helpers and the access-token refresh endpoint.

use anyhow::Context;
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header::COOKIE, header::SET_COOKIE},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;

use crate::cli::globals::GlobalArgs;

use super::error::AuthError;
use super::handshake::{handshake_error_response, require_handshake};
use super::state::AuthState;
use super::token::Refresh;
use super::types::{Envelope, RefreshRequest};

pub(super) const SESSION_COOKIE: &str = "custos_token";

/// Build the session cookie header value for a freshly issued token.
pub(super) fn token_cookie(
    token: &str,
    max_age_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, AuthError> {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .context("failed to build session cookie")
        .map_err(AuthError::from)
}

/// Extract the session token from the request's cookie header, if any.
pub(super) fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(SESSION_COOKIE).and_then(|rest| rest.strip_prefix('=')))
        .map(str::to_string)
        .filter(|token| !token.is_empty())
}

#[utoipa::path(
    post,
    path = "/authentication/api/access_token/refresh",
    request_body = RefreshRequest,
    params(
        ("X-Handshake-Code" = String, Header, description = "Portal handshake code")
    ),
    responses(
        (status = 200, description = "Token refreshed or still valid", body = Envelope),
        (status = 400, description = "No token supplied", body = Envelope),
        (status = 401, description = "Token invalid or expired", body = Envelope),
        (status = 403, description = "Handshake rejected", body = Envelope)
    ),
    tag = "auth"
)]
pub async fn refresh_access_token(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    globals: Extension<GlobalArgs>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    if let Err(err) = require_handshake(&headers, &globals.handshake_code) {
        return handshake_error_response(&err);
    }

    // The body token wins; the session cookie is the fallback.
    let token = payload
        .and_then(|Json(request)| request.token)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| session_token(&headers));

    let Some(token) = token else {
        return AuthError::InvalidRequest.into_response();
    };

    match refresh(&auth_state, &token) {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

fn refresh(auth_state: &AuthState, token: &str) -> Result<axum::response::Response, AuthError> {
    match auth_state.tokens().refresh(token)? {
        Refresh::Refreshed(refreshed) => {
            let config = auth_state.config();
            let cookie =
                token_cookie(&refreshed, config.token_ttl_seconds(), config.cookie_secure())?;
            let envelope = Envelope::success(
                "Token refreshed.",
                Some(json!({ "token": refreshed })),
            );
            Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(envelope)).into_response())
        }
        Refresh::NotDue => {
            Ok(Json(Envelope::success("Token is still valid.", None)).into_response())
        }
        Refresh::Expired => Err(AuthError::TokenExpired),
        Refresh::Invalid => Err(AuthError::TokenInvalid),
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::super::token::TokenService;
    use super::{SESSION_COOKIE, refresh_access_token, session_token, token_cookie};
    use crate::cli::globals::GlobalArgs;
    use anyhow::Result;
    use axum::Json;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, HeaderValue, StatusCode, header::COOKIE};
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use std::sync::Arc;
    use uuid::Uuid;

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

    #[test]
    fn token_cookie_sets_attributes() -> Result<()> {
        let cookie = token_cookie("abc", 60, true).map_err(|err| anyhow::anyhow!("{err}"))?;
        let cookie = cookie.to_str()?;
        assert!(cookie.starts_with("custos_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=60"));
        assert!(cookie.contains("Secure"));
        Ok(())
    }

    #[test]
    fn plain_http_cookie_is_not_secure() -> Result<()> {
        let cookie = token_cookie("abc", 60, false).map_err(|err| anyhow::anyhow!("{err}"))?;
        assert!(!cookie.to_str()?.contains("Secure"));
        Ok(())
    }

    #[test]
    fn session_token_parses_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; custos_token=tok123; theme=dark"),
        );
        assert_eq!(session_token(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn session_token_missing_cookie() {
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn refresh_missing_handshake_is_forbidden() {
        let response = refresh_access_token(
            HeaderMap::new(),
            Extension(auth_state()),
            Extension(globals()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn refresh_without_any_token_is_bad_request() {
        let response = refresh_access_token(
            handshake_headers(),
            Extension(auth_state()),
            Extension(globals()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_near_expiry_sets_a_new_cookie() -> Result<()> {
        let state = auth_state();
        let token = state.tokens().issue(Uuid::new_v4(), None, Some(30), None)?;
        let payload = super::RefreshRequest { token: Some(token) };

        let response = refresh_access_token(
            handshake_headers(),
            Extension(state),
            Extension(globals()),
            Some(Json(payload)),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(axum::http::header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
        Ok(())
    }

    #[tokio::test]
    async fn refresh_fresh_token_is_not_due() -> Result<()> {
        let state = auth_state();
        let token = state.tokens().issue(Uuid::new_v4(), None, None, None)?;
        let mut headers = handshake_headers();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))?,
        );

        let response = refresh_access_token(headers, Extension(state), Extension(globals()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(axum::http::header::SET_COOKIE).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn refresh_expired_token_is_unauthorized() -> Result<()> {
        let state = auth_state();
        let token = state.tokens().issue(Uuid::new_v4(), None, Some(-120), None)?;
        let payload = super::RefreshRequest { token: Some(token) };

        let response = refresh_access_token(
            handshake_headers(),
            Extension(state),
            Extension(globals()),
            Some(Json(payload)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
