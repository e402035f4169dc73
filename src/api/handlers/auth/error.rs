//! Typed failure taxonomy for the authentication core.
//!
//! Expected outcomes are variants here and never panics; every variant maps
//! to one HTTP status and a generic message. Internal failures keep their
//! source for logging but surface nothing beyond a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

use super::types::Envelope;

#[derive(Debug, Error)]
pub(crate) enum AuthError {
    #[error("Invalid authentication request.")]
    InvalidRequest,
    #[error("User not found or invalid credentials.")]
    NotFound,
    #[error("Account is inactive.")]
    AccountInactive,
    #[error("Invalid password.")]
    InvalidCredentials,
    #[error("Too many failed login attempts.")]
    TooManyAttempts,
    #[error("Invalid or expired OTP.")]
    InvalidOrExpiredOtp,
    #[error("Invalid token.")]
    TokenInvalid,
    #[error("Token expired.")]
    TokenExpired,
    #[error("Authentication type not implemented.")]
    NotImplemented,
    #[error("Internal server error.")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::InvalidOrExpiredOtp => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AccountInactive => StatusCode::FORBIDDEN,
            Self::InvalidCredentials | Self::TokenInvalid | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(source) = &self {
            // Log the cause with context; the caller only sees a generic message.
            error!("Internal error: {source:#}");
        }
        let status = self.status();
        (status, Json(Envelope::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::AuthError;
    use anyhow::anyhow;
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert_eq!(AuthError::InvalidRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::AccountInactive.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::TooManyAttempts.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::InvalidOrExpiredOtp.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::TokenInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::NotImplemented.status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            AuthError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_response_hides_the_cause() {
        let response = AuthError::Internal(anyhow!("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
