//! Handshake header validation helpers.

use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use super::types::Envelope;

const HANDSHAKE_HEADER: &str = "x-handshake-code";

#[derive(Debug)]
pub(super) enum HandshakeError {
    Missing,
    Mismatch,
}

pub(super) fn require_handshake(
    headers: &HeaderMap,
    expected: &SecretString,
) -> Result<(), HandshakeError> {
    let Some(presented) = extract_handshake(headers) else {
        return Err(HandshakeError::Missing);
    };

    let expected = expected.expose_secret().as_bytes();
    if presented.as_bytes().ct_eq(expected).into() {
        Ok(())
    } else {
        Err(HandshakeError::Mismatch)
    }
}

pub(crate) fn handshake_error_response(err: &HandshakeError) -> Response {
    let message = match err {
        HandshakeError::Missing => "Missing handshake code",
        HandshakeError::Mismatch => "Invalid handshake code",
    };
    (StatusCode::FORBIDDEN, Json(Envelope::error(message))).into_response()
}

fn extract_handshake(headers: &HeaderMap) -> Option<String> {
    headers
        .get(HANDSHAKE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{HANDSHAKE_HEADER, HandshakeError, extract_handshake, require_handshake};
    use axum::http::{HeaderMap, HeaderValue};
    use secrecy::SecretString;

    fn expected() -> SecretString {
        SecretString::from("portal-handshake")
    }

    #[test]
    fn extract_handshake_trims_value() {
        let mut headers = HeaderMap::new();
        headers.insert(HANDSHAKE_HEADER, HeaderValue::from_static("  code  "));
        assert_eq!(extract_handshake(&headers), Some("code".to_string()));
    }

    #[test]
    fn require_handshake_missing_header() {
        let headers = HeaderMap::new();
        let err = require_handshake(&headers, &expected()).err();
        assert!(matches!(err, Some(HandshakeError::Missing)));
    }

    #[test]
    fn require_handshake_rejects_wrong_code() {
        let mut headers = HeaderMap::new();
        headers.insert(HANDSHAKE_HEADER, HeaderValue::from_static("wrong"));
        let err = require_handshake(&headers, &expected()).err();
        assert!(matches!(err, Some(HandshakeError::Mismatch)));
    }

    #[test]
    fn require_handshake_accepts_matching_code() {
        let mut headers = HeaderMap::new();
        headers.insert(HANDSHAKE_HEADER, HeaderValue::from_static("portal-handshake"));
        assert!(require_handshake(&headers, &expected()).is_ok());
    }
}
