//! Request/response types for the authentication endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Authentication request, dispatched on the `auth_type` discriminant.
///
/// The tag set is closed: unrecognized discriminants fail deserialization and
/// are rejected as an invalid request with no side effects.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(tag = "auth_type", rename_all = "snake_case")]
pub enum LoginRequest {
    CredentialLogin { username: String, password: String },
    SsoGoogle { sso_token: String },
    SsoDiscord { sso_token: String },
    Mfa { principal_id: Uuid, mfa_code: String },
}

#[derive(ToSchema, Serialize, Deserialize, Debug, IntoParams)]
pub struct OtpQuery {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    /// Token to refresh; falls back to the session cookie when absent.
    pub token: Option<String>,
}

/// Uniform response envelope; the HTTP status carries the outcome class.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Envelope {
    pub status: String,
    pub message: String,
    #[schema(value_type = Object, nullable)]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }
}
