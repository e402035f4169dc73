use crate::api::handlers::{auth, health};
use utoipa::openapi::{Contact, InfoBuilder, License, Tag};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login::admin_login,
        auth::login::user_login,
        auth::otp::admin_request_otp,
        auth::otp::user_request_otp,
        auth::otp::admin_change_password,
        auth::otp::user_change_password,
        auth::session::refresh_access_token,
    ),
    components(schemas(
        health::Health,
        auth::types::Envelope,
        auth::types::LoginRequest,
        auth::types::ChangePasswordRequest,
        auth::types::RefreshRequest,
    ))
)]
struct ApiDoc;

/// Generated `OpenAPI` document for the service.
///
/// Info is taken from Cargo.toml metadata instead of the derive defaults.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Credential login, OTP recovery and token refresh".to_string());
    doc.tags = Some(vec![auth_tag]);

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        if name.is_empty() {
            (None, None)
        } else {
            (Some(name), None)
        }
    }
}
