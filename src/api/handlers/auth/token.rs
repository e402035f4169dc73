//! Session-token issuance, validation, and refresh.
//!
//! Tokens are signed HS256 JWTs; nothing is stored server-side, validity is
//! purely cryptographic plus expiry. One decode contract serves every caller:
//! a three-way outcome so "tampered" and "expired" stay distinguishable.

use anyhow::{Context, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const TOKEN_TYPE_ACCESS: &str = "access";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Principal id.
    pub sub: Uuid,
    /// Tenant (company) id, absent for system-level admins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
    pub typ: String,
}

/// Three-way decode outcome. Callers must distinguish a tampered token from a
/// well-signed but expired one, because only the latter is refresh-eligible.
#[derive(Debug)]
pub enum Decoded {
    Valid(Claims),
    Expired,
    Invalid,
}

/// Outcome of a refresh request.
#[derive(Debug)]
pub enum Refresh {
    /// A new token with a fresh TTL, signed by the same key.
    Refreshed(String),
    /// Signature valid and token current, but not close enough to expiry.
    NotDue,
    /// Expired tokens are never silently refreshed.
    Expired,
    Invalid,
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: i64,
    refresh_window: i64,
}

impl TokenService {
    #[must_use]
    pub fn from_secret(secret: &[u8], token_ttl_seconds: i64, refresh_window_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            token_ttl: token_ttl_seconds,
            refresh_window: refresh_window_seconds,
        }
    }

    /// Issue a signed, time-bound token for a principal.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue(
        &self,
        principal_id: Uuid,
        tenant_id: Option<Uuid>,
        ttl_seconds: Option<i64>,
        token_type: Option<&str>,
    ) -> Result<String> {
        let now = unix_now();
        let claims = Claims {
            sub: principal_id,
            cid: tenant_id,
            iat: now,
            exp: now + ttl_seconds.unwrap_or(self.token_ttl),
            typ: token_type.unwrap_or(TOKEN_TYPE_ACCESS).to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("failed to sign token")
    }

    #[must_use]
    pub fn decode(&self, token: &str) -> Decoded {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Decoded::Valid(data.claims),
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Decoded::Expired,
                _ => Decoded::Invalid,
            },
        }
    }

    /// Refresh a token whose remaining time-to-live is below the refresh
    /// window. Anything else is returned unchanged as a non-refresh outcome.
    ///
    /// # Errors
    ///
    /// Returns an error only when signing the replacement token fails.
    pub fn refresh(&self, token: &str) -> Result<Refresh> {
        match self.decode(token) {
            Decoded::Valid(claims) => {
                let remaining = claims.exp - unix_now();
                if remaining <= self.refresh_window {
                    let refreshed =
                        self.issue(claims.sub, claims.cid, None, Some(TOKEN_TYPE_ACCESS))?;
                    Ok(Refresh::Refreshed(refreshed))
                } else {
                    Ok(Refresh::NotDue)
                }
            }
            Decoded::Expired => Ok(Refresh::Expired),
            Decoded::Invalid => Ok(Refresh::Invalid),
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::{unix_now, Decoded, Refresh, TokenService, TOKEN_TYPE_ACCESS};
    use anyhow::Result;
    use uuid::Uuid;

    fn service() -> TokenService {
        TokenService::from_secret(b"test-secret", 24 * 60 * 60, 60)
    }

    #[test]
    fn issue_then_decode_round_trips_claims() -> Result<()> {
        let service = service();
        let principal = Uuid::new_v4();
        let tenant = Uuid::new_v4();

        let token = service.issue(principal, Some(tenant), None, None)?;
        let Decoded::Valid(claims) = service.decode(&token) else {
            panic!("expected valid token");
        };

        assert_eq!(claims.sub, principal);
        assert_eq!(claims.cid, Some(tenant));
        assert_eq!(claims.typ, TOKEN_TYPE_ACCESS);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
        Ok(())
    }

    #[test]
    fn tampered_token_is_invalid_not_expired() -> Result<()> {
        let service = service();
        let token = service.issue(Uuid::new_v4(), None, None, None)?;

        let mut tampered = token.clone();
        tampered.pop();
        assert!(matches!(service.decode(&tampered), Decoded::Invalid));

        let other = TokenService::from_secret(b"other-secret", 24 * 60 * 60, 60);
        assert!(matches!(other.decode(&token), Decoded::Invalid));
        Ok(())
    }

    #[test]
    fn expired_token_decodes_as_expired() -> Result<()> {
        let service = service();
        let token = service.issue(Uuid::new_v4(), None, Some(-120), None)?;
        assert!(matches!(service.decode(&token), Decoded::Expired));
        Ok(())
    }

    #[test]
    fn refresh_within_window_issues_fresh_token() -> Result<()> {
        let service = service();
        let principal = Uuid::new_v4();
        let token = service.issue(principal, None, Some(30), None)?;

        let Refresh::Refreshed(refreshed) = service.refresh(&token)? else {
            panic!("expected refreshed token");
        };
        let Decoded::Valid(claims) = service.decode(&refreshed) else {
            panic!("expected valid refreshed token");
        };
        assert_eq!(claims.sub, principal);
        // New token carries the full default TTL again.
        assert!(claims.exp > unix_now() + 24 * 60 * 60 - 5);
        Ok(())
    }

    #[test]
    fn refresh_outside_window_is_not_due() -> Result<()> {
        let service = service();
        let token = service.issue(Uuid::new_v4(), None, None, None)?;
        assert!(matches!(service.refresh(&token)?, Refresh::NotDue));
        Ok(())
    }

    #[test]
    fn refresh_never_resurrects_expired_or_invalid_tokens() -> Result<()> {
        let service = service();
        let expired = service.issue(Uuid::new_v4(), None, Some(-120), None)?;
        assert!(matches!(service.refresh(&expired)?, Refresh::Expired));
        assert!(matches!(service.refresh("garbage")?, Refresh::Invalid));
        Ok(())
    }
}
