//! Password hashing with Argon2id.
//!
//! Hashes are salted PHC strings; verification is constant-time inside the
//! verifier. Plain comparison of stored material is never performed.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};

pub(super) fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| anyhow!("failed to hash password: {err}"))
}

/// Verify a password against a stored PHC hash.
///
/// `Ok(false)` is a mismatch; `Err` means the stored hash is malformed,
/// which is an internal failure, not a bad password.
pub(super) fn verify_password(plain: &str, stored: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|err| anyhow!("malformed stored password hash: {err}"))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(anyhow!("failed to verify password: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password};
    use anyhow::Result;

    #[test]
    fn hash_verifies_and_is_not_the_plaintext() -> Result<()> {
        let hash = hash_password("correct horse")?;
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash)?);
        assert!(!verify_password("wrong horse", &hash)?);
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash_password("same password")?;
        let second = hash_password("same password")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn malformed_stored_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
