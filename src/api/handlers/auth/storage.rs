//! Database helpers for credentials, attempt ledgers, and recovery codes.
//!
//! Every query resolves its table names through a [`Directory`] so the same
//! code paths serve both admin and portal-user principals.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::principal::Directory;

/// Credential row joined with its owning principal.
pub(super) struct CredentialRecord {
    pub(super) principal_id: Uuid,
    pub(super) tenant_id: Option<Uuid>,
    pub(super) password_hash: String,
    pub(super) credential_active: bool,
    pub(super) principal_active: bool,
}

/// Minimal principal fields needed for the recovery flow.
pub(super) struct PrincipalRecord {
    pub(super) id: Uuid,
    pub(super) is_active: bool,
}

/// Look up a credential and its principal by username.
pub(super) async fn lookup_credential(
    pool: &PgPool,
    dir: &Directory,
    username: &str,
) -> Result<Option<CredentialRecord>> {
    let query = format!(
        r"
        SELECT c.principal_id,
               p.tenant_id,
               c.password_hash,
               c.is_active AS credential_active,
               p.is_active AS principal_active
        FROM {credentials} c
        JOIN {principals} p ON p.id = c.principal_id
        WHERE c.username = $1
        LIMIT 1
    ",
        credentials = dir.credentials(),
        principals = dir.principals(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup credential")?;

    Ok(row.map(|row| CredentialRecord {
        principal_id: row.get("principal_id"),
        tenant_id: row.get("tenant_id"),
        password_hash: row.get("password_hash"),
        credential_active: row.get("credential_active"),
        principal_active: row.get("principal_active"),
    }))
}

/// Outcomes of the most recent login attempts for a (principal, source ip)
/// pair, newest first. Attempts with an unknown source only match an unknown
/// source.
pub(super) async fn recent_attempts(
    pool: &PgPool,
    dir: &Directory,
    principal_id: Uuid,
    ip_address: Option<&str>,
    window: i64,
) -> Result<Vec<bool>> {
    let query = format!(
        r"
        SELECT was_successful
        FROM {attempts}
        WHERE principal_id = $1
          AND ip_address IS NOT DISTINCT FROM $2
        ORDER BY created_at DESC, id DESC
        LIMIT $3
    ",
        attempts = dir.login_attempts(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(principal_id)
        .bind(ip_address)
        .bind(window)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to fetch recent login attempts")?;

    Ok(rows
        .into_iter()
        .map(|row| row.get("was_successful"))
        .collect())
}

/// Record a login attempt in the ledger.
pub(super) async fn insert_attempt(
    pool: &PgPool,
    dir: &Directory,
    principal_id: Uuid,
    ip_address: Option<&str>,
    was_successful: bool,
) -> Result<()> {
    let query = format!(
        r"
        INSERT INTO {attempts} (principal_id, ip_address, was_successful)
        VALUES ($1, $2, $3)
    ",
        attempts = dir.login_attempts(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    sqlx::query(&query)
        .bind(principal_id)
        .bind(ip_address)
        .bind(was_successful)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert login attempt")?;
    Ok(())
}

/// Record a successful sign-in in the history table.
pub(super) async fn insert_history(
    pool: &PgPool,
    dir: &Directory,
    principal_id: Uuid,
    ip_address: Option<&str>,
) -> Result<()> {
    let query = format!(
        r"
        INSERT INTO {history} (principal_id, ip_address)
        VALUES ($1, $2)
    ",
        history = dir.login_history(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    sqlx::query(&query)
        .bind(principal_id)
        .bind(ip_address)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert login history")?;
    Ok(())
}

/// Whether the source address currently carries an active flag.
pub(super) async fn active_flag(pool: &PgPool, dir: &Directory, ip_address: &str) -> Result<bool> {
    let query = format!(
        r"
        SELECT 1
        FROM {flagged}
        WHERE ip_address = $1
          AND is_flagged = TRUE
          AND (flagged_until IS NULL OR flagged_until > NOW())
        LIMIT 1
    ",
        flagged = dir.flagged_ips(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(ip_address)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check flagged ip")?;
    Ok(row.is_some())
}

/// Flag a source address for a principal. A no-op when an active flag
/// already exists for the pair.
pub(super) async fn flag_ip(
    pool: &PgPool,
    dir: &Directory,
    principal_id: Uuid,
    ip_address: &str,
    reason: &str,
) -> Result<()> {
    let query = format!(
        r"
        INSERT INTO {flagged} (principal_id, ip_address, reason, is_flagged)
        SELECT $1, $2, $3, TRUE
        WHERE NOT EXISTS (
            SELECT 1
            FROM {flagged}
            WHERE principal_id IS NOT DISTINCT FROM $1
              AND ip_address = $2
              AND is_flagged = TRUE
              AND (flagged_until IS NULL OR flagged_until > NOW())
        )
    ",
        flagged = dir.flagged_ips(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    sqlx::query(&query)
        .bind(principal_id)
        .bind(ip_address)
        .bind(reason)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to flag ip")?;
    Ok(())
}

/// Look up a principal by normalized email for account recovery.
pub(super) async fn lookup_principal_by_email(
    pool: &PgPool,
    dir: &Directory,
    email: &str,
) -> Result<Option<PrincipalRecord>> {
    let query = format!(
        r"
        SELECT id, is_active
        FROM {principals}
        WHERE email = $1
        LIMIT 1
    ",
        principals = dir.principals(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup principal by email")?;

    Ok(row.map(|row| PrincipalRecord {
        id: row.get("id"),
        is_active: row.get("is_active"),
    }))
}

/// Store a fresh one-time password, retiring any still-valid predecessor.
pub(super) async fn issue_otp(
    pool: &PgPool,
    dir: &Directory,
    principal_id: Uuid,
    code: &str,
    ttl_seconds: i64,
) -> Result<()> {
    // Invalidation and insertion happen in one transaction so at most one
    // code is redeemable per principal at any time.
    let mut tx = pool.begin().await.context("begin otp transaction")?;

    let query = format!(
        r"
        UPDATE {otps}
        SET is_used = TRUE
        WHERE principal_id = $1
          AND is_used = FALSE
    ",
        otps = dir.one_time_passwords(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    sqlx::query(&query)
        .bind(principal_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to retire previous otps")?;

    let query = format!(
        r"
        INSERT INTO {otps} (principal_id, code, expires_at)
        VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
    ",
        otps = dir.one_time_passwords(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    sqlx::query(&query)
        .bind(principal_id)
        .bind(code)
        .bind(ttl_seconds)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert otp")?;

    tx.commit().await.context("commit otp transaction")?;
    Ok(())
}

/// The principal's authoritative (most recently issued) OTP row, with expiry
/// evaluated against the database clock.
pub(super) struct OtpRecord {
    pub(super) code: String,
    pub(super) is_used: bool,
    pub(super) expired: bool,
}

pub(super) async fn latest_otp(
    pool: &PgPool,
    dir: &Directory,
    principal_id: Uuid,
) -> Result<Option<OtpRecord>> {
    let query = format!(
        r"
        SELECT code, is_used, (expires_at <= NOW()) AS expired
        FROM {otps}
        WHERE principal_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT 1
    ",
        otps = dir.one_time_passwords(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(principal_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to fetch latest otp")?;

    Ok(row.map(|row| OtpRecord {
        code: row.get("code"),
        is_used: row.get("is_used"),
        expired: row.get("expired"),
    }))
}

/// Outcome of a password rotation.
#[derive(Debug)]
pub(super) enum PasswordChangeOutcome {
    Changed,
    NoActiveCredential,
}

/// Rotate the active credential's password and redeem the principal's codes.
/// Historical (inactive) credential rows are never touched.
pub(super) async fn apply_password_change(
    pool: &PgPool,
    dir: &Directory,
    principal_id: Uuid,
    password_hash: &str,
) -> Result<PasswordChangeOutcome> {
    // The hash swap and code redemption commit together so a used code can
    // never be replayed against the new password.
    let mut tx = pool.begin().await.context("begin password transaction")?;

    let query = format!(
        r"
        UPDATE {credentials}
        SET password_hash = $2,
            password_changed_at = NOW(),
            must_change_password = FALSE
        WHERE principal_id = $1
          AND is_active = TRUE
    ",
        credentials = dir.credentials(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let result = sqlx::query(&query)
        .bind(principal_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    // Nothing to rotate: leave the codes untouched so the caller can refuse.
    if result.rows_affected() == 0 {
        let _ = tx.rollback().await;
        return Ok(PasswordChangeOutcome::NoActiveCredential);
    }

    let query = format!(
        r"
        UPDATE {otps}
        SET is_used = TRUE
        WHERE principal_id = $1
          AND is_used = FALSE
    ",
        otps = dir.one_time_passwords(),
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    sqlx::query(&query)
        .bind(principal_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to redeem otps")?;

    tx.commit().await.context("commit password transaction")?;
    Ok(PasswordChangeOutcome::Changed)
}

#[cfg(test)]
mod tests {
    use super::{CredentialRecord, PasswordChangeOutcome, PrincipalRecord};
    use uuid::Uuid;

    #[test]
    fn password_change_outcome_debug_names() {
        assert_eq!(format!("{:?}", PasswordChangeOutcome::Changed), "Changed");
        assert_eq!(
            format!("{:?}", PasswordChangeOutcome::NoActiveCredential),
            "NoActiveCredential"
        );
    }

    #[test]
    fn credential_record_holds_values() {
        let record = CredentialRecord {
            principal_id: Uuid::nil(),
            tenant_id: None,
            password_hash: "$argon2id$...".to_string(),
            credential_active: true,
            principal_active: false,
        };
        assert_eq!(record.principal_id, Uuid::nil());
        assert!(record.tenant_id.is_none());
        assert!(record.credential_active);
        assert!(!record.principal_active);
    }

    #[test]
    fn principal_record_holds_values() {
        let record = PrincipalRecord {
            id: Uuid::nil(),
            is_active: true,
        };
        assert_eq!(record.id, Uuid::nil());
        assert!(record.is_active);
    }
}
