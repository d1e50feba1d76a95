use anyhow::Result;
use async_trait::async_trait;
use campus_auth::gate::normalize_key;
use campus_auth::{CredentialRecord, PasswordHasher, PrincipalResolver};
use campus_core::manifest::USERS;
use campus_core::TenantContext;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::storage_error;
use crate::rows::decode_row;
use crate::upsert::UpsertEngine;

const LOOKUP: &str = r#"
SELECT u.*,
       u."password" AS "__password",
       s."code"     AS "__schoolCode",
       s."status"   AS "__schoolStatus"
FROM "users" AS u
LEFT JOIN "schools" AS s ON s."id" = u."schoolId"
WHERE lower(trim(u."email")) = ?1
ORDER BY u.rowid
"#;

/// Resolves login candidates from `users`, joined to their school.
pub struct SqlPrincipalResolver {
    pool: SqlitePool,
}

impl SqlPrincipalResolver {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn take_string(user: &mut serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match user.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl PrincipalResolver for SqlPrincipalResolver {
    async fn resolve_by_email(&self, email_key: &str) -> Result<Vec<CredentialRecord>> {
        let rows = sqlx::query(LOOKUP)
            .bind(email_key)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error(e, USERS.name))?;

        rows.iter()
            .map(|row| -> Result<CredentialRecord> {
                let mut user = decode_row(Some(&USERS), row)?;
                Ok(CredentialRecord {
                    password_hash: take_string(&mut user, "__password"),
                    school_code: take_string(&mut user, "__schoolCode"),
                    school_status: take_string(&mut user, "__schoolStatus"),
                    user,
                })
            })
            .collect()
    }
}

/// Make sure a super-admin with `email` exists. An existing account is left
/// untouched, so a password changed later is not reset on restart.
pub async fn ensure_super_admin(
    pool: &SqlitePool,
    engine: &UpsertEngine,
    hasher: &PasswordHasher,
    email: &str,
    password: &str,
) -> Result<bool> {
    let email_key = normalize_key(email);
    let existing: Option<(String,)> = sqlx::query_as(
        r#"SELECT "id" FROM "users" WHERE lower(trim("email")) = ?1 AND lower("role") = 'superadmin' LIMIT 1"#,
    )
    .bind(&email_key)
    .fetch_optional(pool)
    .await
    .map_err(|e| storage_error(e, USERS.name))?;

    if existing.is_some() {
        return Ok(false);
    }

    let record = json!({
        "name": "Super Admin",
        "email": email_key,
        "password": hasher.hash_password(password)?,
        "role": "SuperAdmin",
        "schoolId": null,
        "active": true,
    });
    engine.upsert(&USERS, &TenantContext::system(), vec![record]).await?;
    info!(email = %email_key, "auth.super_admin_provisioned");
    Ok(true)
}
