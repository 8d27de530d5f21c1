//! Secret repository functions.
//!
//! Encryption/decryption is the caller's responsibility (`engine::vault`);
//! rows here only ever carry ciphertext.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::SecretRow};

/// Upsert a single secret for a workflow, keyed by `key`.
pub async fn put_secret(
    pool: &PgPool,
    workflow_id: Uuid,
    key: &str,
    encrypted_value: &str,
) -> Result<SecretRow, DbError> {
    let row = sqlx::query_as!(
        SecretRow,
        r#"
        INSERT INTO secrets (id, workflow_id, key, encrypted_value)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (workflow_id, key) DO UPDATE SET encrypted_value = EXCLUDED.encrypted_value
        RETURNING id, workflow_id, key, encrypted_value
        "#,
        Uuid::new_v4(),
        workflow_id,
        key,
        encrypted_value,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch every secret scoped to a workflow.
pub async fn list_secrets(pool: &PgPool, workflow_id: Uuid) -> Result<Vec<SecretRow>, DbError> {
    let rows = sqlx::query_as!(
        SecretRow,
        r#"SELECT id, workflow_id, key, encrypted_value FROM secrets WHERE workflow_id = $1"#,
        workflow_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
