//! Secret resolution for node configuration (`$secrets.NAME` references).
//!
//! Secrets are stored in the `secrets` table as base64-encoded ciphertext
//! (`db::models::SecretRow::encrypted_value`). The encryption scheme itself
//! is out of scope here (spec Open Question: "what encrypts the value before
//! it reaches this table" is left to a KMS-backed layer in front of the
//! API); this module only decodes what the row already carries and exposes
//! it to node execution through the [`SecretResolver`] trait, so the engine
//! never has to know whether secrets live in Postgres, Vault, or anywhere
//! else.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine as _;
use thiserror::Error;
use uuid::Uuid;

use db::DbPool;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("secret '{0}' is not valid base64")]
    Malformed(String),

    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}

/// Resolves named secrets for a workflow at execution time.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn get_secret(&self, workflow_id: Uuid, name: &str) -> Result<String, VaultError>;
}

/// Reads secrets from the `secrets` table, decoding the stored base64
/// ciphertext. Caches nothing — callers execute infrequently enough (once
/// per node that references `$secrets`) that a per-call query is fine.
pub struct DbSecretResolver {
    pool: DbPool,
}

impl DbSecretResolver {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SecretResolver for DbSecretResolver {
    async fn get_secret(&self, workflow_id: Uuid, name: &str) -> Result<String, VaultError> {
        let rows = db::repository::secrets::list_secrets(&self.pool, workflow_id).await?;
        let row = rows
            .into_iter()
            .find(|r| r.key == name)
            .ok_or_else(|| VaultError::NotFound(name.to_string()))?;

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(row.encrypted_value.as_bytes())
            .map_err(|_| VaultError::Malformed(name.to_string()))?;

        String::from_utf8(decoded).map_err(|_| VaultError::Malformed(name.to_string()))
    }
}

/// Resolve every `$secrets.*` reference a set of node configs might need,
/// up front, so a single failed lookup surfaces before any node runs.
pub async fn resolve_all(
    resolver: &dyn SecretResolver,
    workflow_id: Uuid,
    names: &[String],
) -> Result<HashMap<String, String>, VaultError> {
    let mut out = HashMap::with_capacity(names.len());
    for name in names {
        let value = resolver.get_secret(workflow_id, name).await?;
        out.insert(name.clone(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeResolver(HashMap<String, String>);

    #[async_trait]
    impl SecretResolver for FakeResolver {
        async fn get_secret(&self, _workflow_id: Uuid, name: &str) -> Result<String, VaultError> {
            self.0.get(name).cloned().ok_or_else(|| VaultError::NotFound(name.to_string()))
        }
    }

    #[tokio::test]
    async fn resolve_all_collects_every_name() {
        let mut known = HashMap::new();
        known.insert("api_key".to_string(), "s3cr3t".to_string());
        known.insert("db_password".to_string(), "hunter2".to_string());
        let resolver = FakeResolver(known);

        let resolved = resolve_all(&resolver, Uuid::new_v4(), &["api_key".to_string(), "db_password".to_string()])
            .await
            .unwrap();

        assert_eq!(resolved["api_key"], "s3cr3t");
        assert_eq!(resolved["db_password"], "hunter2");
    }

    #[tokio::test]
    async fn resolve_all_fails_fast_on_missing_secret() {
        let resolver = FakeResolver(HashMap::new());
        let err = resolve_all(&resolver, Uuid::new_v4(), &["missing".to_string()]).await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound(name) if name == "missing"));
    }
}
