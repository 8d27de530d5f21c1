//! Audit log repository functions.
//!
//! Pure row-level storage; the `audit` crate's sanitization and hash-chain
//! logic runs upstream of here. `engine::audit_sink` bridges the two.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::AuditLogRow};

/// Insert a batch of audit entries in a single transaction, preserving order.
pub async fn insert_batch(pool: &PgPool, entries: &[AuditLogRow]) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    for entry in entries {
        sqlx::query!(
            r#"
            INSERT INTO audit_log
                (id, execution_id, workflow_id, tenant_id, event, node_id, node_name,
                 node_type, duration_ms, data, actor_id, ip_address, timestamp,
                 previous_hash, hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
            entry.id,
            entry.execution_id,
            entry.workflow_id,
            entry.tenant_id,
            entry.event,
            entry.node_id,
            entry.node_name,
            entry.node_type,
            entry.duration_ms,
            entry.data,
            entry.actor_id,
            entry.ip_address,
            entry.timestamp,
            entry.previous_hash,
            entry.hash,
        )
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Parameters accepted by [`query`]. All fields optional; `None` means
/// unfiltered on that dimension.
#[derive(Debug, Default, Clone)]
pub struct AuditLogFilter {
    pub execution_id: Option<Uuid>,
    pub workflow_id: Option<Uuid>,
    pub tenant_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub event: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Query audit entries, newest first, per `filter`.
pub async fn query(pool: &PgPool, filter: &AuditLogFilter) -> Result<Vec<AuditLogRow>, DbError> {
    let rows = sqlx::query_as!(
        AuditLogRow,
        r#"
        SELECT id, execution_id, workflow_id, tenant_id, event, node_id, node_name,
               node_type, duration_ms, data, actor_id, ip_address, timestamp,
               previous_hash, hash
        FROM audit_log
        WHERE ($1::uuid IS NULL OR execution_id = $1)
          AND ($2::uuid IS NULL OR workflow_id = $2)
          AND ($3::uuid IS NULL OR tenant_id = $3)
          AND ($4::timestamptz IS NULL OR timestamp >= $4)
          AND ($5::timestamptz IS NULL OR timestamp <= $5)
          AND ($6::text IS NULL OR event = $6)
        ORDER BY timestamp DESC
        LIMIT $7 OFFSET $8
        "#,
        filter.execution_id,
        filter.workflow_id,
        filter.tenant_id,
        filter.start_date,
        filter.end_date,
        filter.event,
        filter.limit,
        filter.offset,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
