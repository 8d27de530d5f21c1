//! Bridges `audit::AuditSink` onto the `db` crate's `audit_log` table.
//!
//! The `audit` crate already sanitizes and chain-hashes entries; this module
//! only translates its `AuditEntry` shape onto `db::models::AuditLogRow` and
//! back, and delegates storage to `db::repository::audit`.

use async_trait::async_trait;
use uuid::Uuid;

use audit::{AuditEntry, AuditError, AuditQuery, AuditSink};
use db::models::AuditLogRow;
use db::repository::audit::AuditLogFilter;
use db::DbPool;

pub struct PgAuditSink {
    pool: DbPool,
}

impl PgAuditSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn write_batch(&self, entries: &[AuditEntry]) -> Result<(), AuditError> {
        let rows: Vec<AuditLogRow> = entries.iter().map(to_row).collect();
        db::repository::audit::insert_batch(&self.pool, &rows)
            .await
            .map_err(|e| AuditError::Sink(e.to_string()))
    }

    async fn query(&self, filter: AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        let db_filter = AuditLogFilter {
            execution_id: filter.execution_id,
            workflow_id: filter.workflow_id,
            tenant_id: filter.tenant_id.as_deref().and_then(|t| Uuid::parse_str(t).ok()),
            start_date: filter.start_date,
            end_date: filter.end_date,
            event: filter.event,
            limit: filter.limit.unwrap_or(100),
            offset: filter.offset.unwrap_or(0),
        };

        let rows = db::repository::audit::query(&self.pool, &db_filter)
            .await
            .map_err(|e| AuditError::Sink(e.to_string()))?;

        Ok(rows.into_iter().map(from_row).collect())
    }
}

fn to_row(entry: &AuditEntry) -> AuditLogRow {
    AuditLogRow {
        id: entry.id,
        execution_id: Some(entry.execution_id),
        workflow_id: entry.workflow_id,
        tenant_id: entry.tenant_id.as_deref().and_then(|t| Uuid::parse_str(t).ok()),
        event: entry.event.clone(),
        node_id: entry.node_id.clone(),
        node_name: entry.node_name.clone(),
        node_type: entry.node_type.clone(),
        duration_ms: entry.duration_ms,
        data: entry.sanitized_data.clone(),
        actor_id: entry.actor_id.clone(),
        ip_address: entry.ip_address.clone(),
        timestamp: entry.timestamp,
        previous_hash: entry.previous_hash.clone(),
        hash: entry.hash.clone(),
    }
}

fn from_row(row: AuditLogRow) -> AuditEntry {
    AuditEntry {
        id: row.id,
        timestamp: row.timestamp,
        execution_id: row.execution_id.unwrap_or_default(),
        workflow_id: row.workflow_id,
        tenant_id: row.tenant_id.map(|t| t.to_string()),
        event: row.event,
        node_id: row.node_id,
        node_name: row.node_name,
        node_type: row.node_type,
        duration_ms: row.duration_ms,
        sanitized_data: row.data,
        actor_id: row.actor_id,
        ip_address: row.ip_address,
        previous_hash: row.previous_hash,
        hash: row.hash,
    }
}
