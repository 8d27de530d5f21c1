//! The storage boundary the [`crate::logger::AuditLogger`] flushes through.
//!
//! Production wiring supplies a Postgres-backed sink (see the `engine`
//! crate's `audit_sink` module, which adapts `db::repository::audit`);
//! tests use [`InMemorySink`].

use async_trait::async_trait;

use crate::error::AuditError;
use crate::model::{AuditEntry, AuditQuery};

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist a batch of entries in one transaction. Must not reorder or
    /// drop entries — partial failure should return an error so the caller
    /// re-queues the whole batch.
    async fn write_batch(&self, entries: &[AuditEntry]) -> Result<(), AuditError>;

    /// Paginated, newest-first query.
    async fn query(&self, filter: AuditQuery) -> Result<Vec<AuditEntry>, AuditError>;
}

/// A `Vec`-backed sink for unit/integration tests — no real storage.
#[derive(Default)]
pub struct InMemorySink {
    entries: tokio::sync::Mutex<Vec<AuditEntry>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemorySink {
    async fn write_batch(&self, entries: &[AuditEntry]) -> Result<(), AuditError> {
        self.entries.lock().await.extend_from_slice(entries);
        Ok(())
    }

    async fn query(&self, filter: AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        let all = self.entries.lock().await;
        let mut matched: Vec<AuditEntry> = all
            .iter()
            .filter(|e| {
                filter.execution_id.map_or(true, |id| e.execution_id == id)
                    && filter.workflow_id.map_or(true, |id| e.workflow_id == Some(id))
                    && filter
                        .tenant_id
                        .as_ref()
                        .map_or(true, |t| e.tenant_id.as_deref() == Some(t.as_str()))
                    && filter.start_date.map_or(true, |d| e.timestamp >= d)
                    && filter.end_date.map_or(true, |d| e.timestamp <= d)
                    && filter.event.as_ref().map_or(true, |ev| &e.event == ev)
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let limit = filter.limit.unwrap_or(100).max(0) as usize;
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }
}
