//! Buffered, chain-hashed, sanitizing audit logger.
//!
//! Entries are hashed the moment they're logged (so chain order matches
//! emission order even though writes are batched), buffered, and flushed
//! either periodically, once the buffer crosses a size threshold, or
//! immediately when the event name suggests a failure (§4.5).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::AuditError;
use crate::hash::{chain_hash, GENESIS_HASH};
use crate::model::{sanitize, AuditEntry, AuditQuery, NewAuditEntry};
use crate::sink::AuditSink;

/// Flush every 5 seconds, or once the buffer holds this many entries.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_BUFFER: usize = 100;

/// Consecutive flush failures before a `audit_backpressure` event is raised.
const BACKPRESSURE_THRESHOLD: u32 = 3;

struct State {
    buffer: VecDeque<AuditEntry>,
    /// Tail hash of each execution's chain, seeded with [`GENESIS_HASH`].
    chain_tails: HashMap<Uuid, String>,
}

pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
    state: Mutex<State>,
    max_buffer: usize,
    failure_count: AtomicU32,
    flush_task: Mutex<Option<JoinHandle<()>>>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Arc<Self> {
        Self::with_config(sink, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BUFFER)
    }

    pub fn with_config(sink: Arc<dyn AuditSink>, flush_interval: Duration, max_buffer: usize) -> Arc<Self> {
        let logger = Arc::new(Self {
            sink,
            state: Mutex::new(State {
                buffer: VecDeque::new(),
                chain_tails: HashMap::new(),
            }),
            max_buffer,
            failure_count: AtomicU32::new(0),
            flush_task: Mutex::new(None),
        });

        let background = Arc::clone(&logger);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(flush_interval);
            loop {
                interval.tick().await;
                if let Err(e) = background.flush().await {
                    warn!("periodic audit flush failed: {e}");
                }
            }
        });

        // Best-effort: stash the handle so `close` can abort it. We can't
        // await the mutex from sync code, so use try_lock — the logger has
        // just been constructed and nothing else holds it yet.
        if let Ok(mut guard) = logger.flush_task.try_lock() {
            *guard = Some(handle);
        }

        logger
    }

    /// Stamp, chain-hash, sanitize and buffer `entry`. Returns the fully
    /// computed [`AuditEntry`] so callers can correlate it with their own
    /// records. Forces an immediate flush when the event name contains
    /// "failed" or "error".
    pub async fn log(&self, entry: NewAuditEntry) -> AuditEntry {
        let forces_flush = entry.forces_flush();
        let timestamp = Utc::now();
        let sanitized_data = entry.data.as_ref().map(sanitize);

        let computed = {
            let mut state = self.state.lock().await;
            let previous_hash = state
                .chain_tails
                .get(&entry.execution_id)
                .cloned()
                .unwrap_or_else(|| GENESIS_HASH.to_string());

            let hash = chain_hash(&previous_hash, timestamp, &entry.event, sanitized_data.as_ref());

            let computed = AuditEntry {
                id: Uuid::new_v4(),
                timestamp,
                execution_id: entry.execution_id,
                workflow_id: entry.workflow_id,
                tenant_id: entry.tenant_id,
                event: entry.event,
                node_id: entry.node_id,
                node_name: entry.node_name,
                node_type: entry.node_type,
                duration_ms: entry.duration_ms,
                sanitized_data,
                actor_id: entry.actor_id,
                ip_address: entry.ip_address,
                previous_hash,
                hash: hash.clone(),
            };

            state.chain_tails.insert(entry.execution_id, hash);
            state.buffer.push_back(computed.clone());
            computed
        };

        let should_flush = forces_flush || {
            let state = self.state.lock().await;
            state.buffer.len() >= self.max_buffer
        };

        if should_flush {
            if let Err(e) = self.flush().await {
                error!("audit flush failed after forced-flush event: {e}");
            }
        }

        computed
    }

    /// Drain the buffer and write it in one batch. On failure, entries are
    /// re-prepended (preserving order) for the next attempt.
    pub async fn flush(&self) -> Result<(), AuditError> {
        let batch: Vec<AuditEntry> = {
            let mut state = self.state.lock().await;
            state.buffer.drain(..).collect()
        };

        if batch.is_empty() {
            return Ok(());
        }

        match self.sink.write_batch(&batch).await {
            Ok(()) => {
                self.failure_count.store(0, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.lock().await;
                for entry in batch.into_iter().rev() {
                    state.buffer.push_front(entry);
                }
                drop(state);

                let attempts = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                warn!("audit flush failed (attempt {attempts}): {e}");
                if attempts >= BACKPRESSURE_THRESHOLD {
                    error!(event = "audit_backpressure", attempts, "audit sink is backpressured; entries retained in memory");
                }
                Err(e)
            }
        }
    }

    pub async fn query(&self, filter: AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        self.sink.query(filter).await
    }

    /// Stop the background flush task and drain any buffered entries.
    pub async fn close(&self) -> Result<(), AuditError> {
        if let Some(handle) = self.flush_task.lock().await.take() {
            handle.abort();
        }
        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemorySink;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn chain_hash_links_consecutive_entries_for_one_execution() {
        let sink = Arc::new(InMemorySink::new());
        let logger = AuditLogger::with_config(sink.clone(), Duration::from_secs(3600), 1000);
        let exec_id = Uuid::new_v4();

        let e1 = logger.log(NewAuditEntry::new(exec_id, "execution_started")).await;
        let e2 = logger.log(NewAuditEntry::new(exec_id, "node_started").with_node("a", "A", "transform")).await;

        assert_eq!(e1.previous_hash, GENESIS_HASH);
        assert_eq!(e2.previous_hash, e1.hash);
        assert_ne!(e1.hash, e2.hash);
    }

    #[tokio::test]
    async fn failed_event_forces_immediate_flush() {
        let sink = Arc::new(InMemorySink::new());
        let logger = AuditLogger::with_config(sink.clone(), Duration::from_secs(3600), 1000);
        let exec_id = Uuid::new_v4();

        logger.log(NewAuditEntry::new(exec_id, "node_failed").with_data(json!({"reason": "boom"}))).await;

        // No manual flush() call — the forced flush inside log() should have
        // already persisted it.
        let stored = sink.all().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event, "node_failed");
    }

    #[tokio::test]
    async fn sensitive_fields_are_redacted_before_storage() {
        let sink = Arc::new(InMemorySink::new());
        let logger = AuditLogger::with_config(sink.clone(), Duration::from_secs(3600), 1000);
        let exec_id = Uuid::new_v4();

        logger
            .log(NewAuditEntry::new(exec_id, "node_completed").with_data(json!({"token": "abc123", "amount": 50})))
            .await;
        logger.flush().await.unwrap();

        let stored = sink.all().await;
        let data = stored[0].sanitized_data.as_ref().unwrap();
        assert_eq!(data["token"], json!("***REDACTED***"));
        assert_eq!(data["amount"], json!(50));
    }

    #[tokio::test]
    async fn query_filters_by_execution_and_orders_newest_first() {
        let sink = Arc::new(InMemorySink::new());
        let logger = AuditLogger::with_config(sink.clone(), Duration::from_secs(3600), 1000);
        let exec_a = Uuid::new_v4();
        let exec_b = Uuid::new_v4();

        logger.log(NewAuditEntry::new(exec_a, "execution_started")).await;
        logger.log(NewAuditEntry::new(exec_b, "execution_started")).await;
        logger.log(NewAuditEntry::new(exec_a, "execution_completed")).await;
        logger.flush().await.unwrap();

        let results = logger
            .query(AuditQuery { execution_id: Some(exec_a), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].event, "execution_completed");
        assert_eq!(results[1].event, "execution_started");
    }
}
