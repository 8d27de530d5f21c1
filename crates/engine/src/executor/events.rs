//! Best-effort event emission for observers (dashboards, the API's SSE
//! endpoint, CLI progress bars) — never allowed to slow down or fail an
//! execution.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    ExecutionStarted { execution_id: Uuid, workflow_id: Uuid },
    NodeStarted { execution_id: Uuid, node_id: String },
    NodeSkipped { execution_id: Uuid, node_id: String },
    NodeCompleted { execution_id: Uuid, node_id: String, duration_ms: i64 },
    NodeFailed { execution_id: Uuid, node_id: String, message: String },
    ExecutionSuspended { execution_id: Uuid, node_id: String },
    ExecutionSucceeded { execution_id: Uuid },
    ExecutionFailed { execution_id: Uuid, message: String },
    ExecutionCancelled { execution_id: Uuid },
}

/// A sink for [`EngineEvent`]s. Implementations must not block or fail the
/// execution that raised the event — swallow errors internally.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: EngineEvent);
}

/// An [`EventSink`] that forwards onto a bounded `mpsc` channel the host
/// drains at its own pace. Full channel ⇒ the event is dropped with a
/// `warn!`, never blocks the caller.
pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    /// Returns the sink plus the receiving half for the host to drain.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: EngineEvent) {
        if self.tx.try_send(event).is_err() {
            warn!("event channel full or closed; dropping engine event");
        }
    }
}

/// A sink that discards every event. Useful as a default when no observer
/// is wired up.
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn emit(&self, _event: EngineEvent) {}
}
