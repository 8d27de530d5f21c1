//! Tuning knobs for the [`super::Engine`].

use std::time::Duration;

/// Engine-wide configuration, independent of any single workflow's
/// [`crate::models::WorkflowSettings`] (which tune per-workflow retry/
/// timeout/parallelism defaults).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard ceiling on executions running at once across the whole engine.
    /// Enforced by a [`tokio::sync::Semaphore`].
    pub max_concurrent_executions: usize,
    /// Default per-node timeout when a workflow doesn't set its own.
    pub default_node_timeout: Duration,
    /// How often an in-flight execution's progress is checkpointed.
    pub checkpoint_interval: Duration,
    /// Capacity of the best-effort event channel. Events are dropped, not
    /// buffered unboundedly, once this fills up.
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_executions: 50,
            default_node_timeout: Duration::from_secs(30),
            checkpoint_interval: Duration::from_secs(5),
            event_buffer: 1024,
        }
    }
}
