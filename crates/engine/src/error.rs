//! Engine-level error types.

use thiserror::Error;

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// An edge references a node ID that doesn't exist in the workflow.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference {
        node_id: String,
        side: &'static str,
    },

    /// Topological sort detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    // ------ Execution errors ------

    /// A node failed with a fatal error; the whole execution is aborted.
    #[error("node '{node_id}' failed fatally: {message}")]
    NodeFatal {
        node_id: String,
        message: String,
    },

    /// A node's retryable error was exhausted.
    #[error("node '{node_id}' exceeded retry limit: {message}")]
    NodeRetryExhausted {
        node_id: String,
        message: String,
    },

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    /// A node's configuration contains an invalid expression.
    #[error("invalid expression in node '{node_id}': {source}")]
    InvalidExpression {
        node_id: String,
        #[source]
        source: nodes::expr::ExpressionError,
    },

    /// A node timed out before completing.
    #[error("node '{node_id}' timed out after {timeout_ms}ms")]
    NodeTimeout { node_id: String, timeout_ms: u64 },

    /// A declared, required input port could not be resolved — either its
    /// `source` pointed at a node/output pair that never produced a value,
    /// or no binding was given and no predecessor output was available.
    #[error("node '{node_id}' is missing required input '{input}'")]
    MissingRequiredInput { node_id: String, input: String },

    /// AI verification rejected a node's output in strict mode.
    #[error("node '{node_id}' failed AI verification: {message}")]
    VerificationRejected { node_id: String, message: String },

    /// Execution was cancelled mid-flight.
    #[error("execution '{0}' was cancelled")]
    Cancelled(uuid::Uuid),

    /// Total wall-clock budget for the execution was exceeded.
    #[error("execution '{0}' exceeded its maximum execution time")]
    ExecutionTimedOut(uuid::Uuid),

    /// A `human_approval` node suspended the execution; not itself a
    /// failure — callers should persist the checkpoint and return.
    #[error("execution '{execution_id}' suspended pending approval of node '{node_id}'")]
    ApprovalRequired { execution_id: uuid::Uuid, node_id: String },

    /// A human reviewer rejected a pending approval.
    #[error("node '{node_id}' was rejected by reviewer: {reason}")]
    ApprovalRejected { node_id: String, reason: String },

    /// `resume_from_approval` was called for an execution with no pending
    /// approval gate.
    #[error("execution '{0}' has no pending approval to resume from")]
    NoPendingApproval(uuid::Uuid),

    /// Secret vault lookup failed.
    #[error("secret resolution error: {0}")]
    Vault(#[from] crate::vault::VaultError),

    /// Audit sink failed to persist an entry.
    #[error("audit error: {0}")]
    Audit(#[from] audit::AuditError),

    /// The engine has reached `max_concurrent_executions` and cannot accept
    /// new work right now.
    #[error("engine is at capacity ({max_concurrent} concurrent executions)")]
    EngineBusy { max_concurrent: usize },
}
