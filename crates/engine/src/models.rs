//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like
//! in memory.  They can be serialised to/from the JSONB `definition`
//! column of the `workflows` table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// How a workflow is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Triggered by an incoming HTTP request to `/webhook/{path}`.
    Webhook {
        /// URL path segment that identifies this workflow.
        path: String,
    },
    /// Triggered manually via the REST API.
    Manual,
    /// Triggered on a cron schedule.
    Cron {
        /// Standard cron expression (5 fields).
        expression: String,
    },
}

// ---------------------------------------------------------------------------
// Ports / data types / classification
// ---------------------------------------------------------------------------

/// Declared type of a node's input or output port. Purely descriptive —
/// the engine never coerces a value to match, it's surfaced to authors and
/// carried into the node catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
    File,
    Any,
}

fn default_true() -> bool {
    true
}

/// An input a node declares it needs. `source`, when present, binds it to
/// an upstream node's output as `"<nodeId>.<outputName>"`; unbound required
/// inputs fall back to the node's resolved predecessor input (see
/// `executor::resolve_inputs`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputPort {
    pub name: String,
    #[serde(default = "default_data_type")]
    pub data_type: DataType,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn default_data_type() -> DataType {
    DataType::Any
}

impl Default for DataType {
    fn default() -> Self {
        Self::Any
    }
}

/// An output a node promises to produce, addressable by downstream
/// `InputPort::source` bindings as `"<thisNodeId>.<name>"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputPort {
    pub name: String,
    #[serde(default = "default_data_type")]
    pub data_type: DataType,
}

/// How thoroughly a node's lifecycle is recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    None,
    Standard,
    Detailed,
}

impl Default for AuditLevel {
    fn default() -> Self {
        Self::Standard
    }
}

/// Sensitivity tag carried into audit entries so reviewers can triage by
/// data class without re-deriving it from a node's config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataClassification {
    Public,
    Internal,
    Confidential,
    Restricted,
}

impl Default for DataClassification {
    fn default() -> Self {
        Self::Internal
    }
}

// ---------------------------------------------------------------------------
// NodeDefinition
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Maps to a registered `ExecutableNode` implementation.
    pub node_type: String,
    /// Arbitrary configuration passed to the node at execution time.
    pub config: Value,
    #[serde(default)]
    pub input_ports: Vec<InputPort>,
    #[serde(default)]
    pub output_ports: Vec<OutputPort>,
    /// Expression evaluated against variables and prior node outputs before
    /// this node is dispatched. A falsy result skips execution entirely —
    /// the node is marked `completed` without running its handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Overrides `WorkflowSettings::retry_defaults` for this node only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
    /// AI-verification config applied to this node's output, in the shape
    /// `executor::node_exec::verify_output` understands. `None` skips
    /// verification entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_verification: Option<Value>,
    #[serde(default)]
    pub audit_level: AuditLevel,
    #[serde(default)]
    pub data_classification: DataClassification,
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Directed edge from one node to another.
///
/// `condition` is normally `None` (unconditional edge). The sentinel value
/// `"$error"` marks the edge as an error-handling path: it is the only
/// outgoing edge considered when `from` fails, and is otherwise ignored.
///
/// `source_output`/`target_input` record which named port on each side this
/// edge wires together; they're optional because a node with no declared
/// ports falls back to the legacy whole-output predecessor resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_input: Option<String>,
}

impl Edge {
    pub const ERROR_CONDITION: &'static str = "$error";

    pub fn is_error_edge(&self) -> bool {
        self.condition.as_deref() == Some(Self::ERROR_CONDITION)
    }
}

// ---------------------------------------------------------------------------
// WorkflowSettings / RetryPolicy
// ---------------------------------------------------------------------------

/// Exponential back-off policy applied to a node's `Retryable` errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay_ms: 100, backoff_multiplier: 2.0, max_delay_ms: 30_000 }
    }
}

/// Workflow-level execution settings, authored alongside nodes/edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    pub default_timeout_ms: u64,
    #[serde(default)]
    pub retry_defaults: RetryPolicy,
    /// Maximum number of nodes allowed to run concurrently within one wave.
    pub parallelism: usize,
    pub timezone: String,
    pub max_execution_time_ms: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            retry_defaults: RetryPolicy::default(),
            parallelism: 16,
            timezone: "UTC".to_string(),
            max_execution_time_ms: 3_600_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Lifecycle state of a workflow definition, independent of any single
/// execution's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Paused,
    Archived,
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    pub nodes: Vec<NodeDefinition>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub settings: WorkflowSettings,
    /// Declared variable defaults, seeded into the execution's variable map
    /// before the first wave runs; referenced in expressions/templates as
    /// `$variables.<name>`.
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Names of secrets this workflow needs, resolved from the vault by
    /// name rather than handing every node every secret the tenant owns.
    #[serde(default)]
    pub credentials: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub compliance_flags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// Convenience constructor for testing.
    pub fn new(
        name: impl Into<String>,
        trigger: Trigger,
        nodes: Vec<NodeDefinition>,
        edges: Vec<Edge>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: name.into(),
            version: Some(1),
            status: WorkflowStatus::Draft,
            triggers: vec![trigger],
            nodes,
            edges,
            settings: WorkflowSettings::default(),
            variables: HashMap::new(),
            credentials: Vec::new(),
            category: None,
            tags: Vec::new(),
            compliance_flags: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
