//! The `NodeHandler` trait — the contract every node type must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::registry::NodeCategory;
use crate::NodeError;

/// Shared context passed to every node during execution.
///
/// Defined here (in the nodes crate) so both the engine and individual node
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// ID of the parent workflow.
    pub workflow_id: uuid::Uuid,
    /// ID of the current execution run.
    pub execution_id: uuid::Uuid,
    /// ID of the tenant the execution belongs to.
    pub tenant_id: uuid::Uuid,
    /// Initial input supplied when the execution was triggered.
    pub input: Value,
    /// Decrypted secrets scoped to this workflow.
    pub secrets: std::collections::HashMap<String, String>,
    /// Workflow-scoped variables set by `set_variable` nodes earlier in the run.
    pub variables: std::collections::HashMap<String, Value>,
    /// Every prior node's output, keyed by node ID, for `$nodes.<id>.<field>` resolution.
    pub node_outputs: std::collections::HashMap<String, Value>,
    /// Connection pool for nodes that need read-only database access
    /// (`database_query`). `None` in contexts with no database configured,
    /// e.g. most unit tests.
    pub db_pool: Option<db::DbPool>,
}

/// The core node trait. All built-in and plugin node types implement this.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// The unique type tag this handler registers under, e.g. `"http_request"`.
    fn node_type(&self) -> &'static str;

    /// Which built-in group this node belongs to; purely descriptive, used
    /// by the registry's `list_by_category` and the API's node-catalog route.
    fn category(&self) -> NodeCategory;

    /// One-line human description surfaced in the node catalog.
    fn description(&self) -> &'static str;

    /// Validate a node's configuration at workflow-save time, before any
    /// execution is attempted. Default accepts anything; handlers with a
    /// required shape should override this.
    fn validate(&self, _config: &Value) -> Result<(), NodeError> {
        Ok(())
    }

    /// Execute the node. `inputs` is the upstream node's JSON output (or the
    /// triggering payload for a start node); `config` is this node's static
    /// configuration as authored in the workflow definition.
    async fn execute(
        &self,
        inputs: Value,
        config: &Value,
        ctx: &ExecutionContext,
    ) -> Result<Value, NodeError>;
}
