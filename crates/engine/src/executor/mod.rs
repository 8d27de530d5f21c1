//! The workflow engine: wave-parallel scheduling over a validated DAG, with
//! retry, AI-verification gating, tamper-evident audit emission,
//! human-approval suspension, checkpointing and cancellation.
//!
//! Replaces the teacher's sequential `WorkflowExecutor::run` (a single
//! linear pass over `validate_dag`'s flat order) with wave scheduling:
//! nodes whose dependencies are all satisfied run together via
//! `futures::future::join_all`; waves themselves run strictly in order.

pub mod approval;
pub mod checkpoint;
pub mod config;
pub mod events;
pub mod graph;
pub mod node_exec;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{watch, Mutex, Semaphore};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use audit::{AuditLogger, NewAuditEntry};
use db::DbPool;
use nodes::expr::{evaluate, ExpressionContext};
use nodes::traits::ExecutionContext;
use nodes::NodeRegistry;

use crate::models::{Edge, NodeDefinition, Workflow};
use crate::vault::SecretResolver;
use crate::EngineError;

pub use config::EngineConfig;
pub use events::{ChannelEventSink, EngineEvent, EventSink, NullEventSink};

use checkpoint::Checkpoint;

/// Outcome of a completed (or suspended) workflow execution.
#[derive(Debug)]
pub struct ExecutionResult {
    pub execution_id: Uuid,
    pub suspended: bool,
    pub node_outputs: HashMap<String, Value>,
}

/// Per-node result inside a wave, before the engine decides whether it
/// blocks the rest of the execution.
enum NodeRunOutcome {
    Success { node_id: String, output: Value },
    HandledFailure { node_id: String },
    FatalFailure { node_id: String, error: EngineError },
}

pub struct Engine {
    pool: DbPool,
    registry: Arc<NodeRegistry>,
    audit: Arc<AuditLogger>,
    vault: Arc<dyn SecretResolver>,
    events: Arc<dyn EventSink>,
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
    cancellations: Mutex<HashMap<Uuid, watch::Sender<bool>>>,
}

impl Engine {
    pub fn new(
        pool: DbPool,
        registry: Arc<NodeRegistry>,
        audit: Arc<AuditLogger>,
        vault: Arc<dyn SecretResolver>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_executions));
        Arc::new(Self { pool, registry, audit, vault, events, config, semaphore, cancellations: Mutex::new(HashMap::new()) })
    }

    /// Signal cooperative cancellation for an in-flight execution. A no-op
    /// if the execution isn't currently running on this engine instance.
    pub async fn cancel(&self, execution_id: Uuid) {
        if let Some(tx) = self.cancellations.lock().await.get(&execution_id) {
            let _ = tx.send(true);
        }
    }

    /// Resume a suspended execution after its pending approval has been
    /// decided. Re-runs the engine from the checkpoint it suspended at.
    pub async fn resume_from_approval(&self, workflow: &Workflow, execution_id: Uuid) -> Result<ExecutionResult, EngineError> {
        self.run_execution(workflow, execution_id, Value::Null).await
    }

    /// Continue an already-created execution (its `workflow_executions` row
    /// already exists — e.g. pre-created by the API alongside a
    /// `job_queue` entry) from its last checkpoint. For a freshly enqueued
    /// job the checkpoint is empty, so this simply runs it from the start;
    /// the same code path serves both the queue worker and approval resume.
    pub async fn run_execution(&self, workflow: &Workflow, execution_id: Uuid, initial_input: Value) -> Result<ExecutionResult, EngineError> {
        let _permit = self
            .semaphore
            .try_acquire()
            .map_err(|_| EngineError::EngineBusy { max_concurrent: self.config.max_concurrent_executions })?;

        let execution = db::repository::executions::get_execution(&self.pool, execution_id).await?;
        let checkpoint = execution.checkpoint.as_ref().map(Checkpoint::from_json).unwrap_or_default();
        self.run(workflow, execution_id, execution.tenant_id, initial_input, checkpoint).await
    }

    /// Validate and run `workflow` from a clean slate.
    #[instrument(skip(self, workflow, initial_input), fields(workflow_id = %workflow.id))]
    pub async fn execute(&self, workflow: &Workflow, initial_input: Value) -> Result<ExecutionResult, EngineError> {
        let _permit = self
            .semaphore
            .try_acquire()
            .map_err(|_| EngineError::EngineBusy { max_concurrent: self.config.max_concurrent_executions })?;

        graph::build_waves(workflow)?;

        let execution = db::repository::executions::create_execution(&self.pool, workflow.id, workflow.tenant_id).await?;

        self.audit
            .log(NewAuditEntry::new(execution.id, "execution_started").with_workflow(workflow.id).with_tenant(workflow.tenant_id.to_string()))
            .await;
        self.events
            .emit(EngineEvent::ExecutionStarted { execution_id: execution.id, workflow_id: workflow.id })
            .await;

        self.run(workflow, execution.id, workflow.tenant_id, initial_input, Checkpoint::default()).await
    }

    async fn run(
        &self,
        workflow: &Workflow,
        execution_id: Uuid,
        tenant_id: Uuid,
        initial_input: Value,
        mut checkpoint: Checkpoint,
    ) -> Result<ExecutionResult, EngineError> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancellations.lock().await.insert(execution_id, cancel_tx);

        let result = self.run_inner(workflow, execution_id, tenant_id, initial_input, &mut checkpoint, cancel_rx).await;

        self.cancellations.lock().await.remove(&execution_id);

        match &result {
            Ok(r) if r.suspended => {}
            Ok(_) => {
                db::repository::executions::update_execution_status(&self.pool, execution_id, "succeeded", true).await?;
                self.audit.log(NewAuditEntry::new(execution_id, "execution_completed")).await;
                self.events.emit(EngineEvent::ExecutionSucceeded { execution_id }).await;
                info!(%execution_id, "execution succeeded");
            }
            Err(EngineError::Cancelled(_)) => {
                db::repository::executions::update_execution_status(&self.pool, execution_id, "failed", true).await?;
                self.events.emit(EngineEvent::ExecutionCancelled { execution_id }).await;
            }
            Err(e) => {
                db::repository::executions::update_execution_status(&self.pool, execution_id, "failed", true).await?;
                self.audit
                    .log(NewAuditEntry::new(execution_id, "execution_failed").with_data(serde_json::json!({"error": e.to_string()})))
                    .await;
                self.events.emit(EngineEvent::ExecutionFailed { execution_id, message: e.to_string() }).await;
            }
        }

        result
    }

    async fn run_inner(
        &self,
        workflow: &Workflow,
        execution_id: Uuid,
        tenant_id: Uuid,
        initial_input: Value,
        checkpoint: &mut Checkpoint,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> Result<ExecutionResult, EngineError> {
        let waves = graph::build_waves(workflow)?;
        let node_map: HashMap<&str, &NodeDefinition> = workflow.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let g = graph::Graph::build(workflow);

        let mut node_outputs = std::mem::take(&mut checkpoint.node_outputs);
        let mut completed: std::collections::HashSet<String> = checkpoint.completed.iter().cloned().collect();
        let mut failed_handled: std::collections::HashSet<String> = checkpoint.failed_handled.iter().cloned().collect();
        let mut variables = checkpoint.variables.clone();

        for wave in &waves {
            if *cancel_rx.borrow() {
                return Err(EngineError::Cancelled(execution_id));
            }

            let runnable: Vec<&str> = wave
                .iter()
                .map(String::as_str)
                .filter(|id| !completed.contains(*id) && !failed_handled.contains(*id))
                .filter(|id| is_eligible(id, &g, &completed, &failed_handled))
                .collect();

            if runnable.is_empty() {
                continue;
            }

            let futures = runnable.iter().map(|&node_id| {
                self.run_one_node(
                    workflow,
                    execution_id,
                    tenant_id,
                    node_id,
                    node_map[node_id],
                    &g,
                    &node_outputs,
                    &variables,
                    &initial_input,
                    cancel_rx.clone(),
                )
            });

            let outcomes = futures::future::join_all(futures).await;

            let mut suspension: Option<String> = None;
            let mut fatal: Option<EngineError> = None;

            for outcome in outcomes {
                match outcome? {
                    NodeSuspendOrRun::Suspended(node_id) => suspension = Some(node_id),
                    NodeSuspendOrRun::Ran(NodeRunOutcome::Success { node_id, output }) => {
                        if node_map.get(node_id.as_str()).map(|n| n.node_type.as_str()) == Some("set_variable") {
                            if let (Some(name), Some(value)) = (output.get("variable").and_then(Value::as_str), output.get("value")) {
                                variables.insert(name.to_string(), value.clone());
                            }
                        }
                        node_outputs.insert(node_id.clone(), output);
                        completed.insert(node_id);
                    }
                    NodeSuspendOrRun::Ran(NodeRunOutcome::HandledFailure { node_id }) => {
                        failed_handled.insert(node_id);
                    }
                    NodeSuspendOrRun::Ran(NodeRunOutcome::FatalFailure { node_id: _, error }) => {
                        fatal = Some(error);
                    }
                }
            }

            checkpoint.completed = completed.iter().cloned().collect();
            checkpoint.failed_handled = failed_handled.iter().cloned().collect();
            checkpoint.node_outputs = node_outputs.clone();
            checkpoint.variables = variables.clone();
            db::repository::executions::save_checkpoint(&self.pool, execution_id, checkpoint.to_json()).await?;

            if let Some(node_id) = suspension {
                self.audit
                    .log(NewAuditEntry::new(execution_id, "execution_suspended").with_node(node_id.clone(), node_id.clone(), "human_approval"))
                    .await;
                self.events.emit(EngineEvent::ExecutionSuspended { execution_id, node_id }).await;
                return Ok(ExecutionResult { execution_id, suspended: true, node_outputs });
            }

            if let Some(error) = fatal {
                return Err(error);
            }
        }

        Ok(ExecutionResult { execution_id, suspended: false, node_outputs })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_one_node(
        &self,
        workflow: &Workflow,
        execution_id: Uuid,
        tenant_id: Uuid,
        node_id: &str,
        node: &NodeDefinition,
        g: &graph::Graph<'_>,
        node_outputs: &HashMap<String, Value>,
        variables: &HashMap<String, Value>,
        initial_input: &Value,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> Result<NodeSuspendOrRun, EngineError> {
        if let Some(condition) = &node.condition {
            match evaluate_condition(node_id, condition, variables, node_outputs) {
                Ok(true) => {}
                Ok(false) => {
                    self.audit
                        .log(NewAuditEntry::new(execution_id, "node_skipped").with_node(node.id.clone(), node.id.clone(), node.node_type.clone()))
                        .await;
                    self.events.emit(EngineEvent::NodeSkipped { execution_id, node_id: node_id.to_string() }).await;
                    return Ok(NodeSuspendOrRun::Ran(NodeRunOutcome::Success { node_id: node_id.to_string(), output: Value::Null }));
                }
                Err(error) => {
                    return Ok(self.record_node_failure(execution_id, node, g, error).await);
                }
            }
        }

        let input = match resolve_input(node, g, node_outputs, initial_input) {
            Ok(input) => input,
            Err(error) => return Ok(self.record_node_failure(execution_id, node, g, error).await),
        };

        if node.node_type == approval::HUMAN_APPROVAL_NODE_TYPE {
            approval::suspend_for_approval(&self.pool, execution_id, node).await?;
            return Ok(NodeSuspendOrRun::Suspended(node_id.to_string()));
        }

        self.audit
            .log(NewAuditEntry::new(execution_id, "node_started").with_node(node.id.clone(), node.id.clone(), node.node_type.clone()))
            .await;
        self.events.emit(EngineEvent::NodeStarted { execution_id, node_id: node_id.to_string() }).await;

        let handler = match self.registry.get(&node.node_type).await {
            Some(h) => h,
            None => {
                let error = EngineError::NodeFatal { node_id: node_id.to_string(), message: format!("no handler registered for node type '{}'", node.node_type) };
                self.audit
                    .log(NewAuditEntry::new(execution_id, "node_failed").with_node(node.id.clone(), node.id.clone(), node.node_type.clone()).with_data(serde_json::json!({"error": error.to_string()})))
                    .await;
                return Ok(NodeSuspendOrRun::Ran(NodeRunOutcome::FatalFailure { node_id: node_id.to_string(), error }));
            }
        };

        let secrets = self.resolve_secrets(workflow).await?;
        let ctx = ExecutionContext {
            workflow_id: workflow.id,
            execution_id,
            tenant_id,
            input: initial_input.clone(),
            secrets,
            variables: variables.clone(),
            node_outputs: node_outputs.clone(),
            db_pool: Some(self.pool.clone()),
        };

        let retry_policy = node.retry_policy.clone().unwrap_or_else(|| workflow.settings.retry_defaults.clone());
        let timeout = Duration::from_millis(node.timeout_ms.unwrap_or(workflow.settings.default_timeout_ms));

        let outcome = node_exec::execute_node_with_retry(
            handler.as_ref(),
            node_id,
            input,
            &node.config,
            node.ai_verification.as_ref(),
            &ctx,
            &retry_policy,
            timeout,
            &mut cancel_rx,
        )
        .await;

        match outcome {
            Ok(node_exec::NodeOutcome { output, duration_ms, .. }) => {
                self.audit
                    .log(
                        NewAuditEntry::new(execution_id, "node_completed")
                            .with_node(node.id.clone(), node.id.clone(), node.node_type.clone())
                            .with_duration_ms(duration_ms),
                    )
                    .await;
                self.events
                    .emit(EngineEvent::NodeCompleted { execution_id, node_id: node_id.to_string(), duration_ms })
                    .await;
                Ok(NodeSuspendOrRun::Ran(NodeRunOutcome::Success { node_id: node_id.to_string(), output }))
            }
            Err(error) => {
                self.audit
                    .log(
                        NewAuditEntry::new(execution_id, "node_failed")
                            .with_node(node.id.clone(), node.id.clone(), node.node_type.clone())
                            .with_data(serde_json::json!({"error": error.to_string()})),
                    )
                    .await;
                self.events
                    .emit(EngineEvent::NodeFailed { execution_id, node_id: node_id.to_string(), message: error.to_string() })
                    .await;
                warn!(node_id, "node failed: {error}");

                if has_error_edge(node_id, g) {
                    Ok(NodeSuspendOrRun::Ran(NodeRunOutcome::HandledFailure { node_id: node_id.to_string() }))
                } else {
                    Ok(NodeSuspendOrRun::Ran(NodeRunOutcome::FatalFailure { node_id: node_id.to_string(), error }))
                }
            }
        }
    }

    /// Load every secret named in `workflow.credentials`, failing fast if
    /// any of them don't resolve rather than silently handing nodes a
    /// partial secret set.
    async fn resolve_secrets(&self, workflow: &Workflow) -> Result<HashMap<String, String>, EngineError> {
        Ok(crate::vault::resolve_all(self.vault.as_ref(), workflow.id, &workflow.credentials).await?)
    }

    /// Audit, emit, and classify a pre-dispatch failure (missing input,
    /// invalid condition) the same way a failed handler invocation is
    /// classified: routed down an `$error` edge if one exists, fatal
    /// otherwise.
    async fn record_node_failure(&self, execution_id: Uuid, node: &NodeDefinition, g: &graph::Graph<'_>, error: EngineError) -> NodeSuspendOrRun {
        self.audit
            .log(
                NewAuditEntry::new(execution_id, "node_failed")
                    .with_node(node.id.clone(), node.id.clone(), node.node_type.clone())
                    .with_data(serde_json::json!({"error": error.to_string()})),
            )
            .await;
        self.events
            .emit(EngineEvent::NodeFailed { execution_id, node_id: node.id.clone(), message: error.to_string() })
            .await;
        warn!(node_id = %node.id, "node failed before dispatch: {error}");

        if has_error_edge(&node.id, g) {
            NodeSuspendOrRun::Ran(NodeRunOutcome::HandledFailure { node_id: node.id.clone() })
        } else {
            NodeSuspendOrRun::Ran(NodeRunOutcome::FatalFailure { node_id: node.id.clone(), error })
        }
    }
}

enum NodeSuspendOrRun {
    Suspended(String),
    Ran(NodeRunOutcome),
}

fn has_error_edge(node_id: &str, g: &graph::Graph<'_>) -> bool {
    g.out_edges.get(node_id).into_iter().flatten().any(|e| e.is_error_edge())
}

/// A node is eligible to run in the current wave once every incoming edge's
/// precondition is satisfied: a normal edge requires its source to have
/// completed; a `$error` edge requires its source to have failed (and have
/// had that failure "handled" by this very edge).
fn is_eligible(
    node_id: &str,
    g: &graph::Graph<'_>,
    completed: &std::collections::HashSet<String>,
    failed_handled: &std::collections::HashSet<String>,
) -> bool {
    let incoming: Vec<&&Edge> = g.in_edges.get(node_id).into_iter().flatten().collect();
    if incoming.is_empty() {
        return true;
    }

    incoming.iter().all(|edge| {
        if edge.is_error_edge() {
            failed_handled.contains(&edge.from)
        } else {
            completed.contains(&edge.from)
        }
    })
}

/// Evaluate `condition` against the execution's current variables and prior
/// node outputs, treating the process environment as `$env`. A missing or
/// unparseable expression surfaces as [`EngineError::InvalidExpression`].
fn evaluate_condition(
    node_id: &str,
    condition: &str,
    variables: &HashMap<String, Value>,
    node_outputs: &HashMap<String, Value>,
) -> Result<bool, EngineError> {
    let ctx = ExpressionContext { variables: variables.clone(), node_outputs: node_outputs.clone(), env: std::env::vars().collect() };
    evaluate(condition, &ctx)
        .map(|value| is_truthy(&value))
        .map_err(|source| EngineError::InvalidExpression { node_id: node_id.to_string(), source })
}

/// Mirrors `nodes::expr::eval`'s private truthiness rule so condition
/// evaluation here agrees with how the same values are treated inside
/// expressions themselves.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Resolve a node's input.
///
/// Nodes with declared `input_ports` resolve each named port independently:
/// a port with a `source` of `"<nodeId>.<outputName>"` reads that upstream
/// node's output object and pulls out the named field; an unbound port
/// falls back to the legacy whole-output predecessor resolution. A required
/// port that resolves to nothing is a [`EngineError::MissingRequiredInput`].
///
/// Nodes with no declared ports keep the legacy behaviour: the triggering
/// payload for root nodes, the single predecessor's output for one in-edge,
/// or a JSON array of outputs when several branches converge (matching
/// `MergeNode`'s documented contract).
fn resolve_input(
    node: &NodeDefinition,
    g: &graph::Graph<'_>,
    node_outputs: &HashMap<String, Value>,
    initial_input: &Value,
) -> Result<Value, EngineError> {
    if node.input_ports.is_empty() {
        return Ok(legacy_resolve_input(&node.id, g, node_outputs, initial_input));
    }

    let mut object = serde_json::Map::with_capacity(node.input_ports.len());
    for port in &node.input_ports {
        let resolved = match &port.source {
            Some(source) => resolve_port_source(source, node_outputs),
            None => Some(legacy_resolve_input(&node.id, g, node_outputs, initial_input)),
        };

        let value = match resolved {
            Some(value) if !value.is_null() => value,
            _ if port.required => {
                return Err(EngineError::MissingRequiredInput { node_id: node.id.clone(), input: port.name.clone() });
            }
            _ => Value::Null,
        };

        object.insert(port.name.clone(), value);
    }
    Ok(Value::Object(object))
}

/// Resolve a `"<nodeId>.<outputName>"` port source against prior outputs.
fn resolve_port_source(source: &str, node_outputs: &HashMap<String, Value>) -> Option<Value> {
    let (node_id, output_name) = source.split_once('.')?;
    node_outputs.get(node_id).and_then(|output| output.get(output_name)).cloned()
}

fn legacy_resolve_input(node_id: &str, g: &graph::Graph<'_>, node_outputs: &HashMap<String, Value>, initial_input: &Value) -> Value {
    let normal_predecessors: Vec<&String> = g
        .in_edges
        .get(node_id)
        .into_iter()
        .flatten()
        .filter(|e| !e.is_error_edge())
        .map(|e| &e.from)
        .collect();

    match normal_predecessors.as_slice() {
        [] => initial_input.clone(),
        [single] => node_outputs.get(single.as_str()).cloned().unwrap_or(Value::Null),
        many => Value::Array(many.iter().map(|id| node_outputs.get(id.as_str()).cloned().unwrap_or(Value::Null)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputPort, NodeDefinition, Trigger};
    use serde_json::json;

    fn node(id: &str, node_type: &str, config: Value) -> NodeDefinition {
        NodeDefinition { id: id.to_string(), node_type: node_type.to_string(), config, ..Default::default() }
    }

    fn edge(from: &str, to: &str) -> Edge {
        Edge { from: from.into(), to: to.into(), condition: None, ..Default::default() }
    }

    fn error_edge(from: &str, to: &str) -> Edge {
        Edge { from: from.into(), to: to.into(), condition: Some(Edge::ERROR_CONDITION.to_string()), ..Default::default() }
    }

    fn workflow(nodes: Vec<NodeDefinition>, edges: Vec<Edge>) -> Workflow {
        Workflow::new("wf", Trigger::Manual, nodes, edges)
    }

    struct NoopResolver;

    #[async_trait::async_trait]
    impl SecretResolver for NoopResolver {
        async fn get_secret(&self, _workflow_id: Uuid, name: &str) -> Result<String, crate::vault::VaultError> {
            Err(crate::vault::VaultError::NotFound(name.to_string()))
        }
    }

    #[test]
    fn resolve_input_wraps_multiple_predecessors_in_array_without_ports() {
        let wf = workflow(
            vec![node("a", "mock", json!({})), node("b", "mock", json!({})), node("c", "merge", json!({}))],
            vec![edge("a", "c"), edge("b", "c")],
        );
        let g = graph::Graph::build(&wf);
        let mut outputs = HashMap::new();
        outputs.insert("a".to_string(), json!(1));
        outputs.insert("b".to_string(), json!(2));

        let resolved = resolve_input(&wf.nodes[2], &g, &outputs, &Value::Null).unwrap();
        assert_eq!(resolved, json!([1, 2]));
    }

    #[test]
    fn resolve_input_binds_named_ports_to_upstream_outputs() {
        let mut target = node("m", "mock", json!({}));
        target.input_ports = vec![
            InputPort { name: "input1".into(), source: Some("a.output1".into()), ..Default::default() },
            InputPort { name: "input2".into(), source: Some("b.output2".into()), ..Default::default() },
        ];
        let wf = workflow(vec![node("a", "mock", json!({})), node("b", "mock", json!({})), target], vec![edge("a", "m"), edge("b", "m")]);
        let g = graph::Graph::build(&wf);
        let mut outputs = HashMap::new();
        outputs.insert("a".to_string(), json!({"output1": 10}));
        outputs.insert("b".to_string(), json!({"output2": 200}));

        let resolved = resolve_input(&wf.nodes[2], &g, &outputs, &Value::Null).unwrap();
        assert_eq!(resolved, json!({"input1": 10, "input2": 200}));
    }

    #[test]
    fn resolve_input_rejects_missing_required_port() {
        let mut target = node("m", "mock", json!({}));
        target.input_ports = vec![InputPort { name: "input1".into(), source: Some("a.output1".into()), required: true, ..Default::default() }];
        let wf = workflow(vec![node("a", "mock", json!({})), target], vec![edge("a", "m")]);
        let g = graph::Graph::build(&wf);
        let outputs = HashMap::new();

        let err = resolve_input(&wf.nodes[1], &g, &outputs, &Value::Null).unwrap_err();
        assert!(matches!(err, EngineError::MissingRequiredInput { input, .. } if input == "input1"));
    }

    #[test]
    fn is_eligible_requires_error_edge_source_to_have_failed() {
        let wf = workflow(
            vec![node("a", "mock", json!({})), node("b", "mock", json!({}))],
            vec![error_edge("a", "b")],
        );
        let g = graph::Graph::build(&wf);
        let completed = std::collections::HashSet::new();
        let mut failed_handled = std::collections::HashSet::new();

        assert!(!is_eligible("b", &g, &completed, &failed_handled));
        failed_handled.insert("a".to_string());
        assert!(is_eligible("b", &g, &completed, &failed_handled));
    }

    #[tokio::test]
    async fn channel_event_sink_drops_events_past_capacity_without_blocking() {
        let (sink, mut rx) = ChannelEventSink::new(1);
        sink.emit(EngineEvent::ExecutionStarted { execution_id: Uuid::new_v4(), workflow_id: Uuid::new_v4() }).await;
        sink.emit(EngineEvent::ExecutionSucceeded { execution_id: Uuid::new_v4() }).await;

        let first = rx.try_recv();
        assert!(first.is_ok());
    }

    #[tokio::test]
    async fn noop_secret_resolver_always_fails() {
        let resolver = NoopResolver;
        let err = resolver.get_secret(Uuid::new_v4(), "anything").await.unwrap_err();
        assert!(matches!(err, crate::vault::VaultError::NotFound(_)));
    }
}
