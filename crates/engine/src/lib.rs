//! `engine` crate — core domain models, DAG validation, and the execution engine.

pub mod models;
pub mod error;
pub mod dag;
pub mod executor;
pub mod vault;
pub mod audit_sink;
pub mod bootstrap;

pub use models::{Workflow, Trigger, NodeDefinition, Edge, RetryPolicy, WorkflowSettings};
pub use error::EngineError;
pub use dag::validate_dag;
pub use executor::{Engine, EngineConfig, ExecutionResult, EngineEvent, EventSink, ChannelEventSink, NullEventSink};
pub use vault::{SecretResolver, DbSecretResolver, VaultError};
pub use audit_sink::PgAuditSink;
pub use bootstrap::build_engine;
