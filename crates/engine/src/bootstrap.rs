//! Wires up a production [`Engine`](crate::executor::Engine) from a pool —
//! shared by the `api` server and the `cli` worker/approve/reject
//! sub-commands so both processes build the exact same handler registry,
//! audit sink and secret resolver.

use std::sync::Arc;

use audit::AuditLogger;
use db::DbPool;

use crate::audit_sink::PgAuditSink;
use crate::executor::{Engine, EngineConfig, NullEventSink};
use crate::vault::DbSecretResolver;

/// Build an [`Engine`] with Postgres-backed audit, secrets and job/execution
/// persistence, and a registry pre-populated with every built-in node type.
///
/// Events are discarded ([`NullEventSink`]) — a process that wants to observe
/// engine events should build its own `Engine` with a [`crate::executor::ChannelEventSink`]
/// instead of going through this helper.
pub fn build_engine(pool: DbPool, config: EngineConfig) -> Arc<Engine> {
    let registry = Arc::new(nodes::NodeRegistry::with_builtins());
    let audit = AuditLogger::new(Arc::new(PgAuditSink::new(pool.clone())));
    let vault: Arc<dyn crate::vault::SecretResolver> = Arc::new(DbSecretResolver::new(pool.clone()));
    let events: Arc<dyn crate::executor::EventSink> = Arc::new(NullEventSink);

    Engine::new(pool, registry, audit, vault, events, config)
}
