//! `NodeRegistry` — maps node type tags to their `NodeHandler` implementation.
//!
//! Widened from the teacher's plain `HashMap<String, Arc<dyn ExecutableNode>>`
//! to an `RwLock` so handlers can be registered (e.g. by a plugin loader) after
//! the built-ins are installed, without requiring `&mut` access everywhere.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::builtin;
use crate::traits::NodeHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Control,
    Data,
    Integration,
    Financial,
    Ai,
}

pub struct NodeRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn NodeHandler>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self { handlers: RwLock::new(HashMap::new()) }
    }

    /// A registry pre-populated with every built-in node type.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for handler in builtin::all() {
            registry.register_sync(handler);
        }
        registry
    }

    /// Register a handler synchronously, for use during construction before
    /// the registry is shared across tasks.
    fn register_sync(&self, handler: Arc<dyn NodeHandler>) {
        let node_type = handler.node_type().to_string();
        let mut handlers = self.handlers.try_write().expect("registry not yet shared");
        if handlers.insert(node_type.clone(), handler).is_some() {
            tracing::warn!(node_type = %node_type, "overwrote existing node handler registration");
        }
    }

    pub async fn register(&self, handler: Arc<dyn NodeHandler>) {
        let node_type = handler.node_type().to_string();
        let mut handlers = self.handlers.write().await;
        if handlers.insert(node_type.clone(), handler).is_some() {
            tracing::warn!(node_type = %node_type, "overwrote existing node handler registration");
        }
    }

    pub async fn get(&self, node_type: &str) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.read().await.get(node_type).cloned()
    }

    pub async fn list(&self) -> Vec<Arc<dyn NodeHandler>> {
        self.handlers.read().await.values().cloned().collect()
    }

    pub async fn list_by_category(&self, category: NodeCategory) -> Vec<Arc<dyn NodeHandler>> {
        self.handlers
            .read()
            .await
            .values()
            .filter(|h| h.category() == category)
            .cloned()
            .collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_builtins_registers_every_declared_node_type() {
        let registry = NodeRegistry::with_builtins();
        for expected in [
            "condition", "loop", "merge", "delay", "human_approval",
            "transform", "filter", "aggregate", "set_variable",
            "http_request", "notify", "database_query",
            "invoice_ocr", "bank_reconcile", "journal_entry", "tax_calculate",
            "gst_return", "financial_ratio",
            "ai_vamn_verify", "ai_luca_analyze", "ai_anomaly_detect",
            "ai_classify", "ai_extract", "ai_predict", "ai_query",
        ] {
            assert!(registry.get(expected).await.is_some(), "missing handler for {expected}");
        }
    }

    #[tokio::test]
    async fn list_by_category_filters_correctly() {
        let registry = NodeRegistry::with_builtins();
        let financial = registry.list_by_category(NodeCategory::Financial).await;
        assert!(financial.iter().all(|h| h.category() == NodeCategory::Financial));
        assert!(!financial.is_empty());
    }

    #[tokio::test]
    async fn re_registering_a_type_overwrites_without_panicking() {
        let registry = NodeRegistry::with_builtins();
        let original = registry.get("delay").await.unwrap();
        registry.register(original.clone()).await;
        assert_eq!(registry.get("delay").await.unwrap().node_type(), "delay");
    }
}
