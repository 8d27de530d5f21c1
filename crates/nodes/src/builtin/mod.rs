//! Built-in node handlers, grouped by category as spec.md §4.3 groups them.

mod ai;
mod common;
mod control;
mod data;
mod financial;
mod integration;

use std::sync::Arc;

use crate::traits::NodeHandler;

pub use ai::{AiAnomalyDetectNode, AiClassifyNode, AiExtractNode, AiLucaAnalyzeNode, AiPredictNode, AiQueryNode, AiVamnVerifyNode};
pub use control::{ConditionNode, DelayNode, HumanApprovalNode, LoopNode, MergeNode};
pub use data::{AggregateNode, FilterNode, SetVariableNode, TransformNode};
pub use financial::{BankReconcileNode, FinancialRatioNode, GstReturnNode, InvoiceOcrNode, JournalEntryNode, TaxCalculateNode};
pub use integration::{DatabaseQueryNode, HttpRequestNode, NotifyNode};

/// Every built-in handler, ready for `NodeRegistry::with_builtins`.
pub fn all() -> Vec<Arc<dyn NodeHandler>> {
    vec![
        Arc::new(ConditionNode),
        Arc::new(LoopNode),
        Arc::new(MergeNode),
        Arc::new(DelayNode),
        Arc::new(HumanApprovalNode),
        Arc::new(TransformNode),
        Arc::new(FilterNode),
        Arc::new(AggregateNode),
        Arc::new(SetVariableNode),
        Arc::new(HttpRequestNode::new()),
        Arc::new(NotifyNode),
        Arc::new(DatabaseQueryNode),
        Arc::new(InvoiceOcrNode),
        Arc::new(BankReconcileNode),
        Arc::new(JournalEntryNode),
        Arc::new(TaxCalculateNode),
        Arc::new(GstReturnNode),
        Arc::new(FinancialRatioNode),
        Arc::new(AiVamnVerifyNode),
        Arc::new(AiLucaAnalyzeNode),
        Arc::new(AiAnomalyDetectNode),
        Arc::new(AiClassifyNode::new()),
        Arc::new(AiExtractNode::new()),
        Arc::new(AiPredictNode::new()),
        Arc::new(AiQueryNode::new()),
    ]
}
