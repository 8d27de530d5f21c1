//! Human-approval suspend/resume helpers.
//!
//! A `human_approval` node never actually runs through the registry — the
//! engine intercepts it before dispatch, creates (or reuses) a
//! `pending_approvals` row, and suspends the execution. `resume_from_approval`
//! is the mirror image, called once a reviewer has approved or rejected it.

use db::models::PendingApprovalRow;
use db::DbPool;
use uuid::Uuid;

use crate::models::NodeDefinition;
use crate::EngineError;

pub const HUMAN_APPROVAL_NODE_TYPE: &str = "human_approval";

/// Extract the message to show a reviewer from a `human_approval` node's
/// config (`{"message": "..."}`), falling back to a generic prompt.
pub fn approval_message(node: &NodeDefinition) -> String {
    node.config
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("Workflow is awaiting manual approval")
        .to_string()
}

/// Create the approval gate that suspends `execution_id` at `node`.
pub async fn suspend_for_approval(
    pool: &DbPool,
    execution_id: Uuid,
    node: &NodeDefinition,
) -> Result<PendingApprovalRow, EngineError> {
    let message = approval_message(node);
    let row = db::repository::approvals::create_approval(pool, execution_id, &node.id, &message).await?;
    Ok(row)
}

/// Resolve the pending approval for `execution_id`. Returns
/// [`EngineError::NoPendingApproval`] if none is outstanding, and
/// [`EngineError::ApprovalRejected`] if the reviewer rejected it (the
/// caller should mark the execution failed rather than resuming it).
pub async fn resolve(
    pool: &DbPool,
    execution_id: Uuid,
    approved: bool,
    resolved_by: &str,
) -> Result<PendingApprovalRow, EngineError> {
    let pending = db::repository::approvals::get_pending_for_execution(pool, execution_id)
        .await?
        .ok_or(EngineError::NoPendingApproval(execution_id))?;

    let resolved = db::repository::approvals::resolve_approval(pool, pending.id, approved, resolved_by).await?;

    if !approved {
        return Err(EngineError::ApprovalRejected {
            node_id: resolved.node_id.clone(),
            reason: format!("rejected by {resolved_by}"),
        });
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_message_from_config() {
        let node = NodeDefinition {
            id: "n1".into(),
            node_type: HUMAN_APPROVAL_NODE_TYPE.into(),
            config: json!({"message": "please review the invoice total"}),
            ..Default::default()
        };
        assert_eq!(approval_message(&node), "please review the invoice total");
    }

    #[test]
    fn falls_back_to_generic_message() {
        let node = NodeDefinition { id: "n1".into(), node_type: HUMAN_APPROVAL_NODE_TYPE.into(), config: json!({}), ..Default::default() };
        assert_eq!(approval_message(&node), "Workflow is awaiting manual approval");
    }
}
