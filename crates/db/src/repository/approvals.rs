//! Pending-approval repository functions — backs the human-approval
//! suspend/resume workflow.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::PendingApprovalRow};

/// Create a pending approval gate, suspending the execution it belongs to.
pub async fn create_approval(
    pool: &PgPool,
    execution_id: Uuid,
    node_id: &str,
    message: &str,
) -> Result<PendingApprovalRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as!(
        PendingApprovalRow,
        r#"
        INSERT INTO pending_approvals (id, execution_id, node_id, status, message, requested_at)
        VALUES ($1, $2, $3, 'pending', $4, $5)
        RETURNING id, execution_id, node_id, status, message, requested_at, resolved_at, resolved_by
        "#,
        id,
        execution_id,
        node_id,
        message,
        now,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Approve or reject a pending approval. Returns `DbError::NotFound` if the
/// approval doesn't exist or has already been resolved.
pub async fn resolve_approval(
    pool: &PgPool,
    approval_id: Uuid,
    approved: bool,
    resolved_by: &str,
) -> Result<PendingApprovalRow, DbError> {
    let status = if approved { "approved" } else { "rejected" };

    let row = sqlx::query_as!(
        PendingApprovalRow,
        r#"
        UPDATE pending_approvals
        SET status = $1, resolved_at = $2, resolved_by = $3
        WHERE id = $4 AND status = 'pending'
        RETURNING id, execution_id, node_id, status, message, requested_at, resolved_at, resolved_by
        "#,
        status,
        Utc::now(),
        resolved_by,
        approval_id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Fetch the pending approval for an execution, if any.
pub async fn get_pending_for_execution(pool: &PgPool, execution_id: Uuid) -> Result<Option<PendingApprovalRow>, DbError> {
    let row = sqlx::query_as!(
        PendingApprovalRow,
        r#"SELECT id, execution_id, node_id, status, message, requested_at, resolved_at, resolved_by
           FROM pending_approvals WHERE execution_id = $1 AND status = 'pending'"#,
        execution_id,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// List every approval still awaiting a decision, oldest first.
pub async fn list_pending(pool: &PgPool) -> Result<Vec<PendingApprovalRow>, DbError> {
    let rows = sqlx::query_as!(
        PendingApprovalRow,
        r#"SELECT id, execution_id, node_id, status, message, requested_at, resolved_at, resolved_by
           FROM pending_approvals WHERE status = 'pending' ORDER BY requested_at ASC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
