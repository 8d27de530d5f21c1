use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::AppState;
use db::repository::{approvals as approval_repo, executions as exec_repo, workflows as wf_repo};

#[derive(serde::Deserialize)]
pub struct ResolveApprovalDto {
    pub approved: bool,
    pub resolved_by: String,
}

/// Approve or reject a pending approval. On approval the suspended
/// execution is resumed in the background; on rejection it's marked
/// failed and left that way — there's no partial-completion state to
/// reconcile since the node never ran.
pub async fn resolve(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ResolveApprovalDto>,
) -> Result<Json<db::models::PendingApprovalRow>, StatusCode> {
    let resolved = match approval_repo::resolve_approval(&state.pool, id, payload.approved, &payload.resolved_by).await {
        Ok(row) => row,
        Err(db::DbError::NotFound) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    if !payload.approved {
        let _ = exec_repo::update_execution_status(&state.pool, resolved.execution_id, "failed", true).await;
        return Ok(Json(resolved));
    }

    let execution = match exec_repo::get_execution(&state.pool, resolved.execution_id).await {
        Ok(e) => e,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let workflow_row = match wf_repo::get_workflow(&state.pool, execution.workflow_id).await {
        Ok(w) => w,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let workflow: engine::Workflow = match serde_json::from_value(workflow_row.definition) {
        Ok(w) => w,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let engine = state.engine.clone();
    let execution_id = resolved.execution_id;
    tokio::spawn(async move {
        if let Err(err) = engine.resume_from_approval(&workflow, execution_id).await {
            tracing::warn!(%execution_id, %err, "resume after approval failed");
        }
    });

    Ok(Json(resolved))
}
