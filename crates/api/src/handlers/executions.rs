use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use super::AppState;
use crate::tenant;
use db::repository::{executions as exec_repo, jobs as job_repo};

#[derive(serde::Deserialize)]
pub struct ExecuteWorkflowDto {
    pub input: Value,
}

#[derive(serde::Deserialize)]
pub struct ListExecutionsQuery {
    pub workflow_id: Uuid,
}

pub async fn execute(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ExecuteWorkflowDto>,
) -> Result<(StatusCode, Json<db::models::JobRow>), StatusCode> {
    let tenant_id = tenant::tenant_id(&headers);

    // Pre-create the execution record so the caller gets an execution id
    // back immediately; the worker picks the job up, loads the (still
    // empty) checkpoint and runs it via `Engine::run_execution`.
    let exec = match exec_repo::create_execution(&state.pool, id, tenant_id).await {
        Ok(e) => e,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let job = match job_repo::enqueue_job(&state.pool, exec.id, id, payload.input).await {
        Ok(j) => j,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    Ok((StatusCode::ACCEPTED, Json(job)))
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<db::models::WorkflowExecutionRow>, StatusCode> {
    match exec_repo::get_execution(&state.pool, id).await {
        Ok(e) => Ok(Json(e)),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn list(
    Query(q): Query<ListExecutionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<db::models::WorkflowExecutionRow>>, StatusCode> {
    match exec_repo::list_executions(&state.pool, q.workflow_id).await {
        Ok(executions) => Ok(Json(executions)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn cancel(Path(id): Path<Uuid>, State(state): State<AppState>) -> StatusCode {
    state.engine.cancel(id).await;
    StatusCode::ACCEPTED
}
