use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::Value;

use super::AppState;
use crate::tenant;
use db::repository::{executions as exec_repo, jobs as job_repo, workflows as wf_repo};
use engine::Workflow;

pub async fn handle_webhook(
    headers: HeaderMap,
    Path(path): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let tenant_id = tenant::tenant_id(&headers);

    let workflows = match wf_repo::list_workflows(&state.pool, tenant_id).await {
        Ok(wfs) => wfs,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let matched_wf = workflows.into_iter().find(|w| {
        let wf: Result<Workflow, _> = serde_json::from_value(w.definition.clone());
        if let Ok(workflow) = wf {
            return workflow.triggers.iter().any(|trigger| {
                matches!(trigger, engine::Trigger::Webhook { path: trigger_path } if trigger_path == &path)
            });
        }
        false
    });

    let wf_row = match matched_wf {
        Some(w) => w,
        None => return Err(StatusCode::NOT_FOUND),
    };

    let exec = match exec_repo::create_execution(&state.pool, wf_row.id, tenant_id).await {
        Ok(e) => e,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let _job = match job_repo::enqueue_job(&state.pool, exec.id, wf_row.id, payload.clone()).await {
        Ok(j) => j,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({"message": "webhook accepted"}))))
}
