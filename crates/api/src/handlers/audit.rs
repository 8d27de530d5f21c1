use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::AppState;
use crate::tenant;
use db::repository::audit::{query, AuditLogFilter};

#[derive(serde::Deserialize, Default)]
pub struct AuditQueryParams {
    pub execution_id: Option<Uuid>,
    pub workflow_id: Option<Uuid>,
    pub event: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `tenant_id` is taken from the `X-Tenant-Id` header rather than the
/// query string, matching every other endpoint's tenant scoping.
pub async fn list(
    headers: HeaderMap,
    Query(params): Query<AuditQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<db::models::AuditLogRow>>, StatusCode> {
    let filter = AuditLogFilter {
        execution_id: params.execution_id,
        workflow_id: params.workflow_id,
        tenant_id: Some(tenant::tenant_id(&headers)),
        start_date: params.start_date,
        end_date: params.end_date,
        event: params.event,
        limit: params.limit.unwrap_or(100),
        offset: params.offset.unwrap_or(0),
    };

    match query(&state.pool, &filter).await {
        Ok(rows) => Ok(Json(rows)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
