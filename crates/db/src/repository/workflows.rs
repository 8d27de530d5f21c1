//! Workflow CRUD operations, including version-snapshot tracking.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbError, models::{WorkflowRow, WorkflowVersionRow}};

/// Insert a new workflow into the database, at version 1.
pub async fn create_workflow(
    pool: &PgPool,
    tenant_id: Uuid,
    name: &str,
    definition: serde_json::Value,
) -> Result<WorkflowRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    let row = sqlx::query_as!(
        WorkflowRow,
        r#"
        INSERT INTO workflows (id, tenant_id, name, definition, version, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 1, $5, $5)
        RETURNING id, tenant_id, name, definition, version, created_at, updated_at
        "#,
        id,
        tenant_id,
        name,
        definition,
        now,
    )
    .fetch_one(&mut *tx)
    .await?;

    insert_version_snapshot(&mut tx, row.id, row.version, &row.definition).await?;

    tx.commit().await?;
    Ok(row)
}

/// Update a workflow's definition, bumping its version and recording a
/// snapshot of the new definition.
pub async fn update_workflow(
    pool: &PgPool,
    id: Uuid,
    definition: serde_json::Value,
) -> Result<WorkflowRow, DbError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as!(
        WorkflowRow,
        r#"
        UPDATE workflows
        SET definition = $1, version = version + 1, updated_at = $2
        WHERE id = $3
        RETURNING id, tenant_id, name, definition, version, created_at, updated_at
        "#,
        definition,
        now,
        id,
    )
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(DbError::NotFound)?;

    insert_version_snapshot(&mut tx, row.id, row.version, &row.definition).await?;

    tx.commit().await?;
    Ok(row)
}

async fn insert_version_snapshot(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    workflow_id: Uuid,
    version: i32,
    definition: &serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query!(
        r#"
        INSERT INTO workflow_versions (id, workflow_id, version, definition, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
        Uuid::new_v4(),
        workflow_id,
        version,
        definition,
        Utc::now(),
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Fetch a single workflow by its primary key.
pub async fn get_workflow(pool: &PgPool, id: Uuid) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as!(
        WorkflowRow,
        r#"SELECT id, tenant_id, name, definition, version, created_at, updated_at FROM workflows WHERE id = $1"#,
        id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return all workflows for a tenant, ordered by creation time (newest first).
pub async fn list_workflows(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<WorkflowRow>, DbError> {
    let rows = sqlx::query_as!(
        WorkflowRow,
        r#"SELECT id, tenant_id, name, definition, version, created_at, updated_at
           FROM workflows WHERE tenant_id = $1 ORDER BY created_at DESC"#,
        tenant_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All version snapshots for a workflow, oldest first.
pub async fn list_versions(pool: &PgPool, workflow_id: Uuid) -> Result<Vec<WorkflowVersionRow>, DbError> {
    let rows = sqlx::query_as!(
        WorkflowVersionRow,
        r#"SELECT id, workflow_id, version, definition, created_at
           FROM workflow_versions WHERE workflow_id = $1 ORDER BY version ASC"#,
        workflow_id,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Restore a workflow to a prior version by copying that snapshot's
/// definition forward as a new version (never rewrites history).
pub async fn restore_version(pool: &PgPool, workflow_id: Uuid, version: i32) -> Result<WorkflowRow, DbError> {
    let snapshot = sqlx::query_as!(
        WorkflowVersionRow,
        r#"SELECT id, workflow_id, version, definition, created_at
           FROM workflow_versions WHERE workflow_id = $1 AND version = $2"#,
        workflow_id,
        version,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    update_workflow(pool, workflow_id, snapshot.definition).await
}

/// Permanently delete a workflow by its primary key.
///
/// Returns `DbError::NotFound` if no row was deleted.
pub async fn delete_workflow(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query!("DELETE FROM workflows WHERE id = $1", id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
