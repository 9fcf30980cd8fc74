use serde_json::Value;
use uuid::Uuid;

use crate::{error::AppResult, state::AppState};

#[derive(Debug)]
pub struct AuditEntry<'a> {
    pub user_id: Option<Uuid>,
    pub action: &'a str,
    pub resource: &'a str,
    pub metadata: Value,
}

pub async fn insert<'e, E>(executor: E, entry: &AuditEntry<'_>) -> AppResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(&entry.metadata)
    .execute(executor)
    .await?;

    Ok(())
}

/// Best-effort audit entry; a failed insert is logged and never fails the
/// request that triggered it.
pub async fn record(
    state: &AppState,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let entry = AuditEntry {
        user_id,
        action,
        resource,
        metadata,
    };
    if let Err(err) = insert(&state.pool, &entry).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
