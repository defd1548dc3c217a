//! Back-office audit trail.

use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;

/// Appends an audit entry for `actor`. Failures are logged and swallowed so the
/// business operation that triggered them still succeeds.
pub async fn record(pool: &DbPool, actor: Uuid, action: &str, resource: &str, metadata: Value) {
    let result = sqlx::query(
        "INSERT INTO audit_logs (id, user_id, action, resource, metadata) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::new_v4())
    .bind(actor)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(error = %err, action, resource, %actor, "audit entry not written");
    }
}
