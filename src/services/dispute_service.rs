use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::disputes::{CreateDisputeRequest, DisputeList, DisputeListQuery, UpdateDisputeRequest},
    entity::{
        disputes::{ActiveModel as DisputeActive, Column as DisputeCol, Entity as Disputes},
        orders::{Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_management, ensure_role},
    models::{Dispute, DisputeStatus, Role},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{auth_service::require_text, mapping::dispute_from_entity},
    state::AppState,
};

pub async fn create_dispute(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDisputeRequest,
) -> AppResult<ApiResponse<Dispute>> {
    ensure_role(user, &[Role::Customer])?;
    let reason = require_text("reason", &payload.reason)?;
    let description = require_text("description", &payload.description)?;

    let order = Orders::find()
        .filter(OrderCol::Id.eq(payload.order_id))
        .filter(OrderCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let unresolved = Disputes::find()
        .filter(DisputeCol::OrderId.eq(order.id))
        .filter(DisputeCol::Status.is_in([
            DisputeStatus::Open.as_str(),
            DisputeStatus::InReview.as_str(),
        ]))
        .count(&state.orm)
        .await?;
    if unresolved > 0 {
        return Err(AppError::Conflict(
            "An unresolved dispute already exists for this order".into(),
        ));
    }

    let dispute = DisputeActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        customer_id: Set(user.user_id),
        reason: Set(reason),
        description: Set(description),
        status: Set(DisputeStatus::Open.as_str().into()),
        resolution: Set(None),
        handled_by: Set(None),
        resolved_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(dispute_id = %dispute.id, order_id = %order.id, "dispute opened");
    audit::record(
        &state.pool,
        user.user_id,
        "dispute_create",
        "disputes",
        serde_json::json!({ "dispute_id": dispute.id, "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::created("Dispute created", dispute_from_entity(dispute)))
}

pub async fn list_disputes(
    state: &AppState,
    user: &AuthUser,
    query: DisputeListQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<DisputeList>> {
    let (page, limit, offset) = pagination.normalize();

    let mut condition = Condition::all();
    if !user.is_staff() {
        condition = condition.add(DisputeCol::CustomerId.eq(user.user_id));
    }
    if let Some(status) = query.status {
        condition = condition.add(DisputeCol::Status.eq(status.as_str()));
    }

    let finder = Disputes::find()
        .filter(condition)
        .order_by_desc(DisputeCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(dispute_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Disputes",
        DisputeList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_dispute(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Dispute>> {
    // non-staff callers only see their own disputes; others look missing
    let dispute = Disputes::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|d| user.is_staff() || d.customer_id == user.user_id)
        .ok_or(AppError::NotFound("Dispute"))?;

    Ok(ApiResponse::success(
        "Dispute",
        dispute_from_entity(dispute),
        Some(Meta::empty()),
    ))
}

pub async fn update_dispute(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDisputeRequest,
) -> AppResult<ApiResponse<Dispute>> {
    ensure_management(user)?;
    let existing = Disputes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Dispute"))?;

    let now = Utc::now();
    let mut active: DisputeActive = existing.into();
    if let Some(status) = payload.status {
        active.status = Set(status.as_str().into());
        if status.is_closed() {
            active.resolved_at = Set(Some(now.into()));
        }
    }
    if let Some(resolution) = payload.resolution {
        let resolution = resolution.trim().to_string();
        active.resolution = Set(Some(resolution).filter(|r| !r.is_empty()));
    }
    active.handled_by = Set(Some(user.user_id));
    active.updated_at = Set(now.into());
    let dispute = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "dispute_update",
        "disputes",
        serde_json::json!({ "dispute_id": dispute.id, "status": dispute.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Dispute updated",
        dispute_from_entity(dispute),
        Some(Meta::empty()),
    ))
}

pub async fn delete_dispute(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Disputes::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Dispute"));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "dispute_delete",
        "disputes",
        serde_json::json!({ "dispute_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
