use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
    sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{
            AuditLogList, AuditLogQuery, DashboardStats, InventoryAdjustRequest, LowStockList,
            LowStockQuery,
        },
        orders::{OrderList, OrderListQuery, OrderWithItems, UpdateOrderStatusRequest},
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_management, ensure_staff},
    models::{DisputeStatus, Order, PaymentStatus, Product},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, SortOrder},
    services::{
        mapping::{audit_log_from_entity, order_from_entity, product_from_entity},
        order_service::items_of,
    },
    state::AppState,
};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);

    let order_list = OrderList { items: orders };

    Ok(ApiResponse::success("Orders", order_list, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_staff(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let items = items_of(&state.orm, order.id).await?;

    let data = OrderWithItems {
        order: order_from_entity(order),
        items,
    };
    Ok(ApiResponse::success(
        "Order found",
        data,
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    let previous = existing.status.clone();

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, from = %previous, to = %order.status, "order status changed");
    audit::record(
        &state.pool,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": previous, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<LowStockList>> {
    ensure_staff(user)?;
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let (page, limit, offset) = pagination.normalize();

    let finder = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let data = LowStockList { items };
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", data, Some(meta)))
}

pub fn adjusted_stock(current: i32, delta: i32) -> AppResult<i32> {
    if delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }
    match current.checked_add(delta) {
        Some(stock) if stock >= 0 => Ok(stock),
        _ => Err(AppError::BadRequest("stock cannot be negative".into())),
    }
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_management(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let new_stock = adjusted_stock(product.stock, payload.delta)?;

    let mut active: ProductActive = product.into();
    active.stock = Set(new_stock);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": updated.id, "delta": payload.delta, "stock": updated.stock }),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory updated",
        product_from_entity(updated),
        Some(Meta::empty()),
    ))
}

async fn grouped_counts(state: &AppState, sql: &str) -> AppResult<BTreeMap<String, i64>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(sql).fetch_all(&state.pool).await?;
    Ok(rows.into_iter().collect())
}

pub async fn stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_management(user)?;

    let users_by_role =
        grouped_counts(state, "SELECT role, COUNT(*) FROM users GROUP BY role").await?;
    let orders_by_status =
        grouped_counts(state, "SELECT status, COUNT(*) FROM orders GROUP BY status").await?;

    let (revenue,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM orders WHERE payment_status = $1",
    )
    .bind(PaymentStatus::Paid.as_str())
    .fetch_one(&state.pool)
    .await?;

    let active_products = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .count(&state.orm)
        .await? as i64;

    let low_stock_products = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .filter(ProdCol::Stock.lte(DEFAULT_LOW_STOCK_THRESHOLD))
        .count(&state.orm)
        .await? as i64;

    let (open_disputes,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM disputes WHERE status IN ($1, $2)")
            .bind(DisputeStatus::Open.as_str())
            .bind(DisputeStatus::InReview.as_str())
            .fetch_one(&state.pool)
            .await?;

    let data = DashboardStats {
        users_by_role,
        orders_by_status,
        revenue,
        active_products,
        low_stock_products,
        open_disputes,
    };
    Ok(ApiResponse::success("Stats", data, Some(Meta::empty())))
}

pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    query: AuditLogQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<AuditLogList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let mut finder = AuditLogs::find().order_by_desc(AuditCol::CreatedAt);
    if let Some(action) = query.action.as_ref().map(|a| a.trim()).filter(|a| !a.is_empty()) {
        finder = finder.filter(AuditCol::Action.eq(action));
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(audit_log_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Audit logs",
        AuditLogList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_adjustment_stays_non_negative() {
        assert_eq!(adjusted_stock(3, 4).expect("restock"), 7);
        assert_eq!(adjusted_stock(3, -3).expect("sell out"), 0);
        assert!(adjusted_stock(3, -4).is_err());
        assert!(adjusted_stock(3, 0).is_err());
        assert!(adjusted_stock(i32::MAX, 1).is_err());
    }
}
