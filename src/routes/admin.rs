use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            AuditLogList, AuditLogQuery, DashboardStats, InventoryAdjustRequest, LowStockList,
            LowStockQuery,
        },
        orders::{OrderList, OrderListQuery, OrderWithItems, UpdateOrderStatusRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, Product},
    response::ApiResponse,
    routes::{
        extract::{AppJson, AppPath, AppQuery},
        params::Pagination,
    },
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/inventory/low-stock", get(list_low_stock))
        .route("/inventory/{id}", patch(adjust_inventory))
        .route("/stats", get(stats))
        .route("/audit-logs", get(list_audit_logs))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(Pagination, OrderListQuery),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
    AppQuery(query): AppQuery<OrderListQuery>,
) -> AppResult<ApiResponse<OrderList>> {
    admin_service::list_all_orders(&state, &user, query, pagination).await
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<OrderWithItems>> {
    admin_service::get_order_admin(&state, &user, id).await
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> AppResult<ApiResponse<Order>> {
    admin_service::update_order_status(&state, &user, id, payload).await
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(Pagination, LowStockQuery),
    responses((status = 200, description = "Active products at or below the threshold", body = ApiResponse<LowStockList>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
    AppQuery(query): AppQuery<LowStockQuery>,
) -> AppResult<ApiResponse<LowStockList>> {
    admin_service::list_low_stock(&state, &user, query, pagination).await
}

#[utoipa::path(
    patch,
    path = "/api/admin/inventory/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = InventoryAdjustRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<Product>),
        (status = 400, description = "Zero delta or negative result")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<InventoryAdjustRequest>,
) -> AppResult<ApiResponse<Product>> {
    admin_service::adjust_inventory(&state, &user, id, payload).await
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses((status = 200, description = "Dashboard figures", body = ApiResponse<DashboardStats>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ApiResponse<DashboardStats>> {
    admin_service::stats(&state, &user).await
}

#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(Pagination, AuditLogQuery),
    responses((status = 200, description = "Audit trail", body = ApiResponse<AuditLogList>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
    AppQuery(query): AppQuery<AuditLogQuery>,
) -> AppResult<ApiResponse<AuditLogList>> {
    admin_service::list_audit_logs(&state, &user, query, pagination).await
}
