use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::shipping::{
        AssignShipperRequest, CreateTrackingRequest, TrackingList, TrackingListQuery,
        TrackingWithEvents, UpdateTrackingStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::{
        extract::{AppJson, AppPath, AppQuery},
        params::Pagination,
    },
    services::shipping_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trackings).post(create_tracking))
        .route("/mine", get(my_trackings))
        .route("/order/{order_id}", get(get_by_order))
        .route("/{id}", get(get_tracking))
        .route("/{id}/assign", patch(assign_shipper))
        .route("/{id}/status", patch(update_status))
}

#[utoipa::path(
    post,
    path = "/api/shipping",
    request_body = CreateTrackingRequest,
    responses(
        (status = 201, description = "Tracking created", body = ApiResponse<TrackingWithEvents>),
        (status = 400, description = "Cancelled order or invalid shipper"),
        (status = 409, description = "Order already tracked")
    ),
    security(("bearer_auth" = [])),
    tag = "Shipping"
)]
pub async fn create_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateTrackingRequest>,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    shipping_service::create_tracking(&state, &user, payload).await
}

#[utoipa::path(
    get,
    path = "/api/shipping",
    params(Pagination, TrackingListQuery),
    responses((status = 200, description = "All trackings", body = ApiResponse<TrackingList>)),
    security(("bearer_auth" = [])),
    tag = "Shipping"
)]
pub async fn list_trackings(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
    AppQuery(query): AppQuery<TrackingListQuery>,
) -> AppResult<ApiResponse<TrackingList>> {
    shipping_service::list_trackings(&state, &user, query, pagination).await
}

#[utoipa::path(
    get,
    path = "/api/shipping/mine",
    params(Pagination, TrackingListQuery),
    responses((status = 200, description = "Trackings assigned to the calling shipper", body = ApiResponse<TrackingList>)),
    security(("bearer_auth" = [])),
    tag = "Shipping"
)]
pub async fn my_trackings(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
    AppQuery(query): AppQuery<TrackingListQuery>,
) -> AppResult<ApiResponse<TrackingList>> {
    shipping_service::my_trackings(&state, &user, query, pagination).await
}

#[utoipa::path(
    get,
    path = "/api/shipping/{id}",
    params(("id" = Uuid, Path, description = "Tracking ID")),
    responses(
        (status = 200, description = "Tracking with events", body = ApiResponse<TrackingWithEvents>),
        (status = 403, description = "Not allowed to view this parcel")
    ),
    security(("bearer_auth" = [])),
    tag = "Shipping"
)]
pub async fn get_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    shipping_service::get_tracking(&state, &user, id).await
}

#[utoipa::path(
    get,
    path = "/api/shipping/order/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Tracking of the order", body = ApiResponse<TrackingWithEvents>),
        (status = 404, description = "Order has no tracking")
    ),
    security(("bearer_auth" = [])),
    tag = "Shipping"
)]
pub async fn get_by_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(order_id): AppPath<Uuid>,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    shipping_service::get_by_order(&state, &user, order_id).await
}

#[utoipa::path(
    patch,
    path = "/api/shipping/{id}/assign",
    params(("id" = Uuid, Path, description = "Tracking ID")),
    request_body = AssignShipperRequest,
    responses((status = 200, description = "Shipper assigned", body = ApiResponse<TrackingWithEvents>)),
    security(("bearer_auth" = [])),
    tag = "Shipping"
)]
pub async fn assign_shipper(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<AssignShipperRequest>,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    shipping_service::assign_shipper(&state, &user, id, payload).await
}

#[utoipa::path(
    patch,
    path = "/api/shipping/{id}/status",
    params(("id" = Uuid, Path, description = "Tracking ID")),
    request_body = UpdateTrackingStatusRequest,
    responses(
        (status = 200, description = "Status recorded", body = ApiResponse<TrackingWithEvents>),
        (status = 403, description = "Not the assigned shipper")
    ),
    security(("bearer_auth" = [])),
    tag = "Shipping"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateTrackingStatusRequest>,
) -> AppResult<ApiResponse<TrackingWithEvents>> {
    shipping_service::update_status(&state, &user, id, payload).await
}
