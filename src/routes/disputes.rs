use axum::{Router, extract::State, routing::get};
use uuid::Uuid;

use crate::{
    dto::disputes::{CreateDisputeRequest, DisputeList, DisputeListQuery, UpdateDisputeRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Dispute,
    response::ApiResponse,
    routes::{
        extract::{AppJson, AppPath, AppQuery},
        params::Pagination,
    },
    services::dispute_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_disputes).post(create_dispute))
        .route(
            "/{id}",
            get(get_dispute).patch(update_dispute).delete(delete_dispute),
        )
}

#[utoipa::path(
    post,
    path = "/api/disputes",
    request_body = CreateDisputeRequest,
    responses(
        (status = 201, description = "Dispute opened", body = ApiResponse<Dispute>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Unresolved dispute already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Disputes"
)]
pub async fn create_dispute(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateDisputeRequest>,
) -> AppResult<ApiResponse<Dispute>> {
    dispute_service::create_dispute(&state, &user, payload).await
}

#[utoipa::path(
    get,
    path = "/api/disputes",
    params(Pagination, DisputeListQuery),
    responses((status = 200, description = "Disputes visible to the caller", body = ApiResponse<DisputeList>)),
    security(("bearer_auth" = [])),
    tag = "Disputes"
)]
pub async fn list_disputes(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
    AppQuery(query): AppQuery<DisputeListQuery>,
) -> AppResult<ApiResponse<DisputeList>> {
    dispute_service::list_disputes(&state, &user, query, pagination).await
}

#[utoipa::path(
    get,
    path = "/api/disputes/{id}",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    responses(
        (status = 200, description = "Dispute", body = ApiResponse<Dispute>),
        (status = 404, description = "Dispute not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Disputes"
)]
pub async fn get_dispute(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<Dispute>> {
    dispute_service::get_dispute(&state, &user, id).await
}

#[utoipa::path(
    patch,
    path = "/api/disputes/{id}",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    request_body = UpdateDisputeRequest,
    responses((status = 200, description = "Dispute updated", body = ApiResponse<Dispute>)),
    security(("bearer_auth" = [])),
    tag = "Disputes"
)]
pub async fn update_dispute(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateDisputeRequest>,
) -> AppResult<ApiResponse<Dispute>> {
    dispute_service::update_dispute(&state, &user, id, payload).await
}

#[utoipa::path(
    delete,
    path = "/api/disputes/{id}",
    params(("id" = Uuid, Path, description = "Dispute ID")),
    responses((status = 200, description = "Dispute deleted")),
    security(("bearer_auth" = [])),
    tag = "Disputes"
)]
pub async fn delete_dispute(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    dispute_service::delete_dispute(&state, &user, id).await
}
