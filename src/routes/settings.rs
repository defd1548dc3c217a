use axum::{Router, extract::State, routing::get};

use crate::{
    dto::settings::UpdateSettingsRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Settings,
    response::ApiResponse,
    routes::extract::AppJson,
    services::settings_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).put(update_settings))
}

#[utoipa::path(
    get,
    path = "/api/settings",
    responses((status = 200, description = "Store settings", body = ApiResponse<Settings>)),
    tag = "Settings"
)]
pub async fn get_settings(State(state): State<AppState>) -> AppResult<ApiResponse<Settings>> {
    settings_service::get_settings(&state).await
}

#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = ApiResponse<Settings>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Settings"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpdateSettingsRequest>,
) -> AppResult<ApiResponse<Settings>> {
    settings_service::update_settings(&state, &user, payload).await
}
