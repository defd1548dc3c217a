use axum::{Router, http::{StatusCode, Uri}, routing::get};

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod chats;
pub mod disputes;
pub mod doc;
pub mod extract;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod settings;
pub mod shipping;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::route())
        .nest("/admin", admin::router())
        .nest("/chats", chats::router())
        .nest("/shipping", shipping::router())
        .nest("/settings", settings::router())
        .nest("/disputes", disputes::router())
}

/// Full application: health, `/api`, docs and the JSON 404 fallback, with state bound.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiResponse<serde_json::Value> {
    ApiResponse::with_status(
        StatusCode::NOT_FOUND,
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    )
}
