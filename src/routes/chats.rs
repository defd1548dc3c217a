use axum::{
    Router,
    extract::State,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::chats::{ChatList, ChatListQuery, ChatWithMessages, SendMessageRequest, StartChatRequest, UnreadCount},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Chat, ChatMessage},
    response::ApiResponse,
    routes::{
        extract::{AppJson, AppPath, AppQuery},
        params::Pagination,
    },
    services::chat_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chats).post(start_chat))
        .route("/unread-count", get(unread_count))
        .route("/{id}", get(get_chat).delete(delete_chat))
        .route("/{id}/messages", post(send_message))
        .route("/{id}/read", patch(mark_read))
}

#[utoipa::path(
    post,
    path = "/api/chats",
    request_body = StartChatRequest,
    responses(
        (status = 201, description = "Chat opened", body = ApiResponse<ChatWithMessages>),
        (status = 200, description = "Existing chat returned", body = ApiResponse<ChatWithMessages>),
        (status = 403, description = "Customers only")
    ),
    security(("bearer_auth" = [])),
    tag = "Chats"
)]
pub async fn start_chat(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<StartChatRequest>,
) -> AppResult<ApiResponse<ChatWithMessages>> {
    chat_service::start_chat(&state, &user, payload).await
}

#[utoipa::path(
    get,
    path = "/api/chats",
    params(Pagination, ChatListQuery),
    responses((status = 200, description = "Chats visible to the caller", body = ApiResponse<ChatList>)),
    security(("bearer_auth" = [])),
    tag = "Chats"
)]
pub async fn list_chats(
    State(state): State<AppState>,
    user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
    AppQuery(query): AppQuery<ChatListQuery>,
) -> AppResult<ApiResponse<ChatList>> {
    chat_service::list_chats(&state, &user, query, pagination).await
}

#[utoipa::path(
    get,
    path = "/api/chats/unread-count",
    responses((status = 200, description = "Unread chats for the caller's side", body = ApiResponse<UnreadCount>)),
    security(("bearer_auth" = [])),
    tag = "Chats"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ApiResponse<UnreadCount>> {
    chat_service::unread_count(&state, &user).await
}

#[utoipa::path(
    get,
    path = "/api/chats/{id}",
    params(("id" = Uuid, Path, description = "Chat ID")),
    responses(
        (status = 200, description = "Chat with messages", body = ApiResponse<ChatWithMessages>),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = [])),
    tag = "Chats"
)]
pub async fn get_chat(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<ChatWithMessages>> {
    chat_service::get_chat(&state, &user, id).await
}

#[utoipa::path(
    post,
    path = "/api/chats/{id}/messages",
    params(("id" = Uuid, Path, description = "Chat ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = ApiResponse<ChatMessage>),
        (status = 400, description = "Empty message"),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = [])),
    tag = "Chats"
)]
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<SendMessageRequest>,
) -> AppResult<ApiResponse<ChatMessage>> {
    chat_service::send_message(&state, &user, id, payload).await
}

#[utoipa::path(
    patch,
    path = "/api/chats/{id}/read",
    params(("id" = Uuid, Path, description = "Chat ID")),
    responses((status = 200, description = "Marked as read", body = ApiResponse<Chat>)),
    security(("bearer_auth" = [])),
    tag = "Chats"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<Chat>> {
    chat_service::mark_read(&state, &user, id).await
}

#[utoipa::path(
    delete,
    path = "/api/chats/{id}",
    params(("id" = Uuid, Path, description = "Chat ID")),
    responses((status = 200, description = "Chat deleted")),
    security(("bearer_auth" = [])),
    tag = "Chats"
)]
pub async fn delete_chat(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    chat_service::delete_chat(&state, &user, id).await
}
