use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{LockType, NullOrdering, OnConflict},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::chats::{ChatList, ChatListQuery, ChatWithMessages, SendMessageRequest, StartChatRequest, UnreadCount},
    entity::{
        chat_messages::{ActiveModel as MessageActive, Column as MessageCol, Entity as ChatMessages},
        chats::{ActiveModel as ChatActive, Column as ChatCol, Entity as Chats, Model as ChatModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_management, ensure_role},
    models::{Chat, ChatMessage, Role, SenderRole},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{
        auth_service::require_text,
        mapping::{chat_from_entity, chat_message_from_entity},
    },
    state::AppState,
};

/// Read flags `(is_read_by_customer, is_read_by_staff)` once `sender` has posted.
pub fn read_flags_after_send(sender: SenderRole) -> (bool, bool) {
    match sender {
        SenderRole::Customer => (true, false),
        SenderRole::Staff => (false, true),
    }
}

/// Which side of the conversation the caller speaks for, if any.
pub fn sender_side(chat: &ChatModel, user: &AuthUser) -> Option<SenderRole> {
    if chat.customer_id == user.user_id {
        Some(SenderRole::Customer)
    } else if user.is_staff() {
        Some(SenderRole::Staff)
    } else {
        None
    }
}

fn unread_condition(user: &AuthUser) -> Condition {
    if user.is_staff() {
        Condition::all().add(ChatCol::IsReadByStaff.eq(false))
    } else {
        Condition::all()
            .add(ChatCol::CustomerId.eq(user.user_id))
            .add(ChatCol::IsReadByCustomer.eq(false))
    }
}

async fn find_chat<C: ConnectionTrait>(conn: &C, id: Uuid, lock: bool) -> AppResult<ChatModel> {
    let mut finder = Chats::find_by_id(id);
    if lock {
        finder = finder.lock(LockType::Update);
    }
    finder.one(conn).await?.ok_or(AppError::NotFound("Chat"))
}

async fn messages_of<C: ConnectionTrait>(conn: &C, chat_id: Uuid) -> AppResult<Vec<ChatMessage>> {
    let messages = ChatMessages::find()
        .filter(MessageCol::ChatId.eq(chat_id))
        .order_by_asc(MessageCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(chat_message_from_entity)
        .collect();
    Ok(messages)
}

/// Appends a message and flips the read flags. Runs inside the caller's connection.
async fn post_message<C: ConnectionTrait>(
    conn: &C,
    chat: ChatModel,
    user: &AuthUser,
    side: SenderRole,
    content: String,
) -> AppResult<(ChatModel, ChatMessage)> {
    let message = MessageActive {
        id: Set(Uuid::new_v4()),
        chat_id: Set(chat.id),
        sender_id: Set(user.user_id),
        sender_role: Set(side.as_str().into()),
        content: Set(content.clone()),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    let (read_by_customer, read_by_staff) = read_flags_after_send(side);
    let needs_staff = side == SenderRole::Staff && chat.staff_id.is_none();

    let mut active: ChatActive = chat.into();
    active.last_message = Set(Some(content));
    active.last_message_at = Set(Some(message.created_at));
    active.is_read_by_customer = Set(read_by_customer);
    active.is_read_by_staff = Set(read_by_staff);
    if needs_staff {
        active.staff_id = Set(Some(user.user_id));
    }
    active.updated_at = Set(Utc::now().into());
    let chat = active.update(conn).await?;

    Ok((chat, chat_message_from_entity(message)))
}

pub async fn start_chat(
    state: &AppState,
    user: &AuthUser,
    payload: StartChatRequest,
) -> AppResult<ApiResponse<ChatWithMessages>> {
    ensure_role(user, &[Role::Customer])?;
    let first_message = payload
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    // one chat per customer; a concurrent start lands on the same row
    let txn = state.orm.begin().await?;
    let inserted = Chats::insert(ChatActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.user_id),
        staff_id: Set(None),
        last_message: Set(None),
        last_message_at: Set(None),
        is_read_by_customer: Set(true),
        is_read_by_staff: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    })
    .on_conflict(OnConflict::column(ChatCol::CustomerId).do_nothing().to_owned())
    .exec_without_returning(&txn)
    .await?;
    let created = inserted > 0;

    let mut chat = Chats::find()
        .filter(ChatCol::CustomerId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Chat"))?;

    if let Some(content) = first_message {
        let (updated, _) = post_message(&txn, chat, user, SenderRole::Customer, content).await?;
        chat = updated;
    }

    let messages = messages_of(&txn, chat.id).await?;
    txn.commit().await?;

    let data = ChatWithMessages {
        chat: chat_from_entity(chat),
        messages,
    };
    if created {
        tracing::info!(chat_id = %data.chat.id, customer_id = %user.user_id, "chat opened");
        Ok(ApiResponse::created("Chat started", data))
    } else {
        Ok(ApiResponse::success("Chat", data, Some(Meta::empty())))
    }
}

pub async fn list_chats(
    state: &AppState,
    user: &AuthUser,
    query: ChatListQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<ChatList>> {
    let (page, limit, offset) = pagination.normalize();

    let condition = if query.unread_only == Some(true) {
        unread_condition(user)
    } else if user.is_staff() {
        Condition::all()
    } else {
        Condition::all().add(ChatCol::CustomerId.eq(user.user_id))
    };

    let finder = Chats::find()
        .filter(condition)
        .order_by_with_nulls(ChatCol::LastMessageAt, Order::Desc, NullOrdering::Last)
        .order_by_desc(ChatCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(chat_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Chats",
        ChatList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn unread_count(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UnreadCount>> {
    let unread = Chats::find()
        .filter(unread_condition(user))
        .count(&state.orm)
        .await? as i64;
    Ok(ApiResponse::success("Unread", UnreadCount { unread }, None))
}

pub async fn get_chat(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ChatWithMessages>> {
    let chat = find_chat(&state.orm, id, false).await?;
    if sender_side(&chat, user).is_none() {
        return Err(AppError::Forbidden);
    }

    let messages = messages_of(&state.orm, chat.id).await?;
    Ok(ApiResponse::success(
        "Chat",
        ChatWithMessages {
            chat: chat_from_entity(chat),
            messages,
        },
        Some(Meta::empty()),
    ))
}

pub async fn send_message(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SendMessageRequest,
) -> AppResult<ApiResponse<ChatMessage>> {
    let content = require_text("content", &payload.content)?;

    let txn = state.orm.begin().await?;
    let chat = find_chat(&txn, id, true).await?;
    let side = sender_side(&chat, user).ok_or(AppError::Forbidden)?;
    let (_, message) = post_message(&txn, chat, user, side, content).await?;
    txn.commit().await?;

    tracing::debug!(chat_id = %id, sender = %side, "chat message sent");
    Ok(ApiResponse::created("Message sent", message))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Chat>> {
    let chat = find_chat(&state.orm, id, false).await?;
    let side = sender_side(&chat, user).ok_or(AppError::Forbidden)?;

    let mut active: ChatActive = chat.into();
    match side {
        SenderRole::Customer => active.is_read_by_customer = Set(true),
        SenderRole::Staff => active.is_read_by_staff = Set(true),
    }
    let chat = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Marked as read",
        chat_from_entity(chat),
        Some(Meta::empty()),
    ))
}

pub async fn delete_chat(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_management(user)?;
    let result = Chats::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Chat"));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "chat_delete",
        "chats",
        serde_json::json!({ "chat_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_for(customer_id: Uuid) -> ChatModel {
        let now = Utc::now().into();
        ChatModel {
            id: Uuid::new_v4(),
            customer_id,
            staff_id: None,
            last_message: None,
            last_message_at: None,
            is_read_by_customer: true,
            is_read_by_staff: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn caller(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn sending_marks_the_other_side_unread() {
        assert_eq!(read_flags_after_send(SenderRole::Customer), (true, false));
        assert_eq!(read_flags_after_send(SenderRole::Staff), (false, true));
    }

    #[test]
    fn participants_are_resolved_by_ownership_then_role() {
        let customer = caller(Role::Customer);
        let chat = chat_for(customer.user_id);

        assert_eq!(sender_side(&chat, &customer), Some(SenderRole::Customer));
        assert_eq!(sender_side(&chat, &caller(Role::Employee)), Some(SenderRole::Staff));
        assert_eq!(sender_side(&chat, &caller(Role::Customer)), None);
        assert_eq!(sender_side(&chat, &caller(Role::Shipper)), None);
    }
}
