use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Chat, ChatMessage};

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChatListQuery {
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatWithMessages {
    pub chat: Chat,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ChatList {
    #[schema(value_type = Vec<Chat>)]
    pub items: Vec<Chat>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCount {
    pub unread: i64,
}
