//! Backend endpoints consumed by the chat client.

mod http_gateway;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse, Conversation, ConversationDetail, UserProfile};

pub use http_gateway::HttpGateway;

/// The backend as seen by a chat session. The session owns none of this data.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// `GET /api/config`
    async fn fetch_profile(&self) -> Result<UserProfile, AppError>;

    /// `GET /api/conversations`
    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, AppError>;

    /// `GET /api/conversations/{id}`
    async fn fetch_conversation(&self, id: &str) -> Result<ConversationDetail, AppError>;

    /// `POST /api/conversations`
    async fn create_conversation(&self, title: &str) -> Result<Conversation, AppError>;

    /// `DELETE /api/conversations/{id}`
    async fn delete_conversation(&self, id: &str) -> Result<(), AppError>;

    /// `POST /api/chat`
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, AppError>;
}
