use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::errors::AppError;
use crate::models::{
    ChatRequest, ChatResponse, Conversation, ConversationDetail, CreateConversationRequest,
    UserProfile,
};

use super::ChatGateway;

/// [`ChatGateway`] over the backend's JSON HTTP API.
///
/// No request timeout is configured: a hung exchange stays in flight until the
/// server answers or the connection drops.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Fails on non-success statuses, then decodes the body as `T`.
async fn decode<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T, AppError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(AppError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }
    let body = resp
        .text()
        .await
        .map_err(|e| AppError::transport(endpoint, e))?;
    serde_json::from_str(&body).map_err(|e| AppError::malformed(endpoint, e))
}

#[async_trait]
impl ChatGateway for HttpGateway {
    async fn fetch_profile(&self) -> Result<UserProfile, AppError> {
        let endpoint = "/api/config";
        let resp = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| AppError::transport(endpoint, e))?;
        decode(endpoint, resp).await
    }

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>, AppError> {
        let endpoint = "/api/conversations";
        let resp = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| AppError::transport(endpoint, e))?;
        decode(endpoint, resp).await
    }

    async fn fetch_conversation(&self, id: &str) -> Result<ConversationDetail, AppError> {
        let endpoint = format!("/api/conversations/{id}");
        let resp = self
            .client
            .get(self.url(&endpoint))
            .send()
            .await
            .map_err(|e| AppError::transport(&endpoint, e))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(AppError::ConversationNotFound { id: id.to_string() });
        }
        decode(&endpoint, resp).await
    }

    async fn create_conversation(&self, title: &str) -> Result<Conversation, AppError> {
        let endpoint = "/api/conversations";
        let body = CreateConversationRequest { title: title.to_string() };
        let resp = self
            .client
            .post(self.url(endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::transport(endpoint, e))?;
        decode(endpoint, resp).await
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), AppError> {
        let endpoint = format!("/api/conversations/{id}");
        let resp = self
            .client
            .delete(self.url(&endpoint))
            .send()
            .await
            .map_err(|e| AppError::transport(&endpoint, e))?;
        // A conversation that is already gone counts as deleted.
        if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(AppError::Status {
                endpoint,
                status: resp.status().as_u16(),
            })
        }
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let endpoint = "/api/chat";
        let resp = self
            .client
            .post(self.url(endpoint))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::transport(endpoint, e))?;
        decode(endpoint, resp).await
    }
}
