use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};

/// Matches the backend conversation summary returned by the history endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub message_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the active conversation as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A message as stored by the backend; older records may lack an id.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<StoredMessage> for Message {
    fn from(stored: StoredMessage) -> Self {
        Self {
            id: stored
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            role: stored.role,
            content: stored.content,
            timestamp: stored.timestamp,
        }
    }
}

/// Response of `GET /api/conversations/{id}`. Only the message list matters here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationDetail {
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
}

/// Response of `GET /api/config`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub preferences: HashMap<String, serde_json::Value>,
}

impl UserProfile {
    /// The name to greet the user with, if one is configured.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Send,
    Navigate,
    Upload,
    #[serde(other)]
    Unknown,
}

/// A shortcut proposed by the agent alongside its reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

/// Follow-up questions and actions attached to one assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SuggestionBatch {
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl SuggestionBatch {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty() && self.actions.is_empty()
    }
}

/// Request body for `POST /api/conversations`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationRequest {
    pub title: String,
}

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Response of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_suggestions")]
    pub suggestions: Option<SuggestionBatch>,
}

/// The backend defaults `suggestions` to an empty list when the agent proposed
/// nothing, so only an object is taken as a batch.
fn lenient_suggestions<'de, D>(deserializer: D) -> Result<Option<SuggestionBatch>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(value @ serde_json::Value::Object(_)) => match serde_json::from_value(value) {
            Ok(batch) => Some(batch),
            Err(e) => {
                tracing::debug!("Ignoring unreadable suggestion batch: {e}");
                None
            }
        },
        _ => None,
    })
}
