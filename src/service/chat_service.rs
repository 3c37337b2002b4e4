use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::api::ChatGateway;
use crate::dispatcher::{interpret, Command, Navigator};
use crate::errors::AppError;
use crate::models::{Action, Conversation};
use crate::session::{
    ConversationSession, CreateOutcome, LoadOutcome, SendOutcome, SessionView,
};

/// What happened to an action handed to [`ChatService::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent(SendOutcome),
    Navigated(String),
    Dropped,
}

/// Drives one [`ConversationSession`] against the backend.
///
/// Cheap to clone; clones share the same session. The session lock is only
/// held to begin or complete an operation, never across a network call, so
/// operations started from different tasks may overlap and finish in any
/// order. The session's generation tickets decide which results still apply.
#[derive(Clone)]
pub struct ChatService {
    session: Arc<Mutex<ConversationSession>>,
    gateway: Arc<dyn ChatGateway>,
    navigator: Arc<dyn Navigator>,
    conversation_title: String,
}

impl ChatService {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        navigator: Arc<dyn Navigator>,
        conversation_title: impl Into<String>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(ConversationSession::new())),
            gateway,
            navigator,
            conversation_title: conversation_title.into(),
        }
    }

    fn session(&self) -> MutexGuard<'_, ConversationSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn view(&self) -> SessionView {
        self.session().view()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.session().conversation_id().map(str::to_string)
    }

    /// Fetches the user profile to personalize greetings. Failures are ignored.
    pub async fn load_profile(&self) {
        match self.gateway.fetch_profile().await {
            Ok(profile) => self.session().apply_profile(&profile),
            Err(e) => debug!("Profile unavailable, greeting without a name: {e}"),
        }
    }

    pub async fn send(&self, text: &str) -> SendOutcome {
        let Some(ticket) = self.session().begin_send(text) else {
            return SendOutcome::Rejected;
        };
        let result = self.gateway.send_chat(&ticket.request).await;
        self.session().complete_send(ticket, result)
    }

    /// Sends the suggested follow-up question at `index`, if there is one.
    pub async fn ask_suggested(&self, index: usize) -> SendOutcome {
        let question = self.session().suggestions().question(index).map(str::to_string);
        match question {
            Some(question) => self.send(&question).await,
            None => SendOutcome::Rejected,
        }
    }

    /// Runs the suggested action at `index`, if there is one.
    pub async fn run_suggested_action(&self, index: usize) -> DispatchOutcome {
        let action = self.session().suggestions().action(index).cloned();
        match action {
            Some(action) => self.dispatch(&action).await,
            None => DispatchOutcome::Dropped,
        }
    }

    pub async fn dispatch(&self, action: &Action) -> DispatchOutcome {
        match interpret(action) {
            Some(Command::Send(message)) => DispatchOutcome::Sent(self.send(&message).await),
            Some(Command::Navigate(target)) => {
                self.navigator.navigate(&target);
                DispatchOutcome::Navigated(target)
            }
            None => DispatchOutcome::Dropped,
        }
    }

    /// Makes `conversation_id` active and loads its history.
    pub async fn switch_to(&self, conversation_id: &str) -> LoadOutcome {
        let Some(ticket) = self.session().begin_load(conversation_id) else {
            return LoadOutcome::Unchanged;
        };
        let result = self.gateway.fetch_conversation(conversation_id).await;
        self.session().complete_load(ticket, result)
    }

    /// Creates a backend conversation and switches to it.
    pub async fn start_new(&self) -> CreateOutcome {
        let ticket = self.session().begin_create();
        let result = self.gateway.create_conversation(&self.conversation_title).await;
        let outcome = self.session().complete_create(ticket, result);
        if let CreateOutcome::Created(id) = &outcome {
            info!(conversation_id = %id, "Started new conversation");
        }
        outcome
    }

    /// Leaves the active conversation without contacting the backend.
    pub fn reset(&self) {
        self.session().reset();
    }

    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, AppError> {
        self.gateway.fetch_conversations().await
    }

    /// Deletes a conversation; deleting the active one resets the session.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), AppError> {
        self.gateway.delete_conversation(conversation_id).await?;
        let mut session = self.session();
        if session.conversation_id() == Some(conversation_id) {
            session.reset();
        }
        Ok(())
    }
}
