//! Conversation session state machine.
//!
//! [`ConversationSession`] holds everything the presentation layer shows for one
//! conversation and performs every transition synchronously. Network work is
//! split into a `begin_*` call that returns a ticket and a `complete_*` call
//! that consumes it. Each ticket carries the session generation it was issued
//! under; the generation advances whenever the active conversation changes, so
//! a completion whose generation no longer matches is a stale result and is
//! dropped without touching state.

pub mod store;
pub mod suggestions;
pub mod welcome;

use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::{
    ChatRequest, ChatResponse, Conversation, ConversationDetail, Message, SuggestionBatch,
    UserProfile,
};

use self::store::MessageStore;
use self::suggestions::SuggestionRegistry;
use self::welcome::welcome_message;

/// Shown in place of a reply when the chat exchange fails.
pub const NETWORK_ERROR_REPLY: &str = "Network error, please check your connection.";
/// Shown in place of the timeline when a conversation cannot be loaded.
pub const LOAD_ERROR_REPLY: &str = "Sorry, this conversation could not be loaded.";
/// Shown when the agent answered with an empty reply.
pub const EMPTY_REPLY: &str = "No reply.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No conversation selected; the timeline shows the welcome message.
    Empty,
    /// Fetching an existing conversation's history.
    Loading,
    Ready,
    /// A chat exchange for the active conversation is in flight.
    Sending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    pub conversation_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendTicket {
    generation: u64,
    pub request: ChatRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTicket {
    generation: u64,
    turn: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank text, a send already in flight, or a history load in progress.
    Rejected,
    /// The reply was appended. `adopted` is set when the backend assigned the
    /// conversation a new id that the caller should now track.
    Replied { adopted: Option<String> },
    /// The exchange failed and an apology was appended.
    Failed,
    /// The active conversation changed before the reply arrived.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// The conversation was already active; nothing was fetched.
    Unchanged,
    Failed,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(String),
    Failed,
    Stale,
}

/// Read-only copy of what the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub conversation_id: Option<String>,
    pub state: SessionState,
    pub messages: Vec<Message>,
    pub suggestions: Option<SuggestionBatch>,
    pub loading: bool,
    pub sending: bool,
}

#[derive(Debug)]
pub struct ConversationSession {
    conversation_id: Option<String>,
    display_name: Option<String>,
    state: SessionState,
    generation: u64,
    /// Number of sends accepted so far; lets a late create notice it was overtaken.
    turn: u64,
    /// Set from `begin_send` until its ticket completes, even across a switch.
    exchange_in_flight: bool,
    messages: MessageStore,
    suggestions: SuggestionRegistry,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationSession {
    pub fn new() -> Self {
        let mut messages = MessageStore::new();
        messages.push(welcome_message(None));
        Self {
            conversation_id: None,
            display_name: None,
            state: SessionState::Empty,
            generation: 0,
            turn: 0,
            exchange_in_flight: false,
            messages,
            suggestions: SuggestionRegistry::new(),
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn messages(&self) -> &[Message] {
        self.messages.as_slice()
    }

    pub fn suggestions(&self) -> &SuggestionRegistry {
        &self.suggestions
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    /// True while a chat exchange is unresolved, including one issued for a
    /// conversation that is no longer active.
    pub fn is_sending(&self) -> bool {
        self.exchange_in_flight
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            conversation_id: self.conversation_id.clone(),
            state: self.state,
            messages: self.messages.as_slice().to_vec(),
            suggestions: self.suggestions.current().cloned(),
            loading: self.is_loading(),
            sending: self.is_sending(),
        }
    }

    /// Remembers the user's name for future greetings and refreshes a
    /// greeting that is currently the only thing on screen.
    pub fn apply_profile(&mut self, profile: &UserProfile) {
        self.display_name = profile.display_name().map(str::to_string);
        if self.messages.is_welcome_only() {
            let welcome = self.welcome();
            self.messages.replace(vec![welcome]);
        }
    }

    /// Drops the active conversation and shows the greeting again.
    pub fn reset(&mut self) {
        self.advance_generation();
        self.conversation_id = None;
        self.state = SessionState::Empty;
        let welcome = self.welcome();
        self.messages.replace(vec![welcome]);
        self.suggestions.clear();
    }

    /// Makes `conversation_id` active and empties the timeline until its
    /// history arrives. Returns `None` when it is already the active one.
    pub fn begin_load(&mut self, conversation_id: &str) -> Option<LoadTicket> {
        if self.conversation_id.as_deref() == Some(conversation_id)
            && self.state != SessionState::Empty
        {
            return None;
        }
        self.advance_generation();
        self.conversation_id = Some(conversation_id.to_string());
        self.state = SessionState::Loading;
        self.messages.clear();
        self.suggestions.clear();
        Some(LoadTicket {
            generation: self.generation,
            conversation_id: conversation_id.to_string(),
        })
    }

    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<ConversationDetail, AppError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            debug!(
                conversation_id = %ticket.conversation_id,
                "Discarding history for a conversation that is no longer active"
            );
            return LoadOutcome::Stale;
        }
        self.state = SessionState::Ready;
        match result {
            Ok(detail) if detail.messages.is_empty() => {
                let welcome = self.welcome();
                self.messages.replace(vec![welcome]);
                LoadOutcome::Applied
            }
            Ok(detail) => {
                self.messages
                    .replace(detail.messages.into_iter().map(Message::from).collect());
                LoadOutcome::Applied
            }
            Err(e) => {
                warn!("Failed to load conversation {}: {e}", ticket.conversation_id);
                if e.is_not_found() {
                    // The next send starts a fresh conversation instead of
                    // addressing one the backend no longer has.
                    self.conversation_id = None;
                    self.state = SessionState::Empty;
                }
                self.messages.replace(vec![Message::assistant(LOAD_ERROR_REPLY)]);
                LoadOutcome::Failed
            }
        }
    }

    /// Appends the user's message right away and hands back the chat request
    /// to issue. Returns `None` for blank text or when the session is busy.
    pub fn begin_send(&mut self, text: &str) -> Option<SendTicket> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if self.exchange_in_flight || self.state == SessionState::Loading {
            debug!(
                state = ?self.state,
                in_flight = self.exchange_in_flight,
                "Ignoring send while busy"
            );
            return None;
        }

        self.messages.push(Message::user(text));
        self.suggestions.clear();
        self.state = SessionState::Sending;
        self.exchange_in_flight = true;
        self.turn += 1;

        Some(SendTicket {
            generation: self.generation,
            request: ChatRequest {
                message: text.to_string(),
                conversation_id: self.conversation_id.clone(),
            },
        })
    }

    pub fn complete_send(
        &mut self,
        ticket: SendTicket,
        result: Result<ChatResponse, AppError>,
    ) -> SendOutcome {
        self.exchange_in_flight = false;
        if ticket.generation != self.generation {
            debug!("Discarding chat reply issued for a previous conversation");
            return SendOutcome::Stale;
        }
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Chat exchange failed: {e}");
                self.messages.push(Message::assistant(NETWORK_ERROR_REPLY));
                self.settle();
                return SendOutcome::Failed;
            }
        };

        let adopted = response
            .conversation_id
            .filter(|id| !id.is_empty() && self.conversation_id.as_deref() != Some(id.as_str()));
        if let Some(id) = &adopted {
            debug!(conversation_id = %id, "Adopting conversation id from chat reply");
            self.conversation_id = Some(id.clone());
        }

        let reply = if response.reply.trim().is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            response.reply
        };
        self.messages.push(Message::assistant(reply));

        if let Some(batch) = response.suggestions {
            self.suggestions.set(batch);
        }
        self.settle();

        SendOutcome::Replied { adopted }
    }

    pub fn begin_create(&self) -> CreateTicket {
        CreateTicket {
            generation: self.generation,
            turn: self.turn,
        }
    }

    /// Switches to a freshly created conversation, unless the user moved on
    /// or started talking while it was being created.
    pub fn complete_create(
        &mut self,
        ticket: CreateTicket,
        result: Result<Conversation, AppError>,
    ) -> CreateOutcome {
        let conversation = match result {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!("Failed to create conversation: {e}");
                return CreateOutcome::Failed;
            }
        };
        if ticket.generation != self.generation || ticket.turn != self.turn {
            debug!(
                conversation_id = %conversation.id,
                "Discarding created conversation overtaken by later activity"
            );
            return CreateOutcome::Stale;
        }

        self.advance_generation();
        self.conversation_id = Some(conversation.id.clone());
        self.state = SessionState::Ready;
        let welcome = self.welcome();
        self.messages.replace(vec![welcome]);
        self.suggestions.clear();
        CreateOutcome::Created(conversation.id)
    }

    fn welcome(&self) -> Message {
        welcome_message(self.display_name.as_deref())
    }

    /// Leaves `Sending` for whichever idle state matches the conversation id.
    fn settle(&mut self) {
        self.state = if self.conversation_id.is_some() {
            SessionState::Ready
        } else {
            SessionState::Empty
        };
    }

    fn advance_generation(&mut self) {
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageRole, StoredMessage};
    use crate::session::welcome::WELCOME_MESSAGE_ID;

    fn reply(text: &str, conversation_id: Option<&str>) -> ChatResponse {
        ChatResponse {
            reply: text.to_string(),
            conversation_id: conversation_id.map(str::to_string),
            suggestions: None,
        }
    }

    fn detail(contents: &[&str]) -> ConversationDetail {
        ConversationDetail {
            messages: contents
                .iter()
                .map(|c| StoredMessage {
                    id: None,
                    role: MessageRole::User,
                    content: c.to_string(),
                    timestamp: None,
                })
                .collect(),
        }
    }

    fn conversation(id: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: "New conversation".into(),
            created_at: String::new(),
            updated_at: String::new(),
            summary: String::new(),
            tags: Default::default(),
            message_count: 0,
        }
    }

    fn contents(session: &ConversationSession) -> Vec<&str> {
        session.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn starts_empty_with_welcome() {
        let session = ConversationSession::new();
        assert_eq!(session.state(), SessionState::Empty);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].id, WELCOME_MESSAGE_ID);
        assert!(session.conversation_id().is_none());
    }

    #[test]
    fn send_appends_user_message_before_reply() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_send("  find me a job  ").unwrap();

        assert_eq!(session.state(), SessionState::Sending);
        assert_eq!(session.messages().len(), 2);
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, MessageRole::User);
        assert_eq!(last.content, "find me a job");
        assert_eq!(ticket.request.message, "find me a job");
        assert!(ticket.request.conversation_id.is_none());
    }

    #[test]
    fn blank_text_is_rejected() {
        let mut session = ConversationSession::new();
        assert!(session.begin_send("").is_none());
        assert!(session.begin_send(" \n\t ").is_none());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn second_send_while_in_flight_is_rejected() {
        let mut session = ConversationSession::new();
        let _first = session.begin_send("one").unwrap();
        assert!(session.begin_send("two").is_none());
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn reply_adopts_new_conversation_id() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_send("hello").unwrap();
        let outcome = session.complete_send(ticket, Ok(reply("hi!", Some("c1"))));

        assert_eq!(outcome, SendOutcome::Replied { adopted: Some("c1".into()) });
        assert_eq!(session.conversation_id(), Some("c1"));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(contents(&session)[1..], ["hello", "hi!"]);

        let ticket = session.begin_send("again").unwrap();
        assert_eq!(ticket.request.conversation_id.as_deref(), Some("c1"));
        let outcome = session.complete_send(ticket, Ok(reply("sure", Some("c1"))));
        assert_eq!(outcome, SendOutcome::Replied { adopted: None });
    }

    #[test]
    fn failed_exchange_appends_apology() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_send("hello").unwrap();
        let error = AppError::Status { endpoint: "/api/chat".into(), status: 500 };
        assert_eq!(session.complete_send(ticket, Err(error)), SendOutcome::Failed);

        let last = session.messages().last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert_eq!(last.content, NETWORK_ERROR_REPLY);
        assert!(!session.is_sending());
    }

    #[test]
    fn empty_reply_gets_placeholder() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_send("hello").unwrap();
        session.complete_send(ticket, Ok(reply("  ", None)));
        assert_eq!(session.messages().last().unwrap().content, EMPTY_REPLY);
    }

    #[test]
    fn suggestions_follow_latest_reply_only() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_send("hello").unwrap();
        let mut first = reply("hi", Some("c1"));
        first.suggestions = Some(SuggestionBatch {
            questions: vec!["Which city?".into()],
            actions: vec![],
        });
        session.complete_send(ticket, Ok(first));
        assert_eq!(session.suggestions().question(0), Some("Which city?"));

        let ticket = session.begin_send("Beijing").unwrap();
        assert!(session.suggestions().current().is_none());
        session.complete_send(ticket, Ok(reply("ok", Some("c1"))));
        assert!(session.suggestions().current().is_none());
    }

    #[test]
    fn stale_load_is_discarded() {
        let mut session = ConversationSession::new();
        let ticket_a = session.begin_load("a").unwrap();
        let ticket_b = session.begin_load("b").unwrap();
        assert!(session.messages().is_empty());

        assert_eq!(session.complete_load(ticket_b, Ok(detail(&["from b"]))), LoadOutcome::Applied);
        assert_eq!(session.complete_load(ticket_a, Ok(detail(&["from a"]))), LoadOutcome::Stale);
        assert_eq!(contents(&session), ["from b"]);
        assert_eq!(session.conversation_id(), Some("b"));
    }

    #[test]
    fn empty_history_yields_single_welcome() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_load("a").unwrap();
        session.complete_load(ticket, Ok(ConversationDetail::default()));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].id, WELCOME_MESSAGE_ID);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn failed_load_shows_apology() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_load("gone").unwrap();
        let outcome = session.complete_load(
            ticket,
            Err(AppError::ConversationNotFound { id: "gone".into() }),
        );
        assert_eq!(outcome, LoadOutcome::Failed);
        assert_eq!(contents(&session), [LOAD_ERROR_REPLY]);
        assert!(session.conversation_id().is_none());
        assert_eq!(session.state(), SessionState::Empty);

        let send = session.begin_send("hello").unwrap();
        assert!(send.request.conversation_id.is_none());
    }

    #[test]
    fn unreachable_history_keeps_the_conversation_selected() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_load("a").unwrap();
        let error = AppError::Status { endpoint: "/api/conversations/a".into(), status: 502 };
        assert_eq!(session.complete_load(ticket, Err(error)), LoadOutcome::Failed);
        assert_eq!(contents(&session), [LOAD_ERROR_REPLY]);
        assert_eq!(session.conversation_id(), Some("a"));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn reloading_the_active_conversation_is_a_no_op() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_send("hello").unwrap();
        session.complete_send(ticket, Ok(reply("hi", Some("c1"))));
        assert!(session.begin_load("c1").is_none());
        assert_eq!(session.messages().len(), 3);
    }

    #[test]
    fn send_is_rejected_while_loading() {
        let mut session = ConversationSession::new();
        let _ticket = session.begin_load("a").unwrap();
        assert!(session.begin_send("hello").is_none());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn reply_for_previous_conversation_is_discarded() {
        let mut session = ConversationSession::new();
        let send = session.begin_send("hello").unwrap();
        let load = session.begin_load("b").unwrap();
        session.complete_load(load, Ok(detail(&["from b"])));

        assert_eq!(session.complete_send(send, Ok(reply("late", Some("a")))), SendOutcome::Stale);
        assert_eq!(contents(&session), ["from b"]);
        assert_eq!(session.conversation_id(), Some("b"));
        assert_eq!(session.state(), SessionState::Ready);
        assert!(!session.is_sending());
    }

    #[test]
    fn switching_does_not_release_the_pending_exchange() {
        let mut session = ConversationSession::new();
        let first = session.begin_send("hello").unwrap();
        let load = session.begin_load("b").unwrap();
        session.complete_load(load, Ok(detail(&["from b"])));

        assert!(session.is_sending());
        assert!(session.view().sending);
        assert!(session.begin_send("again").is_none());
        assert_eq!(contents(&session), ["from b"]);

        assert_eq!(session.complete_send(first, Ok(reply("late", None))), SendOutcome::Stale);
        assert!(!session.is_sending());
        let second = session.begin_send("again").unwrap();
        assert_eq!(second.request.conversation_id.as_deref(), Some("b"));
        assert_eq!(contents(&session), ["from b", "again"]);
    }

    #[test]
    fn reset_does_not_release_the_pending_exchange() {
        let mut session = ConversationSession::new();
        let first = session.begin_send("hello").unwrap();
        session.reset();
        assert!(session.begin_send("again").is_none());

        let error = AppError::Status { endpoint: "/api/chat".into(), status: 500 };
        assert_eq!(session.complete_send(first, Err(error)), SendOutcome::Stale);
        assert_eq!(session.messages().len(), 1);
        assert!(session.begin_send("again").is_some());
    }

    #[test]
    fn create_then_send() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_create();
        let outcome = session.complete_create(ticket, Ok(conversation("new")));
        assert_eq!(outcome, CreateOutcome::Created("new".into()));
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.messages().len() == 1 && session.messages()[0].id == WELCOME_MESSAGE_ID);

        let send = session.begin_send("hello").unwrap();
        assert_eq!(send.request.conversation_id.as_deref(), Some("new"));
        session.complete_send(send, Ok(reply("hi", Some("new"))));
        assert_eq!(contents(&session)[1..], ["hello", "hi"]);
    }

    #[test]
    fn create_overtaken_by_send_is_discarded() {
        let mut session = ConversationSession::new();
        let create = session.begin_create();
        let send = session.begin_send("hello").unwrap();

        assert_eq!(session.complete_create(create, Ok(conversation("orphan"))), CreateOutcome::Stale);
        let outcome = session.complete_send(send, Ok(reply("hi", Some("c9"))));
        assert_eq!(outcome, SendOutcome::Replied { adopted: Some("c9".into()) });
        assert_eq!(contents(&session)[1..], ["hello", "hi"]);
    }

    #[test]
    fn create_overtaken_by_a_switch_is_discarded() {
        let mut session = ConversationSession::new();
        let create = session.begin_create();
        let load = session.begin_load("b").unwrap();
        session.complete_load(load, Ok(detail(&["from b"])));

        assert_eq!(session.complete_create(create, Ok(conversation("orphan"))), CreateOutcome::Stale);
        assert_eq!(session.conversation_id(), Some("b"));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(contents(&session), ["from b"]);
    }

    #[test]
    fn create_overtaken_by_a_reset_is_discarded() {
        let mut session = ConversationSession::new();
        let load = session.begin_load("a").unwrap();
        session.complete_load(load, Ok(detail(&["from a"])));
        let create = session.begin_create();
        session.reset();

        assert_eq!(session.complete_create(create, Ok(conversation("orphan"))), CreateOutcome::Stale);
        assert!(session.conversation_id().is_none());
        assert_eq!(session.state(), SessionState::Empty);
    }

    #[test]
    fn failed_create_leaves_session_untouched() {
        let mut session = ConversationSession::new();
        let ticket = session.begin_create();
        let error = AppError::Status { endpoint: "/api/conversations".into(), status: 503 };
        assert_eq!(session.complete_create(ticket, Err(error)), CreateOutcome::Failed);
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.conversation_id().is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn profile_refreshes_lone_greeting() {
        let mut session = ConversationSession::new();
        let profile = UserProfile { name: Some("Lin".into()), ..Default::default() };
        session.apply_profile(&profile);
        assert!(session.messages()[0].content.contains("Hello Lin"));

        let ticket = session.begin_send("hello").unwrap();
        session.complete_send(ticket, Ok(reply("hi", Some("c1"))));
        session.apply_profile(&UserProfile::default());
        assert!(session.messages()[0].content.contains("Hello Lin"));

        session.reset();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.messages()[0].content.contains("Hello there"));
    }
}
