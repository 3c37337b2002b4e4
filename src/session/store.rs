use crate::models::Message;

use super::welcome::WELCOME_MESSAGE_ID;

/// Ordered timeline of the active conversation.
///
/// Appends are the only incremental change; everything else replaces the
/// whole timeline at once, which is how a conversation switch never shows
/// messages from two conversations together.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// True while the timeline holds nothing but the synthesized greeting.
    pub fn is_welcome_only(&self) -> bool {
        matches!(self.messages.as_slice(), [only] if only.id == WELCOME_MESSAGE_ID)
    }
}
