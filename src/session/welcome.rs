use crate::models::{Message, MessageRole};

/// Stable id of the synthesized greeting. It never reaches the backend.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

const DEFAULT_DISPLAY_NAME: &str = "there";

/// Greeting shown when there is no conversation yet, or the loaded one is empty.
pub fn welcome_text(display_name: Option<&str>) -> String {
    let name = display_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_DISPLAY_NAME);
    format!(
        "### 👋 Hello {name}\n\
         I'm your job-search assistant. I can submit applications for you, \
         polish your career profile, or answer questions about your job hunt.\n\n\
         **Try asking me:**\n\
         - Apply to product manager roles in Beijing for me\n\
         - Improve my resume\n\
         - Recommend some well-paid positions"
    )
}

pub fn welcome_message(display_name: Option<&str>) -> Message {
    Message {
        id: WELCOME_MESSAGE_ID.to_string(),
        role: MessageRole::Assistant,
        content: welcome_text(display_name),
        timestamp: None,
    }
}
