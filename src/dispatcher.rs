//! Routing of agent-proposed actions.
//!
//! Actions come from the agent process and are taken as-is: anything that
//! lacks the field its type needs is dropped without telling the user.

use tracing::debug;

use crate::models::{Action, ActionKind};

/// Receives navigation requests. Implemented by whatever owns the screens.
pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &str);
}

/// What a valid action asks the client to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Navigate(String),
}

/// Validates `action` against its declared type. Returns `None` for actions
/// that are reserved, unknown, or missing their companion field.
pub fn interpret(action: &Action) -> Option<Command> {
    let command = match action.kind {
        ActionKind::Send => required(&action.message).map(Command::Send),
        ActionKind::Navigate => required(&action.target).map(Command::Navigate),
        ActionKind::Upload | ActionKind::Unknown => None,
    };
    if command.is_none() {
        debug!(label = %action.label, kind = ?action.kind, "Dropping action");
    }
    command
}

fn required(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
