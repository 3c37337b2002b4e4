use std::str::FromStr;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::dispatcher::Navigator;

/// Screens an action can point the user at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Chat,
    History,
    Knowledge,
    Tasks,
    Settings,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Chat => "chat",
            Tab::History => "history",
            Tab::Knowledge => "knowledge",
            Tab::Tasks => "tasks",
            Tab::Settings => "settings",
        }
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "chat" => Ok(Tab::Chat),
            "history" => Ok(Tab::History),
            "knowledge" => Ok(Tab::Knowledge),
            "tasks" => Ok(Tab::Tasks),
            "settings" => Ok(Tab::Settings),
            other => Err(format!("Unknown tab: {other}")),
        }
    }
}

/// Tracks the active tab. Targets that name no tab are ignored.
#[derive(Debug, Default)]
pub struct TabRouter {
    active: Mutex<Tab>,
}

impl TabRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Tab {
        *self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn select(&self, tab: Tab) {
        *self.active.lock().unwrap_or_else(|e| e.into_inner()) = tab;
    }
}

impl Navigator for TabRouter {
    fn navigate(&self, target: &str) {
        match target.parse::<Tab>() {
            Ok(tab) => {
                info!(%tab, "Navigating");
                self.select(tab);
            }
            Err(e) => debug!("Ignoring navigation request: {e}"),
        }
    }
}
