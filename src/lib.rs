//! Conversation controller for the job-search assistant.
//!
//! The [`session::ConversationSession`] state machine owns the active
//! conversation's timeline and suggestions; [`service::ChatService`] drives it
//! against the backend through an [`api::ChatGateway`].

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod models;
pub mod navigation;
pub mod service;
pub mod session;
