use std::sync::Arc;

use job_assistant_chat::api::HttpGateway;
use job_assistant_chat::config::Config;
use job_assistant_chat::models::Message;
use job_assistant_chat::navigation::TabRouter;
use job_assistant_chat::service::{ChatService, DispatchOutcome};
use job_assistant_chat::session::{CreateOutcome, LoadOutcome, SendOutcome, SessionView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

const HELP: &str = "\
Commands:
  /new            start a new conversation
  /open <id>      switch to an existing conversation
  /history        list conversations
  /delete <id>    delete a conversation
  /ask <n>        send suggested question n
  /do <n>         run suggested action n
  /reset          leave the current conversation
  /help           show this help
  /quit           exit
Anything else is sent as a message.";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Send(String),
    New,
    Open(String),
    History,
    Delete(String),
    Ask(usize),
    Do(usize),
    Reset,
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return ReplCommand::Send(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let index = |arg: &str| -> Option<usize> { arg.parse::<usize>().ok()?.checked_sub(1) };

    match (name, arg) {
        ("new", "") => ReplCommand::New,
        ("history", "") => ReplCommand::History,
        ("reset", "") => ReplCommand::Reset,
        ("help", "") => ReplCommand::Help,
        ("quit" | "exit", "") => ReplCommand::Quit,
        ("open", id) if !id.is_empty() => ReplCommand::Open(id.to_string()),
        ("delete", id) if !id.is_empty() => ReplCommand::Delete(id.to_string()),
        ("ask", n) => index(n).map_or_else(|| ReplCommand::Invalid(line.to_string()), ReplCommand::Ask),
        ("do", n) => index(n).map_or_else(|| ReplCommand::Invalid(line.to_string()), ReplCommand::Do),
        _ => ReplCommand::Invalid(line.to_string()),
    }
}

/// Prints the timeline incrementally, starting over when it was replaced.
#[derive(Default)]
struct Transcript {
    conversation_id: Option<String>,
    shown: Vec<Message>,
}

impl Transcript {
    /// True when `view` only appends to what is already on screen.
    fn continues(&self, view: &SessionView) -> bool {
        let grown_prefix = view.messages.len() >= self.shown.len()
            && view.messages[..self.shown.len()] == self.shown[..];
        let same_conversation = match (&self.conversation_id, &view.conversation_id) {
            (before, now) if before == now => true,
            // A first reply assigns the id without replacing the timeline.
            (None, Some(_)) => view.messages.len() > self.shown.len(),
            _ => false,
        };
        grown_prefix && same_conversation
    }

    fn render(&mut self, view: &SessionView) {
        if !self.continues(view) {
            let title = view.conversation_id.as_deref().unwrap_or("new conversation");
            println!("\n── {title} ──");
            self.shown.clear();
        }
        self.conversation_id = view.conversation_id.clone();
        for message in &view.messages[self.shown.len()..] {
            print_message(message);
            self.shown.push(message.clone());
        }
        if let Some(batch) = &view.suggestions {
            for (i, question) in batch.questions.iter().enumerate() {
                println!("  [ask {}] {question}", i + 1);
            }
            for (i, action) in batch.actions.iter().enumerate() {
                println!("  [do {}] {}", i + 1, action.label);
            }
        }
    }
}

fn print_message(message: &Message) {
    println!("\n{}> {}", message.role, message.content);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "job_assistant_chat=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    info!("Using backend at {}", config.api_base_url);

    let router = Arc::new(TabRouter::new());
    let service = ChatService::new(
        Arc::new(HttpGateway::new(&config.api_base_url)),
        router.clone(),
        config.conversation_title.clone(),
    );
    service.load_profile().await;

    let mut transcript = Transcript::default();
    transcript.render(&service.view());
    println!("\n(/help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            ReplCommand::Send(text) => {
                if service.send(&text).await == SendOutcome::Rejected {
                    continue;
                }
            }
            ReplCommand::New => {
                if service.start_new().await == CreateOutcome::Failed {
                    println!("Could not start a new conversation.");
                }
            }
            ReplCommand::Open(id) => {
                if service.switch_to(&id).await == LoadOutcome::Unchanged {
                    println!("Already in {id}.");
                }
            }
            ReplCommand::History => match service.list_conversations().await {
                Ok(conversations) if conversations.is_empty() => println!("No conversations yet."),
                Ok(conversations) => {
                    for c in conversations {
                        println!("{}  {}  ({} messages, updated {})", c.id, c.title, c.message_count, c.updated_at);
                    }
                }
                Err(e) if e.is_transport() => println!("The backend is unreachable, try again later."),
                Err(e) => error!("Failed to list conversations: {e}"),
            },
            ReplCommand::Delete(id) => {
                match service.delete_conversation(&id).await {
                    Ok(()) => {}
                    Err(e) if e.is_transport() => println!("The backend is unreachable, {id} was kept."),
                    Err(e) => error!("Failed to delete conversation {id}: {e}"),
                }
            }
            ReplCommand::Ask(index) => {
                if service.ask_suggested(index).await == SendOutcome::Rejected {
                    println!("No such suggestion.");
                }
            }
            ReplCommand::Do(index) => match service.run_suggested_action(index).await {
                DispatchOutcome::Navigated(_) => println!("[{}]", router.active()),
                DispatchOutcome::Dropped => println!("Nothing to do."),
                DispatchOutcome::Sent(_) => {}
            },
            ReplCommand::Reset => service.reset(),
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(input) => println!("Unknown command: {input}"),
        }
        transcript.render(&service.view());
    }

    Ok(())
}
