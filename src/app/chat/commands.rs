use crate::app::Session;
use crate::app::types::Message;
use crate::backends::Provider;
use crate::catalog::{CATALOG, ContextId};

/// Messages shown by `/history all`
const GLOBAL_HISTORY_LIMIT: usize = 20;

/// What the interactive loop should do after a line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Not a slash command; run it through the pipeline
    Chat(String),
    /// Handled locally; print the text
    Reply(String),
    Quit,
}

pub fn help_text() -> String {
    let mut lines = vec![
        "Commands:".to_string(),
        "  /model <gemini|deepseek>  - Switch the text-generation provider".to_string(),
        "  /context <id>             - Pin the session to a context".to_string(),
        "  /home                     - Return to the unrouted dashboard".to_string(),
        "  /history                  - Show the current context's conversation".to_string(),
        "  /history all              - Show the latest messages across all contexts".to_string(),
        "  /help                     - Show this help".to_string(),
        "  /quit                     - Exit".to_string(),
        String::new(),
        "Contexts:".to_string(),
    ];
    lines.extend(
        CATALOG
            .iter()
            .map(|config| {
                format!(
                    "  {:<10} {} - {}",
                    config.id.as_str(),
                    config.name,
                    config.description
                )
            }),
    );
    lines.join("\n")
}

impl Session {
    /// Handles slash commands; anything else is returned for the pipeline.
    pub fn handle_command(&mut self, input: &str) -> CommandOutcome {
        let content = input.trim();
        if !content.starts_with('/') {
            return CommandOutcome::Chat(content.to_string());
        }

        let mut parts = content.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let argument = parts.next().unwrap_or_default().trim();

        match command {
            "/quit" | "/exit" => CommandOutcome::Quit,
            "/help" => CommandOutcome::Reply(help_text()),
            "/home" => {
                self.pin_context(ContextId::Dashboard);
                CommandOutcome::Reply("Back on the dashboard; the next request is routed automatically.".to_string())
            }
            "/model" => self.switch_provider(argument),
            "/context" => self.switch_context(argument),
            "/history" if argument == "all" => CommandOutcome::Reply(self.render_recent()),
            "/history" => CommandOutcome::Reply(self.render_history()),
            other => CommandOutcome::Reply(format!("Unknown command: {other}. Type /help for commands.")),
        }
    }

    fn switch_provider(&mut self, argument: &str) -> CommandOutcome {
        if argument.is_empty() {
            return CommandOutcome::Reply(format!("Current provider: {}", self.provider()));
        }
        match argument.parse::<Provider>() {
            Ok(provider) => {
                self.set_provider(provider);
                CommandOutcome::Reply(format!("Provider set to {provider}"))
            }
            Err(error) => CommandOutcome::Reply(format!("Usage: /model <gemini|deepseek> ({error})")),
        }
    }

    fn switch_context(&mut self, argument: &str) -> CommandOutcome {
        if argument.is_empty() {
            return CommandOutcome::Reply(format!("Current context: {}", self.current_context()));
        }
        match argument.parse::<ContextId>() {
            Ok(context) => {
                self.pin_context(context);
                let name = context.display_name().unwrap_or("dashboard");
                CommandOutcome::Reply(format!("Context pinned: {name}"))
            }
            Err(error) => CommandOutcome::Reply(format!("Usage: /context <id> ({error})")),
        }
    }

    fn render_history(&self) -> String {
        let history = self.history();
        if history.is_empty() {
            return "No messages in this context yet.".to_string();
        }
        history
            .into_iter()
            .map(|message| history_line(message, false))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_recent(&self) -> String {
        if self.store.is_empty() {
            return "No messages yet.".to_string();
        }
        self.store
            .recent(GLOBAL_HISTORY_LIMIT)
            .iter()
            .map(|message| history_line(message, true))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn history_line(message: &Message, with_context: bool) -> String {
    let who = if message.is_user() { "you" } else { "alphadeal" };
    let time = message.timestamp.format("%H:%M");
    if with_context {
        let context = message
            .context
            .and_then(ContextId::display_name)
            .unwrap_or("dashboard");
        format!("[{time}] ({context}) {who}: {}", message.text)
    } else {
        format!("[{time}] {who}: {}", message.text)
    }
}
