//! Console adapter - Administrative commands and simulated interactions
//! read from stdin

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::domain::entities::{ContextTarget, Interaction};

/// One parsed console line
#[derive(Debug, Clone)]
pub enum ConsoleCommand {
    /// Reload configuration and reconcile commands
    Reload,
    Info,
    Help,
    Stop,
    /// Simulated inbound interaction
    Invoke(Interaction),
    Unknown(String),
    Empty,
}

/// (aliases, description) of the administrative commands
pub const SYSTEM_COMMANDS: &[(&str, &str)] = &[
    ("exit|stop", "Stop and close the connection of the bot."),
    ("info|i", "Get information about the bot."),
    ("reload|rl", "Reloads the configuration and re-registers the commands."),
    ("/<name> [args..]", "Simulate a slash command interaction."),
    ("ctx <user|message> <name>", "Simulate a context menu interaction."),
];

/// Parse a console line
pub fn parse_line(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }

    if let Some(rest) = line.strip_prefix('/') {
        let mut parts = rest.split_whitespace();
        let Some(name) = parts.next() else {
            return ConsoleCommand::Unknown(line.to_string());
        };
        let args: Vec<String> = parts.map(str::to_string).collect();
        return ConsoleCommand::Invoke(
            Interaction::slash(name)
                .with_user("console")
                .with_payload(serde_json::json!({ "args": args })),
        );
    }

    let mut parts = line.splitn(3, char::is_whitespace);
    let head = parts.next().unwrap_or_default().to_ascii_lowercase();
    match head.as_str() {
        "reload" | "rl" => ConsoleCommand::Reload,
        "info" | "i" => ConsoleCommand::Info,
        "help" | "h" | "?" => ConsoleCommand::Help,
        "exit" | "stop" => ConsoleCommand::Stop,
        "ctx" => {
            let target = parts.next().and_then(ContextTarget::parse);
            let name = parts.next().map(str::trim).filter(|n| !n.is_empty());
            match (target, name) {
                (Some(target), Some(name)) => {
                    ConsoleCommand::Invoke(Interaction::context(name, target).with_user("console"))
                }
                _ => ConsoleCommand::Unknown(line.to_string()),
            }
        }
        _ => ConsoleCommand::Unknown(line.to_string()),
    }
}

/// Console adapter for local operation
pub struct ConsoleAdapter {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Next command, or `None` once stdin is closed
    pub async fn next_command(&mut self) -> Option<ConsoleCommand> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(parse_line(&line)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read console input: {}", e);
                None
            }
        }
    }

    pub fn print_help(&self) {
        tracing::info!("----------------------------Help Commands-----------------------------");
        for (aliases, description) in SYSTEM_COMMANDS {
            tracing::info!("{} - {}", aliases, description);
        }
        tracing::info!("----------------------------Help Commands-----------------------------");
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::InteractionKind;

    #[test]
    fn test_system_commands() {
        assert!(matches!(parse_line("rl"), ConsoleCommand::Reload));
        assert!(matches!(parse_line("  RELOAD "), ConsoleCommand::Reload));
        assert!(matches!(parse_line("i"), ConsoleCommand::Info));
        assert!(matches!(parse_line("stop"), ConsoleCommand::Stop));
        assert!(matches!(parse_line(""), ConsoleCommand::Empty));
        assert!(matches!(parse_line("dance"), ConsoleCommand::Unknown(_)));
    }

    #[test]
    fn test_slash_invocation() {
        let ConsoleCommand::Invoke(event) = parse_line("/ban 123 spam") else {
            panic!("expected an invocation");
        };
        assert_eq!(event.name, "ban");
        assert_eq!(event.kind, InteractionKind::Slash);
        assert_eq!(event.payload["args"], serde_json::json!(["123", "spam"]));
    }

    #[test]
    fn test_context_invocation() {
        let ConsoleCommand::Invoke(event) = parse_line("ctx message Report Message") else {
            panic!("expected an invocation");
        };
        assert_eq!(event.name, "Report Message");
        assert_eq!(event.kind, InteractionKind::Context(ContextTarget::Message));

        assert!(matches!(parse_line("ctx channel Pin"), ConsoleCommand::Unknown(_)));
        assert!(matches!(parse_line("/"), ConsoleCommand::Unknown(_)));
    }
}
