//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

use crate::chat::config::{MAX_TYPING_SPEED_MS, MIN_TYPING_SPEED_MS};
use crate::chat::render::Theme;

/// Suggested starting topics, shown while the transcript is empty.
///
/// Picking one prefills the prompt with its text.
pub const CATEGORIES: [&str; 4] = [
    "💡 General knowledge",
    "🔧 Technical questions",
    "📝 Writing assistance",
    "🤔 Problem solving",
];

/// Returns the category for a one-based `/pick` number.
pub fn category(number: usize) -> Option<&'static str> {
    number.checked_sub(1).and_then(|i| CATEGORIES.get(i)).copied()
}

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation and return to the welcome screen.
    Clear,

    /// Edit a previous question and resend it.
    Edit {
        /// One-based message number as shown by `/history`.
        number: usize,
        /// Replacement text; `None` asks for it interactively.
        text: Option<String>,
    },

    /// Re-render the whole transcript.
    History,

    /// Set the typing speed in milliseconds per word.
    Speed(u64),

    /// Set the theme; `None` toggles between light and dark.
    Theme(Option<Theme>),

    /// List the suggested prompt categories.
    Suggest,

    /// Prefill the prompt with a suggested category (one-based).
    Pick(usize),

    /// Change the model.
    Model(String),

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a valid command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use nexus::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/speed 80").is_some());
/// assert!(parse_command("Hello there!").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "home" => ChatCommand::Clear,
        "edit" => parse_edit(argument),
        "history" => ChatCommand::History,
        "speed" => match argument {
            Some(arg) => match arg.parse::<u64>() {
                Ok(ms) if (MIN_TYPING_SPEED_MS..=MAX_TYPING_SPEED_MS).contains(&ms) => {
                    ChatCommand::Speed(ms)
                }
                _ => ChatCommand::Invalid(format!(
                    "/speed expects milliseconds between {MIN_TYPING_SPEED_MS} and {MAX_TYPING_SPEED_MS}"
                )),
            },
            None => ChatCommand::Invalid("/speed requires a value".to_string()),
        },
        "theme" => match argument {
            Some(arg) => match arg.parse::<Theme>() {
                Ok(theme) => ChatCommand::Theme(Some(theme)),
                Err(err) => ChatCommand::Invalid(format!("/theme {err}")),
            },
            None => ChatCommand::Theme(None),
        },
        "suggest" | "suggestions" => ChatCommand::Suggest,
        "pick" => match argument.map(parse_number) {
            Some(Some(n)) => ChatCommand::Pick(n),
            Some(None) => ChatCommand::Invalid("/pick expects a positive number".to_string()),
            None => ChatCommand::Invalid("/pick requires a category number".to_string()),
        },
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_edit(argument: Option<&str>) -> ChatCommand {
    let Some(arg) = argument else {
        return ChatCommand::Invalid("/edit requires a message number".to_string());
    };
    let mut parts = arg.splitn(2, char::is_whitespace);
    let number = parts.next().and_then(parse_number);
    let text = parts
        .next()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    match number {
        Some(number) => ChatCommand::Edit { number, text },
        None => ChatCommand::Invalid("/edit expects a positive message number".to_string()),
    }
}

fn parse_number(value: &str) -> Option<usize> {
    value.parse::<usize>().ok().filter(|n| *n > 0)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear the conversation (alias: /home)
  /edit <n> [text]       Edit question n and resend it (no text: edit inline)
  /history               Show the conversation so far
  /speed <ms>            Set typing speed, 5-500 ms per word
  /theme [light|dark]    Set or toggle the color theme
  /suggest               List suggested topics
  /pick <n>              Start a prompt from suggested topic n
  /model <name>          Change the model (e.g., /model gemini-2.5-flash)
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat
Press Ctrl+C while an answer is generating to stop it."#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/home"), Some(ChatCommand::Clear));
    }

    #[test]
    fn parse_edit_command() {
        assert_eq!(
            parse_command("/edit 3 What is Rust?"),
            Some(ChatCommand::Edit {
                number: 3,
                text: Some("What is Rust?".to_string())
            })
        );
        assert_eq!(
            parse_command("/edit 1"),
            Some(ChatCommand::Edit {
                number: 1,
                text: None
            })
        );
        assert!(matches!(
            parse_command("/edit"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
        assert!(matches!(
            parse_command("/edit 0 text"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("positive")
        ));
        assert!(matches!(
            parse_command("/edit two"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_speed() {
        assert_eq!(parse_command("/speed 5"), Some(ChatCommand::Speed(5)));
        assert_eq!(parse_command("/speed 500"), Some(ChatCommand::Speed(500)));
        assert!(matches!(
            parse_command("/speed 4"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("between 5 and 500")
        ));
        assert!(matches!(
            parse_command("/speed 501"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/speed fast"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/speed"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_theme() {
        assert_eq!(parse_command("/theme"), Some(ChatCommand::Theme(None)));
        assert_eq!(
            parse_command("/theme light"),
            Some(ChatCommand::Theme(Some(Theme::Light)))
        );
        assert_eq!(
            parse_command("/theme DARK"),
            Some(ChatCommand::Theme(Some(Theme::Dark)))
        );
        assert!(matches!(
            parse_command("/theme neon"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_suggestions() {
        assert_eq!(parse_command("/suggest"), Some(ChatCommand::Suggest));
        assert_eq!(parse_command("/pick 2"), Some(ChatCommand::Pick(2)));
        assert!(matches!(
            parse_command("/pick 0"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/pick"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model gemini-2.5-flash"),
            Some(ChatCommand::Model("gemini-2.5-flash".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(
                "/model requires a model name".to_string()
            ))
        );
    }

    #[test]
    fn parse_misc() {
        assert_eq!(parse_command("/history"), Some(ChatCommand::History));
        assert_eq!(parse_command("/stats"), Some(ChatCommand::Stats));
        assert_eq!(parse_command("/config"), Some(ChatCommand::ShowConfig));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
        assert_eq!(
            parse_command("/frobnicate"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello there!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn categories_are_one_based() {
        assert_eq!(category(1), Some("💡 General knowledge"));
        assert_eq!(category(4), Some("🤔 Problem solving"));
        assert_eq!(category(0), None);
        assert_eq!(category(5), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/clear"));
        assert!(help.contains("/edit"));
        assert!(help.contains("/speed"));
    }
}
