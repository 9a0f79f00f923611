use std::str::FromStr;

use crate::mode::ChatMode;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands invoked by starting a message with a leading slash. These
/// mirror the keyboard shortcuts of the chat surface (new chat, clear,
/// mode select) so controller logic stays independent of key wiring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Start a new conversation
    New,
    /// Clear the current conversation from history
    Clear,
    /// Switch the response mode (ai, web, auto)
    Mode,
    /// Stage a file to send with the next message
    Attach,
    /// Stage an image to send with the next message
    Image,
    /// Toggle the light/dark theme
    Theme,
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

impl ParsedCommand {
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn mode_target(&self) -> Option<ChatMode> {
        if self.command != SlashCommand::Mode {
            return None;
        }

        let arg = self.argument()?.trim().to_lowercase();
        match arg.as_str() {
            "1" | "ai" => Some(ChatMode::Ai),
            "2" | "web" | "search" => Some(ChatMode::Web),
            "3" | "auto" => Some(ChatMode::Auto),
            _ => None,
        }
    }
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::New => "start a new conversation",
            SlashCommand::Clear => "clear the current conversation",
            SlashCommand::Mode => "switch the response mode (ai, web, auto)",
            SlashCommand::Attach => "stage a file to send, or clear staging with no argument",
            SlashCommand::Image => "stage an image to send (non-images are ignored)",
            SlashCommand::Theme => "toggle light/dark theme",
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input.
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].split_whitespace();
    let head = parts.next()?;
    let rest: Vec<String> = parts.map(|s| s.to_string()).collect();

    let command = SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "bye" | "exit" => Some(SlashCommand::Quit),
            "n" => Some(SlashCommand::New),
            "m" | "switch" => Some(SlashCommand::Mode),
            "l" => Some(SlashCommand::Clear),
            "h" => Some(SlashCommand::Help),
            _ => None,
        })?;

    let argument = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands.
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for command in SlashCommand::iter() {
        help.push_str(&format!("/{} - {}\n", command.command(), command.description()));
    }

    help.push_str("\nUse /mode <ai|web|auto> (or 1|2|3) to pick a response mode directly.");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commands_and_aliases() {
        assert_eq!(
            parse_slash_command("/new").unwrap().command,
            SlashCommand::New
        );
        assert_eq!(
            parse_slash_command("/q").unwrap().command,
            SlashCommand::Quit
        );
        assert_eq!(
            parse_slash_command("/l").unwrap().command,
            SlashCommand::Clear
        );
        assert!(parse_slash_command("hello").is_none());
        assert!(parse_slash_command("/unknown").is_none());
    }

    #[test]
    fn mode_argument_resolves_targets() {
        let parsed = parse_slash_command("/mode web").unwrap();
        assert_eq!(parsed.mode_target(), Some(ChatMode::Web));
        assert_eq!(
            parse_slash_command("/mode 3").unwrap().mode_target(),
            Some(ChatMode::Auto)
        );
        assert_eq!(parse_slash_command("/mode warp").unwrap().mode_target(), None);
        assert_eq!(parse_slash_command("/theme").unwrap().mode_target(), None);
    }
}
