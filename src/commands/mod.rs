//! Slash-command parsing for the interactive front-end.
//!
//! Parsing is pure: each command turns its arguments into a
//! [`CommandResult`] and the chat loop decides what to do with it.

mod registry;

pub use registry::{all_commands, Command, CommandInvocation, CommandUsage};

use std::path::PathBuf;

use crate::core::conversation::Conversation;
use crate::core::events::Intent;
use crate::export::ExportFormat;
use crate::ui::theme::Theme;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Plain text for the assistant.
    ProcessAsMessage(String),
    /// An intent that needs no further resolution.
    Session(Intent),
    /// Load a conversation by id or list position.
    Load(String),
    /// Delete a conversation by id or list position.
    Delete(String),
    Export {
        format: ExportFormat,
        target: Option<String>,
        path: Option<PathBuf>,
    },
    List,
    Stats,
    /// `None` toggles.
    Theme(Option<Theme>),
    /// `None` prints the disclaimer; `Some(hidden)` stores the preference.
    Disclaimer(Option<bool>),
    Health,
    Help,
    Quit,
    Usage(&'static str),
}

pub fn process_input(input: &str) -> CommandResult {
    let trimmed = input.trim();

    let Some(rest) = trimmed.strip_prefix('/') else {
        return CommandResult::ProcessAsMessage(input.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match registry::find_command(command_name) {
        Some(command) => (command.parser)(CommandInvocation { args }),
        None => CommandResult::ProcessAsMessage(input.to_string()),
    }
}

/// Resolves a conversation reference typed by the user: an exact id, or a
/// 1-based position in the list as `/list` prints it.
pub fn resolve_conversation_ref(conversations: &[Conversation], reference: &str) -> Option<String> {
    let reference = reference.trim().trim_start_matches('#');
    if let Some(conversation) = conversations.iter().find(|c| c.id == reference) {
        return Some(conversation.id.clone());
    }
    let position: usize = reference.parse().ok()?;
    conversations
        .get(position.checked_sub(1)?)
        .map(|c| c.id.clone())
}

/// Help text listing every command.
pub fn help_text() -> String {
    let mut help = String::from("Type a health question and press Enter.\n\nCommands:\n");
    let width = all_commands()
        .iter()
        .flat_map(|command| command.usages.iter())
        .map(|usage| usage.syntax.len())
        .max()
        .unwrap_or(0);
    for command in all_commands() {
        for usage in command.usages {
            help.push_str(&format!(
                "  {:<width$}  {}\n",
                usage.syntax, usage.description
            ));
        }
    }
    help
}

fn no_args(
    invocation: CommandInvocation<'_>,
    result: CommandResult,
    usage: &'static str,
) -> CommandResult {
    if invocation.args.is_empty() {
        result
    } else {
        CommandResult::Usage(usage)
    }
}

pub(super) fn parse_help(invocation: CommandInvocation<'_>) -> CommandResult {
    no_args(invocation, CommandResult::Help, "Usage: /help")
}

pub(super) fn parse_retry(invocation: CommandInvocation<'_>) -> CommandResult {
    no_args(
        invocation,
        CommandResult::Session(Intent::RetryRequested),
        "Usage: /retry",
    )
}

pub(super) fn parse_new(invocation: CommandInvocation<'_>) -> CommandResult {
    no_args(
        invocation,
        CommandResult::Session(Intent::NewConversationRequested),
        "Usage: /new",
    )
}

pub(super) fn parse_list(invocation: CommandInvocation<'_>) -> CommandResult {
    no_args(invocation, CommandResult::List, "Usage: /list")
}

pub(super) fn parse_load(invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.arg_list().as_slice() {
        [reference] => CommandResult::Load((*reference).to_string()),
        _ => CommandResult::Usage("Usage: /load <id|#>"),
    }
}

pub(super) fn parse_delete(invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.arg_list().as_slice() {
        [] => CommandResult::Session(Intent::DeleteCurrentRequested),
        [reference] => CommandResult::Delete((*reference).to_string()),
        _ => CommandResult::Usage("Usage: /delete [id|#]"),
    }
}

pub(super) fn parse_clear_all(invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.arg_list().as_slice() {
        ["confirm"] => CommandResult::Session(Intent::ClearAllRequested),
        _ => CommandResult::Usage(
            "This deletes every conversation and resets statistics. Type /clear-all confirm to proceed.",
        ),
    }
}

pub(super) fn parse_export(invocation: CommandInvocation<'_>) -> CommandResult {
    const USAGE: &str = "Usage: /export <text|json|html> [id|#] [file]";
    let args = invocation.arg_list();
    let Some((format, rest)) = args.split_first() else {
        return CommandResult::Usage(USAGE);
    };
    let Ok(format) = format.parse::<ExportFormat>() else {
        return CommandResult::Usage(USAGE);
    };

    let is_reference = |arg: &str| {
        let arg = arg.trim_start_matches('#');
        !arg.is_empty() && arg.chars().all(|c| c.is_ascii_digit())
    };
    let (target, path) = match rest {
        [] => (None, None),
        [one] if is_reference(one) => (Some((*one).to_string()), None),
        [one] => (None, Some(PathBuf::from(one))),
        [id, file] if is_reference(id) => (Some((*id).to_string()), Some(PathBuf::from(file))),
        _ => return CommandResult::Usage(USAGE),
    };
    CommandResult::Export {
        format,
        target,
        path,
    }
}

pub(super) fn parse_stats(invocation: CommandInvocation<'_>) -> CommandResult {
    no_args(invocation, CommandResult::Stats, "Usage: /stats")
}

pub(super) fn parse_theme(invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.arg_list().as_slice() {
        [] => CommandResult::Theme(None),
        [name] => match Theme::parse(name) {
            Some(theme) => CommandResult::Theme(Some(theme)),
            None => CommandResult::Usage("Usage: /theme [light|dark]"),
        },
        _ => CommandResult::Usage("Usage: /theme [light|dark]"),
    }
}

pub(super) fn parse_disclaimer(invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.arg_list().as_slice() {
        [] => CommandResult::Disclaimer(None),
        [action] if action.eq_ignore_ascii_case("hide") => CommandResult::Disclaimer(Some(true)),
        [action] if action.eq_ignore_ascii_case("show") => CommandResult::Disclaimer(Some(false)),
        _ => CommandResult::Usage("Usage: /disclaimer [hide|show]"),
    }
}

pub(super) fn parse_health(invocation: CommandInvocation<'_>) -> CommandResult {
    no_args(invocation, CommandResult::Health, "Usage: /health")
}

pub(super) fn parse_quit(_invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Quit
}
