use super::CommandResult;

pub type CommandParser = fn(CommandInvocation<'_>) -> CommandResult;

pub struct CommandUsage {
    pub syntax: &'static str,
    pub description: &'static str,
}

pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usages: &'static [CommandUsage],
    pub parser: CommandParser,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub args: &'a str,
}

impl<'a> CommandInvocation<'a> {
    pub fn arg_list(&self) -> Vec<&'a str> {
        self.args.split_whitespace().collect()
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands().iter().find(|command| {
        command.name.eq_ignore_ascii_case(name)
            || command
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        aliases: &["?"],
        usages: &[CommandUsage {
            syntax: "/help",
            description: "Show available commands.",
        }],
        parser: super::parse_help,
    },
    Command {
        name: "retry",
        aliases: &[],
        usages: &[CommandUsage {
            syntax: "/retry",
            description: "Send the last failed question again.",
        }],
        parser: super::parse_retry,
    },
    Command {
        name: "new",
        aliases: &[],
        usages: &[CommandUsage {
            syntax: "/new",
            description: "Start a new conversation.",
        }],
        parser: super::parse_new,
    },
    Command {
        name: "list",
        aliases: &["history"],
        usages: &[CommandUsage {
            syntax: "/list",
            description: "List saved conversations, most recent first.",
        }],
        parser: super::parse_list,
    },
    Command {
        name: "load",
        aliases: &["open"],
        usages: &[CommandUsage {
            syntax: "/load <id|#>",
            description: "Continue a saved conversation.",
        }],
        parser: super::parse_load,
    },
    Command {
        name: "delete",
        aliases: &[],
        usages: &[
            CommandUsage {
                syntax: "/delete",
                description: "Delete the current conversation and start over.",
            },
            CommandUsage {
                syntax: "/delete <id|#>",
                description: "Delete a saved conversation.",
            },
        ],
        parser: super::parse_delete,
    },
    Command {
        name: "clear-all",
        aliases: &[],
        usages: &[CommandUsage {
            syntax: "/clear-all confirm",
            description: "Delete every conversation and reset statistics.",
        }],
        parser: super::parse_clear_all,
    },
    Command {
        name: "export",
        aliases: &["download"],
        usages: &[CommandUsage {
            syntax: "/export <text|json|html> [id|#] [file]",
            description: "Save a conversation to a file.",
        }],
        parser: super::parse_export,
    },
    Command {
        name: "stats",
        aliases: &[],
        usages: &[CommandUsage {
            syntax: "/stats",
            description: "Show usage statistics.",
        }],
        parser: super::parse_stats,
    },
    Command {
        name: "theme",
        aliases: &[],
        usages: &[CommandUsage {
            syntax: "/theme [light|dark]",
            description: "Toggle or set the colour theme.",
        }],
        parser: super::parse_theme,
    },
    Command {
        name: "disclaimer",
        aliases: &[],
        usages: &[CommandUsage {
            syntax: "/disclaimer [hide|show]",
            description: "Show the medical disclaimer, or choose whether new chats show it.",
        }],
        parser: super::parse_disclaimer,
    },
    Command {
        name: "health",
        aliases: &["status"],
        usages: &[CommandUsage {
            syntax: "/health",
            description: "Check whether the service is reachable.",
        }],
        parser: super::parse_health,
    },
    Command {
        name: "quit",
        aliases: &["exit", "q"],
        usages: &[CommandUsage {
            syntax: "/quit",
            description: "Leave Nebras.",
        }],
        parser: super::parse_quit,
    },
];
