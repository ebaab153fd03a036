//! Download-style renderings of a single conversation.
//!
//! Formatting here is pure: nothing in this module touches session state.

use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};

use crate::core::conversation::Conversation;
use crate::core::message::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(format!("unknown export format: {other} (expected text, json or html)")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Text => "text",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        })
    }
}

#[derive(Debug)]
pub enum ExportError {
    NotFound(String),
    Empty,
    Exists(PathBuf),
    Encode(serde_json::Error),
    Io(io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::NotFound(id) => write!(f, "No conversation with id {id}"),
            ExportError::Empty => write!(f, "No messages to export"),
            ExportError::Exists(path) => write!(
                f,
                "File '{}' already exists. Choose another name or overwrite explicitly.",
                path.display()
            ),
            ExportError::Encode(err) => write!(f, "Failed to encode conversation: {err}"),
            ExportError::Io(err) => write!(f, "Failed to write export: {err}"),
        }
    }
}

impl StdError for ExportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ExportError::Encode(err) => Some(err),
            ExportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Renders `conversation` in `format`, labelling replies with `assistant_name`.
pub fn render(
    conversation: &Conversation,
    format: ExportFormat,
    assistant_name: &str,
) -> Result<String, ExportError> {
    if conversation.messages.is_empty() {
        return Err(ExportError::Empty);
    }
    match format {
        ExportFormat::Text => Ok(render_text(conversation, assistant_name)),
        ExportFormat::Json => {
            serde_json::to_string_pretty(conversation).map_err(ExportError::Encode)
        }
        ExportFormat::Html => Ok(render_html(conversation, assistant_name)),
    }
}

/// Parses a JSON export back into a conversation.
pub fn import_json(json: &str) -> Result<Conversation, serde_json::Error> {
    serde_json::from_str(json)
}

/// Default download name, e.g. `nebras-conversation-1714550400000.json`.
pub fn suggested_filename(format: ExportFormat, at: DateTime<Utc>) -> String {
    format!(
        "nebras-conversation-{}.{}",
        at.timestamp_millis(),
        format.extension()
    )
}

/// Writes an export to `path`, refusing to replace an existing file unless
/// `overwrite` is set.
pub fn write_export(path: &Path, contents: &str, overwrite: bool) -> Result<(), ExportError> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let file = options.open(path).map_err(|err| {
        if err.kind() == io::ErrorKind::AlreadyExists {
            ExportError::Exists(path.to_path_buf())
        } else {
            ExportError::Io(err)
        }
    })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(ExportError::Io)
}

fn local_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn speaker(role: Role, assistant_name: &str) -> &str {
    match role {
        Role::User => "You",
        Role::Assistant => assistant_name,
    }
}

fn render_text(conversation: &Conversation, assistant_name: &str) -> String {
    let mut text = format!("{assistant_name} Conversation - {}\n", conversation.title);
    text.push_str(&format!("Date: {}\n", local_date(conversation.created_at)));
    text.push_str(&"=".repeat(50));
    text.push_str("\n\n");
    for message in &conversation.messages {
        text.push_str(speaker(message.role, assistant_name));
        text.push_str(": ");
        text.push_str(&message.content);
        text.push_str("\n\n");
    }
    text
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const HTML_STYLE: &str = r#"        body {
            font-family: 'Segoe UI', sans-serif;
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
            background: #f5f5f5;
        }
        .header {
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            padding: 30px;
            border-radius: 10px;
            margin-bottom: 20px;
        }
        .message {
            margin: 15px 0;
            padding: 15px;
            border-radius: 10px;
            white-space: pre-wrap;
        }
        .user {
            background: #667eea;
            color: white;
            margin-left: 20%;
        }
        .assistant {
            background: white;
            margin-right: 20%;
        }
        .error {
            border: 1px solid #e53e3e;
        }
"#;

fn render_html(conversation: &Conversation, assistant_name: &str) -> String {
    let name = escape_html(assistant_name);
    let title = escape_html(&conversation.title);
    let date = local_date(conversation.created_at);

    let mut html = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!("    <title>{name} Conversation - {title}</title>\n"));
    html.push_str("    <style>\n");
    html.push_str(HTML_STYLE);
    html.push_str("    </style>\n</head>\n<body>\n");
    html.push_str("    <div class=\"header\">\n");
    html.push_str(&format!("        <h1>🩺 {name} Conversation</h1>\n"));
    html.push_str(&format!("        <p>{title}</p>\n"));
    html.push_str(&format!("        <p>Date: {date}</p>\n"));
    html.push_str("    </div>\n");
    for message in &conversation.messages {
        let class = if message.is_error {
            format!("{} error", message.role.as_str())
        } else {
            message.role.as_str().to_string()
        };
        html.push_str(&format!(
            "    <div class=\"message {class}\">{}</div>\n",
            escape_html(&message.content)
        ));
    }
    html.push_str("</body>\n</html>\n");
    html
}
