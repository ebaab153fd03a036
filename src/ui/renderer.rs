//! Line-oriented rendering of the chat session.

use std::cell::Cell;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::rc::Rc;

use chrono::{DateTime, Local, Utc};
use colored::{Color, Colorize};
use tracing::{debug, warn};

use crate::core::analytics::Analytics;
use crate::core::conversation::Conversation;
use crate::core::events::{SessionObserver, SessionPhase, SessionStatus};
use crate::core::message::Message;
use crate::store::LocalStore;
use crate::ui::theme::Theme;

pub const DISCLAIMER: &str = "⚠️  Medical disclaimer: answers are general information, not a diagnosis. \
Always consult a qualified healthcare provider about your symptoms and treatment. \
In an emergency, contact your local emergency services immediately.";

const DISCLAIMER_HINT: &str = "(Type /disclaimer hide to stop showing this.)";
const RETRY_HINT: &str = "Type /retry or send any message to try that question again.";

/// Display preferences shared between the renderer and the chat loop.
#[derive(Debug, Default)]
pub struct DisplayPrefs {
    theme: Cell<Theme>,
    disclaimer_hidden: Cell<bool>,
}

impl DisplayPrefs {
    pub fn new(theme: Theme, disclaimer_hidden: bool) -> Self {
        Self {
            theme: Cell::new(theme),
            disclaimer_hidden: Cell::new(disclaimer_hidden),
        }
    }

    /// Reads stored preferences, falling back to defaults when the store is
    /// unreadable.
    pub fn from_store(store: &LocalStore) -> Self {
        let theme = store.load_theme().unwrap_or_else(|err| {
            warn!(error = %err, "Failed to read theme preference");
            Theme::default()
        });
        let hidden = store.disclaimer_hidden().unwrap_or_else(|err| {
            warn!(error = %err, "Failed to read disclaimer preference");
            false
        });
        Self::new(theme, hidden)
    }

    pub fn theme(&self) -> Theme {
        self.theme.get()
    }

    pub fn set_theme(&self, theme: Theme) {
        self.theme.set(theme);
    }

    pub fn disclaimer_hidden(&self) -> bool {
        self.disclaimer_hidden.get()
    }

    pub fn set_disclaimer_hidden(&self, hidden: bool) {
        self.disclaimer_hidden.set(hidden);
    }
}

pub fn welcome_text(assistant_name: &str) -> String {
    format!("🥼 Hi! I'm {assistant_name} 🤖, your AI medical assistant. How can I help you today?")
}

pub fn health_text(healthy: bool) -> &'static str {
    if healthy {
        "API: Connected"
    } else {
        "API: Offline"
    }
}

fn local_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

/// The statistics view. "Member since" is the oldest stored conversation.
pub fn stats_text(analytics: &Analytics, oldest: Option<DateTime<Utc>>) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "📊 Total Messages:      {}", analytics.total_messages);
    let _ = writeln!(text, "💬 Total Conversations: {}", analytics.total_conversations);
    let _ = writeln!(text, "🔄 API Calls:           {}", analytics.api_calls);
    let _ = writeln!(
        text,
        "⚡ Avg Response Time:   {}ms",
        analytics.average_response_millis()
    );
    let since = oldest.map(local_date).unwrap_or_else(|| "Today".to_string());
    let _ = write!(text, "📅 Member Since:        {since}");
    text
}

/// Numbered list of conversations as `/load` and `/delete` accept them.
pub fn conversation_list_text(conversations: &[Conversation], active_id: Option<&str>) -> String {
    if conversations.is_empty() {
        return "No saved conversations yet.".to_string();
    }
    let width = conversations.len().to_string().len();
    let mut text = String::new();
    for (index, conversation) in conversations.iter().enumerate() {
        let marker = if active_id == Some(conversation.id.as_str()) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(
            text,
            "{marker}{:>width$}. {}  ({}, id {})",
            index + 1,
            conversation.title,
            local_date(conversation.updated_at),
            conversation.id,
        );
    }
    text.truncate(text.trim_end().len());
    text
}

/// Writes coloured lines using the current theme.
pub struct Console<W: Write> {
    writer: W,
    prefs: Rc<DisplayPrefs>,
    assistant_name: String,
}

impl Console<io::Stdout> {
    pub fn stdout(prefs: Rc<DisplayPrefs>, assistant_name: &str) -> Self {
        Self::new(io::stdout(), prefs, assistant_name)
    }
}

impl<W: Write> Console<W> {
    pub fn new(writer: W, prefs: Rc<DisplayPrefs>, assistant_name: &str) -> Self {
        Self {
            writer,
            prefs,
            assistant_name: assistant_name.to_string(),
        }
    }

    pub fn prefs(&self) -> &Rc<DisplayPrefs> {
        &self.prefs
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, text: &str, color: Color) {
        let result = text
            .lines()
            .try_for_each(|line| writeln!(self.writer, "{}", line.color(color)))
            .and_then(|()| self.writer.flush());
        if let Err(err) = result {
            debug!(error = %err, "Failed to write to terminal");
        }
    }

    pub fn blank_line(&mut self) {
        let _ = writeln!(self.writer);
    }

    pub fn notice(&mut self, text: &str) {
        let color = self.prefs.theme().palette().notice;
        self.emit(text, color);
    }

    pub fn error(&mut self, text: &str) {
        let color = self.prefs.theme().palette().error;
        self.emit(text, color);
    }

    pub fn accent(&mut self, text: &str) {
        let color = self.prefs.theme().palette().accent;
        self.emit(text, color);
    }

    pub fn block(&mut self, text: &str) {
        let color = self.prefs.theme().palette().assistant;
        self.emit(text, color);
    }

    pub fn message(&mut self, message: &Message) {
        let palette = self.prefs.theme().palette();
        if message.is_user() {
            self.emit(&format!("You: {}", message.content), palette.user);
        } else if message.is_error {
            let line = format!("{}: {}", self.assistant_name, message.content);
            self.emit(&line, palette.error);
        } else {
            let line = format!("{}: {}", self.assistant_name, message.content);
            self.emit(&line, palette.assistant);
        }
    }

    pub fn assistant_says(&mut self, text: &str) {
        let color = self.prefs.theme().palette().assistant;
        let line = format!("{}: {}", self.assistant_name, text);
        self.emit(&line, color);
    }

    pub fn welcome(&mut self) {
        let text = welcome_text(&self.assistant_name);
        self.accent(&text);
    }

    pub fn disclaimer(&mut self) {
        self.notice(DISCLAIMER);
    }

    /// Welcome line for an empty session, plus the disclaimer unless hidden.
    pub fn session_banner(&mut self) {
        self.welcome();
        if !self.prefs.disclaimer_hidden() {
            self.disclaimer();
            self.notice(DISCLAIMER_HINT);
        }
    }
}

/// Prints session notifications to the terminal as they happen.
pub struct TerminalRenderer<W: Write> {
    console: Console<W>,
    phase: SessionPhase,
    shown_conversation: Option<String>,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(console: Console<W>) -> Self {
        Self {
            console,
            phase: SessionPhase::Idle,
            shown_conversation: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.console.into_inner()
    }
}

impl<W: Write> SessionObserver for TerminalRenderer<W> {
    fn on_message_appended(&mut self, conversation_id: Option<&str>, message: &Message) {
        if conversation_id.is_some() {
            self.shown_conversation = conversation_id.map(str::to_string);
        }
        // The user's own line is already on screen.
        if message.is_user() {
            return;
        }
        self.console.message(message);
        if message.is_error {
            self.console.notice(RETRY_HINT);
        }
    }

    fn on_conversation_list_changed(&mut self, conversations: &[Conversation]) {
        debug!(count = conversations.len(), "Conversation list changed");
    }

    fn on_session_state_changed(&mut self, status: &SessionStatus) {
        if status.phase == SessionPhase::AwaitingResponse && self.phase == SessionPhase::Idle {
            let line = format!("{} is thinking...", self.console.assistant_name);
            self.console.notice(&line);
        }
        self.phase = status.phase;
    }

    fn on_analytics_changed(&mut self, _analytics: &Analytics) {}

    fn on_transcript_replaced(&mut self, conversation_id: Option<&str>, messages: &[Message]) {
        if messages.is_empty() {
            self.shown_conversation = None;
            self.console.blank_line();
            self.console.session_banner();
            return;
        }

        let same_conversation =
            conversation_id.is_some() && self.shown_conversation.as_deref() == conversation_id;
        if same_conversation {
            self.console.notice("Retrying your last question...");
            return;
        }

        self.shown_conversation = conversation_id.map(str::to_string);
        self.console.blank_line();
        self.console.notice("Loaded conversation:");
        for message in messages {
            self.console.message(message);
        }
        if messages.last().is_some_and(|m| m.is_error) {
            self.console.notice(RETRY_HINT);
        }
    }

    fn on_ephemeral_exchange(&mut self, _user_text: &str, response: &str) {
        self.console.assistant_says(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::SessionStatus;

    fn renderer(hidden: bool) -> TerminalRenderer<Vec<u8>> {
        let prefs = Rc::new(DisplayPrefs::new(Theme::Light, hidden));
        TerminalRenderer::new(Console::new(Vec::new(), prefs, "Nebras"))
    }

    fn output(renderer: TerminalRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    fn conversation(id: &str, title: &str, created: &str) -> Conversation {
        let at = DateTime::parse_from_rfc3339(created)
            .unwrap()
            .with_timezone(&Utc);
        Conversation {
            id: id.to_string(),
            title: title.to_string(),
            messages: vec![Message::user(title)],
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn assistant_replies_are_printed_and_user_lines_are_not() {
        let mut r = renderer(true);
        r.on_message_appended(None, &Message::user("headache"));
        r.on_message_appended(Some("1"), &Message::assistant("Rest."));
        let out = output(r);
        assert!(out.contains("Nebras: Rest."));
        assert!(!out.contains("You: headache"));
    }

    #[test]
    fn error_reply_comes_with_retry_hint() {
        let mut r = renderer(true);
        r.on_message_appended(Some("1"), &Message::error_reply());
        let out = output(r);
        assert!(out.contains("/retry"));
    }

    #[test]
    fn thinking_indicator_prints_once_per_request() {
        let mut r = renderer(true);
        let awaiting = SessionStatus {
            phase: SessionPhase::AwaitingResponse,
            active_conversation_id: None,
            last_failed_message: None,
        };
        r.on_session_state_changed(&awaiting);
        r.on_session_state_changed(&awaiting);
        let out = output(r);
        assert_eq!(out.matches("Nebras is thinking...").count(), 1);
    }

    #[test]
    fn new_session_shows_banner_and_disclaimer_unless_hidden() {
        let mut shown = renderer(false);
        shown.on_transcript_replaced(None, &[]);
        let out = output(shown);
        assert!(out.contains("I'm Nebras"));
        assert!(out.contains("Medical disclaimer"));

        let mut hidden = renderer(true);
        hidden.on_transcript_replaced(None, &[]);
        let out = output(hidden);
        assert!(out.contains("I'm Nebras"));
        assert!(!out.contains("Medical disclaimer"));
    }

    #[test]
    fn loading_prints_transcript_but_retry_does_not() {
        let mut r = renderer(true);
        let transcript = vec![Message::user("cough"), Message::error_reply()];
        r.on_transcript_replaced(Some("7"), &transcript);
        r.on_transcript_replaced(Some("7"), &transcript[..1]);
        let out = output(r);
        assert!(out.contains("Loaded conversation:"));
        assert_eq!(out.matches("You: cough").count(), 1);
        assert!(out.contains("Retrying your last question..."));
    }

    #[test]
    fn stats_show_member_since_or_today() {
        let mut analytics = Analytics::default();
        analytics.record_request();
        analytics.record_response_time(std::time::Duration::from_millis(250));
        let text = stats_text(&analytics, None);
        assert!(text.contains("Total Messages:      1"));
        assert!(text.contains("API Calls:           1"));
        assert!(text.contains("250ms"));
        assert!(text.ends_with("Member Since:        Today"));

        let oldest = conversation("1", "x", "2024-05-01T12:00:00Z").created_at;
        let text = stats_text(&analytics, Some(oldest));
        assert!(text.contains(&local_date(oldest)));
    }

    #[test]
    fn list_marks_active_conversation() {
        let conversations = vec![
            conversation("200", "fever", "2024-05-02T12:00:00Z"),
            conversation("100", "cough", "2024-05-01T12:00:00Z"),
        ];
        let text = conversation_list_text(&conversations, Some("100"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(" 1. fever"));
        assert!(lines[1].starts_with("*2. cough"));
        assert!(lines[1].contains("id 100"));
        assert_eq!(
            conversation_list_text(&[], None),
            "No saved conversations yet."
        );
    }
}
