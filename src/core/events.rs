//! The boundary between the session core and whatever presents it.
//!
//! Front-ends turn user actions into [`Intent`]s and receive state changes
//! through a [`SessionObserver`]. The core never draws anything itself.

use crate::core::analytics::Analytics;
use crate::core::conversation::Conversation;
use crate::core::message::Message;
use crate::export::ExportFormat;

/// A user action the session controller knows how to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SendRequested { text: String },
    RetryRequested,
    NewConversationRequested,
    ConversationSelected { id: String },
    DeleteRequested { id: String },
    DeleteCurrentRequested,
    ClearAllRequested,
    ExportRequested { id: String, format: ExportFormat },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    AwaitingResponse,
}

/// Snapshot handed to observers whenever the session state moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub active_conversation_id: Option<String>,
    pub last_failed_message: Option<String>,
}

impl SessionStatus {
    pub fn is_retry_armed(&self) -> bool {
        self.phase == SessionPhase::Idle && self.last_failed_message.is_some()
    }
}

/// Receives notifications after each state mutation.
///
/// The four required callbacks mirror the session's owned state. The
/// remaining ones have no-op defaults for front-ends that redraw from the
/// full snapshots anyway.
pub trait SessionObserver {
    fn on_message_appended(&mut self, conversation_id: Option<&str>, message: &Message);

    fn on_conversation_list_changed(&mut self, conversations: &[Conversation]);

    fn on_session_state_changed(&mut self, status: &SessionStatus);

    fn on_analytics_changed(&mut self, analytics: &Analytics);

    /// The visible transcript was replaced wholesale: a new session, a
    /// loaded conversation, or error replies dropped before a retry.
    fn on_transcript_replaced(&mut self, _conversation_id: Option<&str>, _messages: &[Message]) {}

    /// A greeting answered locally; neither side is part of any transcript.
    fn on_ephemeral_exchange(&mut self, _user_text: &str, _response: &str) {}
}

/// Observer that ignores everything; used by one-shot front-ends.
#[derive(Debug, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn on_message_appended(&mut self, _conversation_id: Option<&str>, _message: &Message) {}

    fn on_conversation_list_changed(&mut self, _conversations: &[Conversation]) {}

    fn on_session_state_changed(&mut self, _status: &SessionStatus) {}

    fn on_analytics_changed(&mut self, _analytics: &Analytics) {}
}
