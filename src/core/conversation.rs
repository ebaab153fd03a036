use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::core::message::{has_user_message, Message};

/// Titles keep this many characters of the first user message.
pub const TITLE_MAX_CHARS: usize = 40;
const TITLE_ELLIPSIS: &str = "...";
pub const UNTITLED: &str = "New Conversation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    fn empty(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: String::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_user_message(&self) -> bool {
        has_user_message(&self.messages)
    }
}

/// Builds a list title from the first user message.
pub fn title_from(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return UNTITLED.to_string();
    }
    let mut graphemes = trimmed.graphemes(true);
    let mut title: String = graphemes.by_ref().take(TITLE_MAX_CHARS).collect();
    if graphemes.next().is_some() {
        title.push_str(TITLE_ELLIPSIS);
    }
    title
}

/// The message to resend when a transcript ends in an error reply.
pub fn failed_message_to_retry(messages: &[Message]) -> Option<String> {
    let (last, earlier) = messages.split_last()?;
    if !last.is_error {
        return None;
    }
    earlier
        .iter()
        .rev()
        .find(|m| m.is_user())
        .map(|m| m.content.clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The conversation now holds the committed transcript.
    Updated,
    /// The transcript had no user message; the conversation was dropped.
    Pruned,
    /// No conversation with that id exists.
    Missing,
}

/// Session state rebuilt from a stored conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredSession {
    pub conversation_id: String,
    pub transcript: Vec<Message>,
    pub last_failed_message: Option<String>,
}

/// Owns the conversation list, most recent first.
#[derive(Debug, Default)]
pub struct ConversationManager {
    conversations: Vec<Conversation>,
}

impl ConversationManager {
    /// Wraps a list loaded from storage, dropping anything that should never
    /// have been persisted. Also returns how many entries were dropped.
    pub fn from_stored(conversations: Vec<Conversation>) -> (Self, usize) {
        let before = conversations.len();
        let conversations: Vec<Conversation> = conversations
            .into_iter()
            .filter(Conversation::has_user_message)
            .collect();
        let dropped = before - conversations.len();
        if dropped > 0 {
            debug!(dropped, "Ignoring stored conversations without user messages");
        }
        (Self { conversations }, dropped)
    }

    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Inserts a fresh, empty conversation at the front and returns its id.
    ///
    /// The conversation only survives the next [`commit`](Self::commit) if
    /// the committed transcript contains a user message.
    pub fn create_empty(&mut self) -> String {
        let now = Utc::now();
        let id = self.next_id(now);
        debug!(conversation_id = %id, "Created conversation");
        self.conversations.insert(0, Conversation::empty(id.clone(), now));
        id
    }

    pub fn commit(&mut self, id: &str, messages: &[Message]) -> CommitOutcome {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            return CommitOutcome::Missing;
        };

        if !has_user_message(messages) {
            self.conversations.remove(index);
            debug!(conversation_id = %id, "Pruned conversation without user messages");
            return CommitOutcome::Pruned;
        }

        let conversation = &mut self.conversations[index];
        if conversation.title.is_empty() {
            conversation.title = messages
                .iter()
                .find(|m| m.is_user())
                .map(|m| title_from(&m.content))
                .unwrap_or_else(|| UNTITLED.to_string());
        }
        conversation.messages = messages.to_vec();
        conversation.updated_at = Utc::now();
        CommitOutcome::Updated
    }

    pub fn load(&self, id: &str) -> Option<RestoredSession> {
        let conversation = self.get(id)?;
        Some(RestoredSession {
            conversation_id: conversation.id.clone(),
            transcript: conversation.messages.clone(),
            last_failed_message: failed_message_to_retry(&conversation.messages),
        })
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        let removed = self.conversations.len() != before;
        if removed {
            debug!(conversation_id = %id, "Deleted conversation");
        }
        removed
    }

    /// Removes every conversation and returns how many there were.
    pub fn delete_all(&mut self) -> usize {
        let removed = self.conversations.len();
        self.conversations.clear();
        removed
    }

    /// Creation time of the oldest stored conversation.
    pub fn oldest_created_at(&self) -> Option<DateTime<Utc>> {
        self.conversations.iter().map(|c| c.created_at).min()
    }

    fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        while self.contains(&millis.to_string()) {
            millis += 1;
        }
        millis.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Vec<Message> {
        vec![Message::user("headache"), Message::assistant("Rest and hydrate.")]
    }

    #[test]
    fn commit_twice_keeps_single_entry_and_refreshes_timestamp() {
        let mut manager = ConversationManager::default();
        let id = manager.create_empty();

        assert_eq!(manager.commit(&id, &transcript()), CommitOutcome::Updated);
        let first_update = manager.get(&id).unwrap().updated_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(manager.commit(&id, &transcript()), CommitOutcome::Updated);

        assert_eq!(manager.len(), 1);
        let conversation = manager.get(&id).unwrap();
        assert!(conversation.updated_at > first_update);
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.title, "headache");
    }

    #[test]
    fn commit_without_user_message_prunes() {
        let mut manager = ConversationManager::default();
        let id = manager.create_empty();
        assert_eq!(manager.commit(&id, &[]), CommitOutcome::Pruned);
        assert!(manager.is_empty());

        let id = manager.create_empty();
        let outcome = manager.commit(&id, &[Message::assistant("welcome")]);
        assert_eq!(outcome, CommitOutcome::Pruned);
        assert!(manager.is_empty());
    }

    #[test]
    fn commit_to_unknown_id_is_reported() {
        let mut manager = ConversationManager::default();
        assert_eq!(manager.commit("nope", &transcript()), CommitOutcome::Missing);
    }

    #[test]
    fn new_conversations_go_to_the_front_with_unique_ids() {
        let mut manager = ConversationManager::default();
        let first = manager.create_empty();
        manager.commit(&first, &transcript());
        let second = manager.create_empty();
        manager.commit(&second, &transcript());

        assert_ne!(first, second);
        let ids: Vec<&str> = manager.list().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    }

    #[test]
    fn long_titles_are_truncated_with_ellipsis() {
        let message = "I have had a persistent dry cough for about three weeks now";
        let title = title_from(message);
        assert_eq!(title, "I have had a persistent dry cough for ab...");
        assert_eq!(title_from("short"), "short");
        assert_eq!(title_from(&"x".repeat(40)), "x".repeat(40));
        assert_eq!(title_from("   "), UNTITLED);
    }

    #[test]
    fn load_rearms_retry_when_last_message_failed() {
        let mut manager = ConversationManager::default();
        let id = manager.create_empty();
        let messages = vec![
            Message::user("fever"),
            Message::assistant("Take paracetamol."),
            Message::user("dosage?"),
            Message::error_reply(),
        ];
        manager.commit(&id, &messages);

        let restored = manager.load(&id).unwrap();
        assert_eq!(restored.transcript, messages);
        assert_eq!(restored.last_failed_message.as_deref(), Some("dosage?"));
    }

    #[test]
    fn load_clears_retry_when_last_message_succeeded() {
        let mut manager = ConversationManager::default();
        let id = manager.create_empty();
        manager.commit(&id, &transcript());
        assert_eq!(manager.load(&id).unwrap().last_failed_message, None);
        assert!(manager.load("missing").is_none());
    }

    #[test]
    fn delete_and_delete_all() {
        let mut manager = ConversationManager::default();
        let a = manager.create_empty();
        manager.commit(&a, &transcript());
        let b = manager.create_empty();
        manager.commit(&b, &transcript());

        assert!(manager.delete(&a));
        assert!(!manager.delete(&a));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.delete_all(), 1);
        assert!(manager.is_empty());
    }

    #[test]
    fn stored_lists_drop_conversations_without_user_messages() {
        let now = Utc::now();
        let mut empty = Conversation::empty("1".into(), now);
        empty.title = "ghost".into();
        let mut real = Conversation::empty("2".into(), now);
        real.messages = transcript();
        let (manager, dropped) = ConversationManager::from_stored(vec![empty, real]);
        assert_eq!(dropped, 1);
        assert_eq!(manager.len(), 1);
        assert!(manager.contains("2"));
    }
}
