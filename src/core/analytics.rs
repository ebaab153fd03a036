use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Running usage counters.
///
/// Only completed or failed send cycles touch these numbers; greetings that
/// are answered locally never do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analytics {
    pub total_messages: u64,
    pub total_conversations: u64,
    pub api_calls: u64,
    /// Mean of `response_times`, in milliseconds.
    pub average_response_time: f64,
    /// Latency samples in milliseconds, oldest first.
    pub response_times: Vec<u64>,
}

impl Analytics {
    /// Counts one outgoing request for a user message.
    pub fn record_request(&mut self) {
        self.total_messages += 1;
        self.api_calls += 1;
    }

    pub fn record_response_time(&mut self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.response_times.push(millis);
        self.recompute_average();
    }

    pub fn conversation_created(&mut self) {
        self.total_conversations += 1;
    }

    pub fn conversation_removed(&mut self) {
        self.conversations_removed(1);
    }

    pub fn conversations_removed(&mut self, count: usize) {
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.total_conversations = self.total_conversations.saturating_sub(count);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Average latency rounded to whole milliseconds, as shown to the user.
    pub fn average_response_millis(&self) -> u64 {
        self.average_response_time.round() as u64
    }

    fn recompute_average(&mut self) {
        if self.response_times.is_empty() {
            self.average_response_time = 0.0;
            return;
        }
        let total: u128 = self.response_times.iter().map(|&ms| u128::from(ms)).sum();
        self.average_response_time = total as f64 / self.response_times.len() as f64;
    }
}
