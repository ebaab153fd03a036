use crate::core::message::{Message, Role};

/// Number of user/assistant pairs carried into each prompt unless configured.
pub const DEFAULT_HISTORY_EXCHANGES: usize = 3;

const SYSTEM_INSTRUCTION: &str = "You are a medical assistant. Provide accurate, concise, professional medical advice in 1–2 sentences.\nImportant: Always recommend consulting a healthcare provider for diagnosis and treatment.";

const RESPONSE_CUE: &str = "Your Response:";

/// Assembles the text prompt sent to the `generate` endpoint.
///
/// Only the trailing `2 * window_exchanges` messages of the history are
/// rendered, so the context handed to the model stays bounded no matter how
/// long a conversation grows. Error replies are not part of the exchange and
/// are skipped before the window is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    window_exchanges: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_EXCHANGES)
    }
}

impl PromptBuilder {
    pub fn new(window_exchanges: usize) -> Self {
        Self { window_exchanges }
    }

    pub fn build(&self, history: &[Message], new_message: &str) -> String {
        let recent = recent_messages(history, self.window_exchanges);

        let mut prompt = String::from(SYSTEM_INSTRUCTION);
        prompt.push_str("\n\n");

        if recent.is_empty() {
            prompt.push_str("Question: ");
        } else {
            prompt.push_str("Conversation History:\n");
            for message in recent {
                let label = match message.role {
                    Role::User => "Previous Question",
                    Role::Assistant => "Previous Answer",
                };
                prompt.push_str(label);
                prompt.push_str(": ");
                prompt.push_str(message.content.trim());
                prompt.push('\n');
            }
            prompt.push_str("\nCurrent Question: ");
        }

        prompt.push_str(new_message);
        prompt.push_str("\n\n");
        prompt.push_str(RESPONSE_CUE);
        prompt
    }
}

fn recent_messages(history: &[Message], window_exchanges: usize) -> Vec<&Message> {
    let exchanged: Vec<&Message> = history.iter().filter(|m| !m.is_error).collect();
    let keep = window_exchanges.saturating_mul(2);
    let start = exchanged.len().saturating_sub(keep);
    exchanged[start..].to_vec()
}
