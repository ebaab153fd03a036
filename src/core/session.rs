//! The send-cycle state machine.
//!
//! A [`SessionController`] owns the working transcript of the active
//! conversation and drives each exchange through
//! `Idle -> AwaitingResponse -> Idle`. Starting a cycle
//! ([`SessionController::begin_submit`]) and finishing it
//! ([`SessionController::complete`]) are separate steps so a front-end can
//! run the network call elsewhere and keep handling input meanwhile. Every
//! request carries an id; a completion whose id no longer matches the
//! in-flight request is dropped, which is how resets and conversation
//! switches cancel late answers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{InferenceClient, InferenceError};
use crate::core::analytics::Analytics;
use crate::core::conversation::{CommitOutcome, Conversation, ConversationManager};
use crate::core::events::{Intent, SessionObserver, SessionPhase, SessionStatus};
use crate::core::greeting::GreetingClassifier;
use crate::core::message::Message;
use crate::core::prompt::PromptBuilder;
use crate::export::{self, ExportError, ExportFormat};
use crate::store::{LocalStore, StoreError};


/// Tunables for a session that are not part of its persisted state.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub assistant_name: String,
    pub history_exchanges: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            assistant_name: crate::core::config::defaults::DEFAULT_ASSISTANT_NAME.to_string(),
            history_exchanges: crate::core::prompt::DEFAULT_HISTORY_EXCHANGES,
        }
    }
}

/// A prompt ready to be sent; produced by [`SessionController::begin_submit`].
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: u64,
    pub prompt: String,
    pub cancel: CancellationToken,
}

/// Result of a network call, tagged with the request it answers.
#[derive(Debug, Clone)]
pub struct Completion {
    pub request_id: u64,
    pub result: Result<String, InferenceError>,
    pub latency: Duration,
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Nothing to send after whitespace normalisation.
    Ignored,
    /// A request is already in flight.
    Busy,
    /// Answered locally; no conversation or analytics state changed.
    Greeting { response: String },
    /// The caller must run this request and hand the result to `complete`.
    Dispatched(PendingRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    /// The session moved on before the answer arrived.
    Discarded,
}

/// Outcome of a full send cycle run by [`SessionController::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Ignored,
    Busy,
    Greeting(String),
    Answered(String),
    Failed(InferenceError),
    Discarded,
}

#[derive(Debug)]
pub enum IntentOutcome {
    Submitted(SubmitOutcome),
    Exported(Result<String, ExportError>),
    UnknownConversation(String),
    Done,
}

#[derive(Debug)]
struct InFlight {
    request_id: u64,
    message: String,
    cancel: CancellationToken,
    started_at: Instant,
}

/// Runs a dispatched request against `client`, giving up if it is cancelled.
pub async fn run_request(
    client: Arc<dyn InferenceClient>,
    request: PendingRequest,
) -> Option<Completion> {
    let started = Instant::now();
    tokio::select! {
        result = client.generate(&request.prompt) => Some(Completion {
            request_id: request.request_id,
            result,
            latency: started.elapsed(),
        }),
        _ = request.cancel.cancelled() => None,
    }
}

pub struct SessionController {
    client: Arc<dyn InferenceClient>,
    store: LocalStore,
    observer: Box<dyn SessionObserver>,
    classifier: GreetingClassifier,
    prompt_builder: PromptBuilder,
    assistant_name: String,
    conversations: ConversationManager,
    analytics: Analytics,
    active_conversation_id: Option<String>,
    pending_transcript: Vec<Message>,
    last_failed_message: Option<String>,
    in_flight: Option<InFlight>,
    next_request_id: u64,
}

impl SessionController {
    /// Builds a controller over the conversations and analytics in `store`.
    pub fn new(
        client: Arc<dyn InferenceClient>,
        store: LocalStore,
        observer: Box<dyn SessionObserver>,
        options: SessionOptions,
    ) -> Result<Self, StoreError> {
        let (conversations, dropped) = ConversationManager::from_stored(store.load_conversations()?);
        let mut analytics = store.load_analytics()?;
        analytics.conversations_removed(dropped);
        let controller = Self {
            client,
            store,
            observer,
            classifier: GreetingClassifier::new(&options.assistant_name),
            prompt_builder: PromptBuilder::new(options.history_exchanges),
            assistant_name: options.assistant_name,
            conversations,
            analytics,
            active_conversation_id: None,
            pending_transcript: Vec::new(),
            last_failed_message: None,
            in_flight: None,
            next_request_id: 0,
        };
        if dropped > 0 {
            controller.persist();
        }
        Ok(controller)
    }

    pub fn client(&self) -> Arc<dyn InferenceClient> {
        Arc::clone(&self.client)
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.conversations.list()
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn oldest_conversation_date(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.conversations.oldest_created_at()
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn transcript(&self) -> &[Message] {
        &self.pending_transcript
    }

    pub fn active_conversation_id(&self) -> Option<&str> {
        self.active_conversation_id.as_deref()
    }

    pub fn last_failed_message(&self) -> Option<&str> {
        self.last_failed_message.as_deref()
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            phase: if self.in_flight.is_some() {
                SessionPhase::AwaitingResponse
            } else {
                SessionPhase::Idle
            },
            active_conversation_id: self.active_conversation_id.clone(),
            last_failed_message: self.last_failed_message.clone(),
        }
    }

    pub fn handle(&mut self, intent: Intent) -> IntentOutcome {
        match intent {
            Intent::SendRequested { text } => IntentOutcome::Submitted(self.begin_submit(&text)),
            Intent::RetryRequested => IntentOutcome::Submitted(self.retry()),
            Intent::NewConversationRequested => {
                self.new_session();
                IntentOutcome::Done
            }
            Intent::ConversationSelected { id } => {
                if self.select_conversation(&id) {
                    IntentOutcome::Done
                } else {
                    IntentOutcome::UnknownConversation(id)
                }
            }
            Intent::DeleteRequested { id } => {
                if self.delete_conversation(&id) {
                    IntentOutcome::Done
                } else {
                    IntentOutcome::UnknownConversation(id)
                }
            }
            Intent::DeleteCurrentRequested => {
                self.delete_current();
                IntentOutcome::Done
            }
            Intent::ClearAllRequested => {
                self.clear_all();
                IntentOutcome::Done
            }
            Intent::ExportRequested { id, format } => IntentOutcome::Exported(self.export(&id, format)),
        }
    }

    /// Starts a send cycle for `raw_input`, or for the remembered failed
    /// message when a retry is armed.
    pub fn begin_submit(&mut self, raw_input: &str) -> SubmitOutcome {
        let is_retry = self.last_failed_message.is_some();
        let source = self
            .last_failed_message
            .as_deref()
            .unwrap_or_else(|| raw_input.trim());
        let message = normalize_whitespace(source);
        if message.is_empty() {
            return SubmitOutcome::Ignored;
        }

        if self.in_flight.is_some() {
            debug!("Ignoring submit while a response is pending");
            return SubmitOutcome::Busy;
        }

        if !is_retry {
            let classification = self.classifier.classify(&message);
            if let (true, Some(response)) =
                (classification.is_greeting, classification.canonical_response)
            {
                self.observer.on_ephemeral_exchange(&message, &response);
                return SubmitOutcome::Greeting { response };
            }
        }

        if is_retry {
            self.pending_transcript.retain(|m| !m.is_error);
            self.observer.on_transcript_replaced(
                self.active_conversation_id.as_deref(),
                &self.pending_transcript,
            );
        } else {
            let user_message = Message::user(message.clone());
            self.observer
                .on_message_appended(self.active_conversation_id.as_deref(), &user_message);
            self.pending_transcript.push(user_message);
        }

        self.analytics.record_request();
        self.observer.on_analytics_changed(&self.analytics);

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            request_id,
            message: message.clone(),
            cancel: cancel.clone(),
            started_at: Instant::now(),
        });
        self.notify_state();

        let history = history_before_current(&self.pending_transcript);
        let prompt = self.prompt_builder.build(history, &message);
        debug!(request_id, retry = is_retry, "Dispatching generate request");

        SubmitOutcome::Dispatched(PendingRequest {
            request_id,
            prompt,
            cancel,
        })
    }

    /// Re-sends the last failed message. A no-op unless a retry is armed.
    pub fn retry(&mut self) -> SubmitOutcome {
        if self.last_failed_message.is_none() {
            return SubmitOutcome::Ignored;
        }
        self.begin_submit("")
    }

    /// Applies the answer to a dispatched request.
    pub fn complete(&mut self, completion: Completion) -> CompletionOutcome {
        let matches = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.request_id == completion.request_id);
        if !matches {
            debug!(
                request_id = completion.request_id,
                "Discarding response for a superseded request"
            );
            return CompletionOutcome::Discarded;
        }
        let Some(in_flight) = self.in_flight.take() else {
            return CompletionOutcome::Discarded;
        };

        let reply = match completion.result {
            Ok(text) => {
                info!(
                    request_id = in_flight.request_id,
                    latency_ms = completion.latency.as_millis() as u64,
                    "Received response"
                );
                self.analytics.record_response_time(completion.latency);
                self.last_failed_message = None;
                Message::assistant(text)
            }
            Err(err) => {
                warn!(
                    request_id = in_flight.request_id,
                    error = %err,
                    network = err.is_network(),
                    "Generate request failed"
                );
                self.last_failed_message = Some(in_flight.message.clone());
                Message::error_reply()
            }
        };
        self.pending_transcript.push(reply);

        let id = match self.active_conversation_id.clone() {
            Some(id) => id,
            None => {
                let id = self.conversations.create_empty();
                self.analytics.conversation_created();
                self.active_conversation_id = Some(id.clone());
                id
            }
        };
        if let Some(reply) = self.pending_transcript.last() {
            self.observer.on_message_appended(Some(&id), reply);
        }

        self.commit_active();
        self.notify_state();
        self.observer.on_analytics_changed(&self.analytics);
        self.persist();
        CompletionOutcome::Applied
    }

    /// Runs a whole send cycle in place, awaiting the inference client.
    pub async fn submit(&mut self, raw_input: &str) -> SendOutcome {
        let request = match self.begin_submit(raw_input) {
            SubmitOutcome::Ignored => return SendOutcome::Ignored,
            SubmitOutcome::Busy => return SendOutcome::Busy,
            SubmitOutcome::Greeting { response } => return SendOutcome::Greeting(response),
            SubmitOutcome::Dispatched(request) => request,
        };

        let Some(completion) = run_request(self.client(), request).await else {
            return SendOutcome::Discarded;
        };
        let result = completion.result.clone();
        match (self.complete(completion), result) {
            (CompletionOutcome::Discarded, _) => SendOutcome::Discarded,
            (CompletionOutcome::Applied, Ok(text)) => SendOutcome::Answered(text),
            (CompletionOutcome::Applied, Err(err)) => SendOutcome::Failed(err),
        }
    }

    /// Ends the current session and starts an empty one.
    pub fn new_session(&mut self) {
        self.abandon_in_flight();
        self.active_conversation_id = None;
        self.pending_transcript.clear();
        self.last_failed_message = None;
        self.observer.on_transcript_replaced(None, &[]);
        self.notify_state();
    }

    /// Makes `id` the active conversation. Returns false for unknown ids.
    pub fn select_conversation(&mut self, id: &str) -> bool {
        if self.active_conversation_id.as_deref() == Some(id) {
            return true;
        }
        let Some(restored) = self.conversations.load(id) else {
            return false;
        };

        self.abandon_in_flight();
        self.active_conversation_id = Some(restored.conversation_id);
        self.pending_transcript = restored.transcript;
        self.last_failed_message = restored.last_failed_message;

        self.observer
            .on_transcript_replaced(Some(id), &self.pending_transcript);
        self.observer
            .on_conversation_list_changed(self.conversations.list());
        self.notify_state();
        true
    }

    /// Deletes one conversation; deleting the active one starts a new session.
    pub fn delete_conversation(&mut self, id: &str) -> bool {
        if !self.conversations.delete(id) {
            return false;
        }
        self.analytics.conversation_removed();
        if self.active_conversation_id.as_deref() == Some(id) {
            self.new_session();
        }
        self.observer
            .on_conversation_list_changed(self.conversations.list());
        self.observer.on_analytics_changed(&self.analytics);
        self.persist();
        true
    }

    /// Deletes the active conversation, if it was ever stored, and resets.
    pub fn delete_current(&mut self) {
        match self.active_conversation_id.clone() {
            Some(id) => {
                self.delete_conversation(&id);
            }
            None => self.new_session(),
        }
    }

    /// Forgets every conversation and zeroes the analytics.
    pub fn clear_all(&mut self) {
        let removed = self.conversations.delete_all();
        info!(removed, "Cleared all conversations");
        self.analytics.reset();
        self.new_session();
        self.observer
            .on_conversation_list_changed(self.conversations.list());
        self.observer.on_analytics_changed(&self.analytics);
        self.persist();
    }

    pub fn export(&self, id: &str, format: ExportFormat) -> Result<String, ExportError> {
        let conversation = self
            .conversations
            .get(id)
            .ok_or_else(|| ExportError::NotFound(id.to_string()))?;
        export::render(conversation, format, &self.assistant_name)
    }

    fn commit_active(&mut self) {
        let Some(id) = self.active_conversation_id.clone() else {
            return;
        };
        match self.conversations.commit(&id, &self.pending_transcript) {
            CommitOutcome::Updated => {}
            CommitOutcome::Pruned => {
                self.analytics.conversation_removed();
                self.active_conversation_id = None;
            }
            CommitOutcome::Missing => {
                warn!(conversation_id = %id, "Active conversation vanished before commit");
                self.active_conversation_id = None;
            }
        }
        self.observer
            .on_conversation_list_changed(self.conversations.list());
    }

    fn abandon_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
            debug!(
                request_id = in_flight.request_id,
                waited_ms = in_flight.started_at.elapsed().as_millis() as u64,
                "Abandoned in-flight request"
            );
        }
    }

    fn notify_state(&mut self) {
        let status = self.status();
        self.observer.on_session_state_changed(&status);
    }

    fn persist(&self) {
        if let Err(err) = self.store.save_conversations(self.conversations.list()) {
            warn!(error = %err, "Failed to save conversations");
        }
        if let Err(err) = self.store.save_analytics(&self.analytics) {
            warn!(error = %err, "Failed to save analytics");
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The transcript minus the trailing user message being asked right now.
fn history_before_current(transcript: &[Message]) -> &[Message] {
    match transcript.split_last() {
        Some((last, earlier)) if last.is_user() => earlier,
        _ => transcript,
    }
}
