//! Interactive chat loop.
//!
//! Reads lines from stdin, turns them into commands or messages, and runs
//! each generate call on its own task. Completions come back over a channel
//! tagged with their request id, so the controller can drop any that belong
//! to a session the user has already left.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::InferenceClient;
use crate::commands::{help_text, process_input, resolve_conversation_ref, CommandResult};
use crate::core::events::Intent;
use crate::core::session::{
    run_request, Completion, IntentOutcome, PendingRequest, SessionController, SessionOptions,
    SubmitOutcome,
};
use crate::export::{suggested_filename, write_export, ExportFormat};
use crate::store::LocalStore;
use crate::ui::renderer::{
    conversation_list_text, health_text, stats_text, Console, DisplayPrefs, TerminalRenderer,
};
use crate::ui::theme::Theme;

/// Runs generate calls off the input loop and reports back over a channel.
#[derive(Clone)]
pub struct RequestDispatcher {
    tx: mpsc::UnboundedSender<Completion>,
}

impl RequestDispatcher {
    pub fn new(tx: mpsc::UnboundedSender<Completion>) -> Self {
        Self { tx }
    }

    pub fn spawn(&self, client: Arc<dyn InferenceClient>, request: PendingRequest) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let request_id = request.request_id;
            match run_request(client, request).await {
                Some(completion) => {
                    let _ = tx.send(completion);
                }
                None => debug!(request_id, "Request cancelled before completion"),
            }
        });
    }
}

/// Probes the service in the background and reports the answer.
#[derive(Clone)]
pub struct HealthProbe {
    tx: mpsc::UnboundedSender<bool>,
}

impl HealthProbe {
    pub fn new(tx: mpsc::UnboundedSender<bool>) -> Self {
        Self { tx }
    }

    pub fn spawn(&self, client: Arc<dyn InferenceClient>) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let healthy = client.health_check().await;
            let _ = tx.send(healthy);
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit,
}

/// Everything one line of input can touch.
pub struct ChatLoop<W: Write> {
    controller: SessionController,
    console: Console<W>,
    dispatcher: RequestDispatcher,
    health: HealthProbe,
}

impl<W: Write> ChatLoop<W> {
    pub fn new(
        controller: SessionController,
        console: Console<W>,
        dispatcher: RequestDispatcher,
        health: HealthProbe,
    ) -> Self {
        Self {
            controller,
            console,
            dispatcher,
            health,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn into_console(self) -> Console<W> {
        self.console
    }

    pub fn complete(&mut self, completion: Completion) {
        self.controller.complete(completion);
    }

    pub fn report_health(&mut self, healthy: bool) {
        let text = health_text(healthy);
        if healthy {
            self.console.notice(text);
        } else {
            self.console.error(text);
        }
    }

    pub fn handle_line(&mut self, line: &str) -> LoopControl {
        match process_input(line) {
            CommandResult::ProcessAsMessage(text) => {
                let status = self.controller.status();
                match status.last_failed_message.as_deref() {
                    Some(failed) if status.is_retry_armed() => {
                        let notice = format!("Retrying your previous question: \"{failed}\"");
                        self.console.notice(&notice);
                    }
                    _ if text.trim().is_empty() => return LoopControl::Continue,
                    _ => {}
                }
                let outcome = self.controller.begin_submit(&text);
                self.dispatch(outcome);
            }
            CommandResult::Session(intent) => {
                let is_retry = intent == Intent::RetryRequested;
                match self.controller.handle(intent) {
                    IntentOutcome::Submitted(SubmitOutcome::Ignored) if is_retry => {
                        self.console.notice("Nothing to retry.");
                    }
                    IntentOutcome::Submitted(outcome) => self.dispatch(outcome),
                    IntentOutcome::UnknownConversation(id) => self.unknown_conversation(&id),
                    IntentOutcome::Exported(_) | IntentOutcome::Done => {}
                }
            }
            CommandResult::Load(reference) => {
                let Some(id) = self.resolve(&reference) else {
                    return LoopControl::Continue;
                };
                if self.controller.active_conversation_id() == Some(id.as_str()) {
                    self.console.notice("That conversation is already open.");
                    return LoopControl::Continue;
                }
                if let IntentOutcome::UnknownConversation(id) =
                    self.controller.handle(Intent::ConversationSelected { id })
                {
                    self.unknown_conversation(&id);
                }
            }
            CommandResult::Delete(reference) => {
                let Some(id) = self.resolve(&reference) else {
                    return LoopControl::Continue;
                };
                match self.controller.handle(Intent::DeleteRequested { id }) {
                    IntentOutcome::UnknownConversation(id) => self.unknown_conversation(&id),
                    _ => self.console.notice("Conversation deleted."),
                }
            }
            CommandResult::Export {
                format,
                target,
                path,
            } => self.export(format, target, path),
            CommandResult::List => {
                let text = conversation_list_text(
                    self.controller.conversations(),
                    self.controller.active_conversation_id(),
                );
                self.console.block(&text);
            }
            CommandResult::Stats => {
                let text = stats_text(
                    self.controller.analytics(),
                    self.controller.oldest_conversation_date(),
                );
                self.console.block(&text);
            }
            CommandResult::Theme(theme) => self.set_theme(theme),
            CommandResult::Disclaimer(None) => self.console.disclaimer(),
            CommandResult::Disclaimer(Some(hidden)) => self.set_disclaimer_hidden(hidden),
            CommandResult::Health => {
                self.console.notice("Checking service...");
                self.health.spawn(self.controller.client());
            }
            CommandResult::Help => self.console.block(&help_text()),
            CommandResult::Quit => return LoopControl::Quit,
            CommandResult::Usage(usage) => self.console.notice(usage),
        }
        LoopControl::Continue
    }

    fn dispatch(&mut self, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Dispatched(request) => {
                self.dispatcher.spawn(self.controller.client(), request);
            }
            SubmitOutcome::Busy => {
                self.console
                    .notice("Still waiting for the previous answer. Please hold on.");
            }
            SubmitOutcome::Greeting { .. } | SubmitOutcome::Ignored => {}
        }
    }

    fn resolve(&mut self, reference: &str) -> Option<String> {
        let resolved = resolve_conversation_ref(self.controller.conversations(), reference);
        if resolved.is_none() {
            self.unknown_conversation(reference);
        }
        resolved
    }

    fn unknown_conversation(&mut self, reference: &str) {
        let text = format!("No conversation matches '{reference}'. Use /list to see them.");
        self.console.error(&text);
    }

    fn export(&mut self, format: ExportFormat, target: Option<String>, path: Option<PathBuf>) {
        let id = match target {
            Some(reference) => match self.resolve(&reference) {
                Some(id) => id,
                None => return,
            },
            None => match self.controller.active_conversation_id() {
                Some(id) => id.to_string(),
                None => {
                    self.console.error("No messages to export");
                    return;
                }
            },
        };

        let contents = match self.controller.export(&id, format) {
            Ok(contents) => contents,
            Err(err) => {
                self.console.error(&err.to_string());
                return;
            }
        };
        let path = path.unwrap_or_else(|| PathBuf::from(suggested_filename(format, Utc::now())));
        match write_export(&path, &contents, false) {
            Ok(()) => {
                let text = format!("Exported to {}", path.display());
                self.console.notice(&text);
            }
            Err(err) => self.console.error(&err.to_string()),
        }
    }

    fn set_theme(&mut self, theme: Option<Theme>) {
        let prefs = Rc::clone(self.console.prefs());
        let theme = theme.unwrap_or_else(|| prefs.theme().toggled());
        prefs.set_theme(theme);
        if let Err(err) = self.controller.store().save_theme(theme) {
            warn!(error = %err, "Failed to save theme");
        }
        let text = format!("Theme set to {}.", theme.as_str());
        self.console.notice(&text);
    }

    fn set_disclaimer_hidden(&mut self, hidden: bool) {
        self.console.prefs().set_disclaimer_hidden(hidden);
        if let Err(err) = self.controller.store().set_disclaimer_hidden(hidden) {
            warn!(error = %err, "Failed to save disclaimer preference");
        }
        self.console.notice(if hidden {
            "The disclaimer will no longer be shown for new chats."
        } else {
            "The disclaimer will be shown for new chats."
        });
    }
}

/// Starts an interactive session on stdin/stdout.
pub async fn run_chat(
    client: Arc<dyn InferenceClient>,
    store: LocalStore,
    options: SessionOptions,
) -> Result<(), Box<dyn Error>> {
    let prefs = Rc::new(DisplayPrefs::from_store(&store));
    let renderer = TerminalRenderer::new(Console::stdout(
        Rc::clone(&prefs),
        &options.assistant_name,
    ));
    let mut console = Console::stdout(Rc::clone(&prefs), &options.assistant_name);
    let controller =
        SessionController::new(Arc::clone(&client), store, Box::new(renderer), options)?;

    console.session_banner();
    console.notice("Type /help for commands, /quit to leave.");

    let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<Completion>();
    let (health_tx, mut health_rx) = mpsc::unbounded_channel::<bool>();
    let health = HealthProbe::new(health_tx);
    health.spawn(client);

    let mut chat = ChatLoop::new(
        controller,
        console,
        RequestDispatcher::new(completion_tx),
        health,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if chat.handle_line(&line) == LoopControl::Quit {
                            break;
                        }
                    }
                    None => break,
                }
            }
            Some(completion) = completion_rx.recv() => chat.complete(completion),
            Some(healthy) = health_rx.recv() => chat.report_health(healthy),
        }
    }

    let mut console = chat.into_console();
    console.notice("Take care! 👋");
    io::stdout().flush()?;
    Ok(())
}
