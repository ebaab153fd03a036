//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::{HttpInferenceClient, InferenceClient};
use crate::core::config::{path_display, Config};
use crate::core::conversation::ConversationManager;
use crate::core::events::NullObserver;
use crate::core::message::ERROR_REPLY;
use crate::core::session::{SendOutcome, SessionController, SessionOptions};
use crate::export::{self, write_export, ExportError, ExportFormat};
use crate::store::LocalStore;
use crate::ui::chat_loop::run_chat;
use crate::ui::renderer::{conversation_list_text, health_text, stats_text};
use crate::utils::logging::init_tracing;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ")"
);

#[derive(Parser)]
#[command(name = "nebras")]
#[command(version = VERSION)]
#[command(about = "A terminal chat client for the Nebras medical assistant")]
#[command(
    long_about = "Nebras is a terminal chat client for a medical-assistant text generation \
service. Conversations, usage statistics and preferences are kept on this machine.\n\n\
Nebras gives general health information only. It is not a substitute for a healthcare \
provider.\n\n\
Environment Variables:\n\
  NEBRAS_BASE_URL   Service root URL (overrides the config file)\n\
  NEBRAS_DATA_DIR   Where conversations and statistics are stored\n\
  NEBRAS_LOG        Diagnostic log filter, e.g. nebras=debug (falls back to RUST_LOG)\n\n\
Commands inside a chat:\n\
  /help             List every command\n\
  /retry            Send the last failed question again\n\
  /new              Start a new conversation\n\
  /list, /load <#>  Browse and reopen saved conversations\n\
  /export <format>  Save the conversation as text, json or html\n\
  /quit             Leave"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Service root URL (a URL ending in /generate is accepted too)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Directory for conversations, statistics and preferences
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Number of previous exchanges sent as context
    #[arg(long, global = true, value_name = "N")]
    pub history: Option<usize>,

    /// Seconds to wait for an answer (0 waits forever)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print diagnostic logs to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// The question (may be several words)
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// List saved conversations, most recent first
    List,
    /// Export a saved conversation
    Export {
        /// Conversation id or position from `nebras list`
        id: String,
        /// Output format: text, json or html
        #[arg(short, long, default_value = "text")]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,
    },
    /// Show usage statistics
    Stats,
    /// Check whether the service is reachable
    Health,
    /// Show the effective configuration
    Config,
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set (several words are joined with spaces)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Some(Commands::Set { ref key, ref value }) => {
            let mut config = Config::load()?;
            let value = value.join(" ");
            if let Err(e) = config.set_value(key, &value) {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            save_config(&config)?;
            println!("✅ Set {key} to: {value}");
            return Ok(());
        }
        Some(Commands::Unset { ref key }) => {
            let mut config = Config::load()?;
            if let Err(e) = config.unset_value(key) {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            save_config(&config)?;
            println!("✅ Unset {key}");
            return Ok(());
        }
        _ => {}
    }

    let config = resolve_config(&args)?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let store = open_store(&config)?;
            run_chat(build_client(&config), store, session_options(&config)).await
        }
        Commands::Ask { text } => ask(&config, &text.join(" ")).await,
        Commands::List => {
            let store = open_store(&config)?;
            let (conversations, _) = ConversationManager::from_stored(store.load_conversations()?);
            println!("{}", conversation_list_text(conversations.list(), None));
            Ok(())
        }
        Commands::Export {
            id,
            format,
            output,
            force,
        } => export_conversation(&config, &id, format, output, force),
        Commands::Stats => {
            let store = open_store(&config)?;
            let mut analytics = store.load_analytics()?;
            let (conversations, dropped) =
                ConversationManager::from_stored(store.load_conversations()?);
            analytics.conversations_removed(dropped);
            println!(
                "{}",
                stats_text(&analytics, conversations.oldest_created_at())
            );
            Ok(())
        }
        Commands::Health => {
            let healthy = build_client(&config).health_check().await;
            println!("{} ({})", health_text(healthy), config.base_url());
            if !healthy {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Config => {
            config.print_all();
            match Config::config_path() {
                Some(path) => println!("  config-file: {}", path_display(path)),
                None => println!("  config-file: (unavailable)"),
            }
            Ok(())
        }
        Commands::Set { .. } | Commands::Unset { .. } => Ok(()),
    }
}

/// File, then environment, then command-line flags.
fn resolve_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    let mut config = Config::load()?;
    config.apply_env(|key| std::env::var(key).ok());
    apply_flags(&mut config, args);
    Ok(config)
}

fn apply_flags(config: &mut Config, args: &Args) {
    if let Some(url) = &args.base_url {
        config.base_url = Some(url.clone());
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(history) = args.history {
        config.history_exchanges = Some(history);
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = Some(timeout);
    }
}

fn save_config(config: &Config) -> Result<(), Box<dyn Error>> {
    let path = Config::config_path().ok_or("Could not determine the config directory")?;
    config.save_to_path(&path)
}

fn open_store(config: &Config) -> Result<LocalStore, Box<dyn Error>> {
    let dir = config
        .data_dir()
        .ok_or("Could not determine a data directory; pass --data-dir")?;
    Ok(LocalStore::open(dir))
}

fn build_client(config: &Config) -> Arc<dyn InferenceClient> {
    Arc::new(HttpInferenceClient::new(
        config.base_url(),
        config.request_timeout(),
    ))
}

fn session_options(config: &Config) -> SessionOptions {
    SessionOptions {
        assistant_name: config.assistant_name().to_string(),
        history_exchanges: config.history_exchanges(),
    }
}

async fn ask(config: &Config, question: &str) -> Result<(), Box<dyn Error>> {
    let store = open_store(config)?;
    let mut controller = SessionController::new(
        build_client(config),
        store,
        Box::new(NullObserver),
        session_options(config),
    )?;

    match controller.submit(question).await {
        SendOutcome::Greeting(reply) | SendOutcome::Answered(reply) => {
            println!("{reply}");
            Ok(())
        }
        SendOutcome::Failed(e) => {
            eprintln!("❌ {ERROR_REPLY}");
            Err(e.into())
        }
        SendOutcome::Ignored => Err("Nothing to ask".into()),
        SendOutcome::Busy | SendOutcome::Discarded => Err("The request was abandoned".into()),
    }
}

fn export_conversation(
    config: &Config,
    reference: &str,
    format: ExportFormat,
    output: Option<PathBuf>,
    force: bool,
) -> Result<(), Box<dyn Error>> {
    let store = open_store(config)?;
    let (conversations, _) = ConversationManager::from_stored(store.load_conversations()?);
    let conversation = crate::commands::resolve_conversation_ref(conversations.list(), reference)
        .and_then(|id| conversations.get(&id))
        .ok_or_else(|| ExportError::NotFound(reference.to_string()))?;

    let contents = export::render(conversation, format, config.assistant_name())?;
    match output {
        Some(path) => {
            write_export(&path, &contents, force)?;
            eprintln!("✅ Exported to {}", path.display());
        }
        None => println!("{contents}"),
    }
    Ok(())
}
