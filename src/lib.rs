//! Nebras is a terminal chat client for a remote medical-assistant text
//! generation endpoint.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation model, the greeting shortcut, prompt
//!   assembly, usage analytics and the session state machine that drives one
//!   send cycle at a time.
//! - [`api`] defines the wire payloads and the HTTP client for the
//!   `generate` endpoint and its health probe.
//! - [`store`] persists conversations, analytics, theme and the disclaimer
//!   flag as independent blobs on disk.
//! - [`export`] renders a conversation as plain text, JSON or HTML.
//! - [`ui`] and [`commands`] implement the terminal front-end that feeds user
//!   intents into the session controller and renders its notifications.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod export;
pub mod store;
pub mod ui;
pub mod utils;
