//! Terminal front-end for interactive chat sessions.
//!
//! - [`chat_loop`]: reads input, dispatches commands to [`crate::commands`]
//!   and runs generate calls in the background.
//! - [`renderer`]: prints session notifications and command output.
//! - [`theme`]: light and dark colour palettes.
//!
//! This layer only presents state; [`crate::core`] owns it.

pub mod chat_loop;
pub mod renderer;
pub mod theme;
