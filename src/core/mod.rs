pub mod analytics;
pub mod config;
pub mod conversation;
pub mod events;
pub mod greeting;
pub mod message;
pub mod prompt;
pub mod session;
