use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from `config.toml`. Every key is optional; unset keys fall
/// back to the values in [`crate::core::config::defaults`].
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Root URL of the inference service (a URL ending in `/generate` is accepted too)
    pub base_url: Option<String>,
    /// Number of user/assistant exchanges sent as context with each question
    pub history_exchanges: Option<usize>,
    /// Seconds to wait for a generated answer; 0 waits forever
    pub request_timeout_secs: Option<u64>,
    /// Name the assistant introduces itself with
    pub assistant_name: Option<String>,
    /// Directory holding conversations, analytics and preferences
    pub data_dir: Option<PathBuf>,
}

/// Keys accepted by `nebras set` and `nebras unset`.
pub const SETTABLE_KEYS: &[&str] = &[
    "base-url",
    "history-exchanges",
    "request-timeout",
    "assistant-name",
    "data-dir",
];

impl Config {
    /// Sets one key from its command-line spelling.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("A value is required for {key}"));
        }
        match key {
            "base-url" => self.base_url = Some(value.to_string()),
            "history-exchanges" => {
                let exchanges = value.parse().map_err(|_| {
                    format!("history-exchanges must be a whole number, got '{value}'")
                })?;
                self.history_exchanges = Some(exchanges);
            }
            "request-timeout" => {
                let secs = value.trim_end_matches('s').parse().map_err(|_| {
                    format!("request-timeout must be a number of seconds, got '{value}'")
                })?;
                self.request_timeout_secs = Some(secs);
            }
            "assistant-name" => self.assistant_name = Some(value.to_string()),
            "data-dir" => self.data_dir = Some(PathBuf::from(value)),
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Clears one key so its default applies again.
    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "base-url" => self.base_url = None,
            "history-exchanges" => self.history_exchanges = None,
            "request-timeout" => self.request_timeout_secs = None,
            "assistant-name" => self.assistant_name = None,
            "data-dir" => self.data_dir = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> String {
    format!(
        "Unknown config key '{key}'. Available keys: {}",
        SETTABLE_KEYS.join(", ")
    )
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/nebras/config.toml` → `~/.config/nebras/config.toml`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
