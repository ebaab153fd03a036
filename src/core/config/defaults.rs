use crate::core::config::data::Config;
use crate::core::prompt::DEFAULT_HISTORY_EXCHANGES;
use crate::store::LocalStore;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://nebras-medical-chatbot-chatbotapi.hf.space";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ASSISTANT_NAME: &str = "Nebras";

pub const BASE_URL_ENV: &str = "NEBRAS_BASE_URL";
pub const DATA_DIR_ENV: &str = "NEBRAS_DATA_DIR";

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn history_exchanges(&self) -> usize {
        self.history_exchanges.unwrap_or(DEFAULT_HISTORY_EXCHANGES)
    }

    /// `None` means generation requests are never cut off.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
        {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn assistant_name(&self) -> &str {
        self.assistant_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_ASSISTANT_NAME)
    }

    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(LocalStore::default_dir)
    }

    /// Apply environment overrides, reading variables through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }
}
