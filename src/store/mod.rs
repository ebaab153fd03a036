//! Durable key-value storage for the client's four tables.
//!
//! Each key is a single file under the store directory holding one whole
//! blob. Writes go through a temporary file that is renamed over the target,
//! so a reader only ever sees the previous or the new value.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::analytics::Analytics;
use crate::core::conversation::Conversation;
use crate::ui::theme::Theme;

pub const CONVERSATIONS_KEY: &str = "nebras_conversations";
pub const ANALYTICS_KEY: &str = "nebras_analytics";
pub const THEME_KEY: &str = "nebras_theme";
pub const HIDE_DISCLAIMER_KEY: &str = "nebras_hide_disclaimer";

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    Encode { key: String, source: serde_json::Error },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, source } => {
                write!(f, "Failed to access store entry {}: {}", path.display(), source)
            }
            StoreError::Encode { key, source } => {
                write!(f, "Failed to encode store entry '{key}': {source}")
            }
        }
    }
}

impl StdError for StoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StoreError::Io { source, .. } => Some(source),
            StoreError::Encode { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform data directory for the store, if one can be determined.
    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "nebras", "nebras").map(|dirs| dirs.data_dir().to_path_buf())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key);
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(io_err)?;
        let mut temp_file = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        temp_file.write_all(value.as_bytes()).map_err(io_err)?;
        temp_file.as_file_mut().sync_all().map_err(io_err)?;
        temp_file.persist(&path).map_err(|err| io_err(err.error))?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Reads a JSON blob. A corrupt blob is moved aside to
    /// `<key>.corrupt-<millis>` and treated as absent, so the next write
    /// cannot destroy the only copy.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                let kept = self.quarantine(key)?;
                warn!(
                    key,
                    error = %err,
                    kept = %kept.display(),
                    "Unreadable store entry moved aside"
                );
                Ok(None)
            }
        }
    }

    fn quarantine(&self, key: &str) -> Result<PathBuf, StoreError> {
        let path = self.entry_path(key);
        let millis = Utc::now().timestamp_millis();
        let mut target = self.root.join(format!("{key}.corrupt-{millis}"));
        let mut attempt = 1;
        while target.exists() {
            target = self.root.join(format!("{key}.corrupt-{millis}-{attempt}"));
            attempt += 1;
        }
        fs::rename(&path, &target).map_err(|source| StoreError::Io { path, source })?;
        Ok(target)
    }

    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.set(key, &encoded)
    }

    pub fn load_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        Ok(self.get_json(CONVERSATIONS_KEY)?.unwrap_or_default())
    }

    pub fn save_conversations(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        self.set_json(CONVERSATIONS_KEY, conversations)
    }

    pub fn load_analytics(&self) -> Result<Analytics, StoreError> {
        Ok(self.get_json(ANALYTICS_KEY)?.unwrap_or_default())
    }

    pub fn save_analytics(&self, analytics: &Analytics) -> Result<(), StoreError> {
        self.set_json(ANALYTICS_KEY, analytics)
    }

    pub fn load_theme(&self) -> Result<Theme, StoreError> {
        let stored = self.get(THEME_KEY)?;
        Ok(match stored.as_deref().map(str::trim) {
            None => Theme::default(),
            Some(value) => Theme::parse(value).unwrap_or_else(|| {
                warn!(value, "Ignoring unknown stored theme");
                Theme::default()
            }),
        })
    }

    pub fn save_theme(&self, theme: Theme) -> Result<(), StoreError> {
        self.set(THEME_KEY, theme.as_str())
    }

    pub fn disclaimer_hidden(&self) -> Result<bool, StoreError> {
        Ok(self.get(HIDE_DISCLAIMER_KEY)?.as_deref().map(str::trim) == Some("true"))
    }

    pub fn set_disclaimer_hidden(&self, hidden: bool) -> Result<(), StoreError> {
        self.set(HIDE_DISCLAIMER_KEY, if hidden { "true" } else { "false" })
    }
}
