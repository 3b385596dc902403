//! API key sources.
//!
//! The console and the voice bot never read keys from globals. They are
//! handed a [`CredentialProvider`] at startup: either a fixed key from the
//! configuration or a small JSON key file that persists until cleared.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::core::realtime::RealtimeEndpoint;

/// Key under which the API key is kept in the key file.
pub const API_KEY_STORAGE_KEY: &str = "tmp::voice_api_key";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Failed to access key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Key file {path} is not a JSON object: {message}")]
    Format { path: PathBuf, message: String },

    #[error("No API key configured")]
    MissingApiKey,
}

/// Source of the OpenAI API key.
pub trait CredentialProvider: Send + Sync {
    /// The current key, if any.
    fn api_key(&self) -> Option<String>;

    /// Remember `key` for later calls.
    fn store(&self, key: &str) -> Result<(), CredentialError>;

    /// Forget the key.
    fn clear(&self) -> Result<(), CredentialError>;
}

fn non_empty(key: &str) -> Option<String> {
    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}

fn wipe(slot: &mut Option<String>) {
    if let Some(key) = slot.as_mut() {
        key.zeroize();
    }
    *slot = None;
}

/// In-memory key, typically from `OPENAI_API_KEY`.
#[derive(Default)]
pub struct StaticCredentials {
    key: RwLock<Option<String>>,
}

impl StaticCredentials {
    pub fn new(key: Option<&str>) -> Self {
        Self {
            key: RwLock::new(key.and_then(non_empty)),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.key.read().clone()
    }

    fn store(&self, key: &str) -> Result<(), CredentialError> {
        let mut slot = self.key.write();
        wipe(&mut slot);
        *slot = non_empty(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        wipe(&mut self.key.write());
        Ok(())
    }
}

impl Drop for StaticCredentials {
    fn drop(&mut self) {
        wipe(self.key.get_mut());
    }
}

/// Plaintext JSON key file. Other entries in the file are preserved.
pub struct FileCredentialStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileCredentialStore {
    /// Open the store, reading any key already saved at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let entries = read_entries(&path)?;
        let cached = entries
            .get(API_KEY_STORAGE_KEY)
            .and_then(Value::as_str)
            .and_then(non_empty);
        debug!(path = %path.display(), has_key = cached.is_some(), "Opened key file");
        Ok(Self {
            path,
            cached: RwLock::new(cached),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), CredentialError> {
        let io_err = |source| CredentialError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(entries).map_err(|e| CredentialError::Format {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, body).map_err(io_err)
    }
}

fn read_entries(path: &Path) -> Result<Map<String, Value>, CredentialError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(CredentialError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CredentialError::Format {
            path: path.to_path_buf(),
            message: format!("found {other}"),
        }),
        Err(e) => Err(CredentialError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

impl CredentialProvider for FileCredentialStore {
    fn api_key(&self) -> Option<String> {
        self.cached.read().clone()
    }

    fn store(&self, key: &str) -> Result<(), CredentialError> {
        let Some(key) = non_empty(key) else {
            return self.clear();
        };
        let mut entries = read_entries(&self.path)?;
        entries.insert(API_KEY_STORAGE_KEY.to_string(), Value::String(key.clone()));
        self.write_entries(&entries)?;

        let mut slot = self.cached.write();
        wipe(&mut slot);
        *slot = Some(key);
        info!(path = %self.path.display(), "API key saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let mut entries = read_entries(&self.path)?;
        if entries.remove(API_KEY_STORAGE_KEY).is_some() {
            self.write_entries(&entries)?;
        }
        wipe(&mut self.cached.write());
        info!(path = %self.path.display(), "API key cleared");
        Ok(())
    }
}

impl Drop for FileCredentialStore {
    fn drop(&mut self) {
        wipe(self.cached.get_mut());
    }
}

/// Pick how the realtime client connects.
///
/// A configured relay holds the key itself, so no key is needed.
pub fn resolve_endpoint(
    relay_url: Option<&str>,
    credentials: &dyn CredentialProvider,
) -> Result<RealtimeEndpoint, CredentialError> {
    if let Some(url) = relay_url.and_then(non_empty) {
        return Ok(RealtimeEndpoint::Relay { url });
    }
    credentials
        .api_key()
        .map(|api_key| RealtimeEndpoint::Direct { api_key })
        .ok_or(CredentialError::MissingApiKey)
}
