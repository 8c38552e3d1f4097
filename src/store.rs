// SPDX-License-Identifier: MIT

//! Durable credential storage.
//!
//! The authenticated client owns the in-memory [`Credentials`] and keeps the
//! persisted copy in sync through this seam after every mutation. Write
//! failures surface as [`Error::Persistence`]: a refreshed token that only
//! exists in memory would desync from the provider on the next run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::Credentials;

const CONFIG_DIR_NAME: &str = ".whoopsync";
const CONFIG_FILE_NAME: &str = "config.json";
/// Top-level key the credentials live under inside the config document.
const CREDENTIALS_KEY: &str = "whoop";

/// Durable store for a single connected account's credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the most recently stored record, if any.
    async fn load(&self) -> Result<Option<Credentials>>;
    /// Durably store the record.
    async fn save(&self, credentials: &Credentials) -> Result<()>;
    /// Remove the stored record.
    async fn clear(&self) -> Result<()>;
}

/// JSON-file-backed store.
///
/// Credentials live under the `"whoop"` key of a shared config document;
/// other top-level keys are preserved on every write (read-modify-write
/// merge). Writes go through a sibling temp file and a rename so a crash
/// mid-write never corrupts the stored record.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default config file location: `~/.whoopsync/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| Error::Persistence("could not determine home directory".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole config document, tolerating a missing or unreadable
    /// file (read-modify-write starts fresh in that case).
    fn read_document_lenient(&self) -> Map<String, Value> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("could not create {}: {e}", parent.display()))
            })?;
        }

        let body = serde_json::to_string_pretty(&Value::Object(document.clone()))
            .map_err(|e| Error::Persistence(format!("could not serialize config: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .map_err(|e| Error::Persistence(format!("could not write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            Error::Persistence(format!("could not replace {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| {
            Error::Persistence(format!("could not read {}: {e}", self.path.display()))
        })?;
        let document: Value = serde_json::from_str(&raw).map_err(|e| {
            Error::Persistence(format!("{} is not valid JSON: {e}", self.path.display()))
        })?;

        match document.get(CREDENTIALS_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(section) => serde_json::from_value(section.clone())
                .map(Some)
                .map_err(|e| Error::Persistence(format!("stored credentials are invalid: {e}"))),
        }
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        let mut document = self.read_document_lenient();
        let value = serde_json::to_value(credentials)
            .map_err(|e| Error::Persistence(format!("could not serialize credentials: {e}")))?;
        document.insert(CREDENTIALS_KEY.to_string(), value);
        self.write_document(&document)
    }

    async fn clear(&self) -> Result<()> {
        let mut document = self.read_document_lenient();
        if document.remove(CREDENTIALS_KEY).is_some() {
            self.write_document(&document)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and offline use.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Credentials>>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        let store = Self::default();
        *store.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credentials);
        store
    }

    /// Make subsequent writes fail, to exercise persistence-error paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<Option<Credentials>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence("simulated write failure".to_string()));
        }
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credentials.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence("simulated write failure".to_string()));
        }
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
