//! Durable client-local key/value storage for the credential and profile snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key holding the raw credential string
pub const TOKEN_KEY: &str = "token";

/// Storage key holding the JSON profile snapshot
pub const PROFILE_KEY: &str = "user";

/// Keyring service name
const SERVICE_NAME: &str = "fintrack";

/// Credential file name in the data directory
const STORE_FILE: &str = "credentials.json";

/// A small string key/value store that outlives the in-memory session.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Where the CLI keeps credentials between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keyring,
}

/// Open the configured backend.
pub fn open_store(backend: CredentialBackend, data_dir: &Path) -> Arc<dyn CredentialStore> {
    match backend {
        CredentialBackend::File => Arc::new(FileStore::new(data_dir.join(STORE_FILE))),
        CredentialBackend::Keyring => Arc::new(KeyringStore),
    }
}

/// Process-local store. Nothing survives the process; used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON map on disk, written with owner-only permissions on Unix.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_contents(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read credential file")?;
        Ok(Some(contents).filter(|c| !c.trim().is_empty()))
    }

    fn read_map(&self) -> Result<HashMap<String, String>> {
        match self.read_contents()? {
            Some(contents) => {
                serde_json::from_str(&contents).context("Failed to parse credential file")
            }
            None => Ok(HashMap::new()),
        }
    }

    /// Map to modify before a write, and whether a corrupt file was discarded.
    /// An unparseable file is replaced on the next write rather than blocking it.
    fn read_map_for_update(&self) -> Result<(HashMap<String, String>, bool)> {
        let Some(contents) = self.read_contents()? else {
            return Ok((HashMap::new(), false));
        };
        match serde_json::from_str(&contents) {
            Ok(map) => Ok((map, false)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt credential file");
                Ok((HashMap::new(), true))
            }
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if map.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove credential file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;

        // Write to temp, then rename over the old file
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, contents).context("Failed to write credential file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp_path, &self.path).context("Failed to replace credential file")?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let (mut map, _) = self.read_map_for_update()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)?;
        debug!(path = %self.path.display(), key, "Stored entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let (mut map, discarded) = self.read_map_for_update()?;
        if map.remove(key).is_some() || discarded {
            self.write_map(&map)?;
            debug!(path = %self.path.display(), key, "Removed entry");
        }
        Ok(())
    }
}

/// OS keychain, one entry per key under the `fintrack` service.
#[derive(Debug, Default)]
pub struct KeyringStore;

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = Entry::new(SERVICE_NAME, key).context("Failed to create keyring entry")?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, key).context("Failed to create keyring entry")?;
        entry
            .set_password(value)
            .context("Failed to store entry in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, key).context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete entry from keychain"),
        }
    }
}
