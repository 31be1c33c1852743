use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;
use tracing::{debug, warn};

/// The single well-known key the bearer token lives under.
pub const TOKEN_KEY: &str = "webVault";

/// Storage file name inside the storage directory
const STORAGE_FILE: &str = "local_storage.json";

/// Keychain service the token entry is registered under
const SERVICE_NAME: &str = "koinsave";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Key-value persistence bound to one fixed key.
///
/// Implementations are shared between the session validator, the auth API
/// and guard tasks, so they take `&self` and handle their own interior
/// mutability. No cross-process coordination is attempted: whichever
/// context writes or clears last wins.
pub trait TokenStore: Send + Sync {
    /// Read the stored token, `None` when absent.
    fn get(&self) -> Result<Option<String>, StoreError>;

    /// Store `token`, replacing any previous value.
    fn set(&self, token: &str) -> Result<(), StoreError>;

    /// Remove the token. Clearing an absent token succeeds.
    fn clear(&self) -> Result<(), StoreError>;
}

/// In-process store. Lives only as long as the value itself.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave the map half-written
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(TOKEN_KEY).cloned())
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        self.entries().insert(TOKEN_KEY.to_string(), token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries().remove(TOKEN_KEY);
        Ok(())
    }
}

/// Local-storage style store: a JSON object file of key/value strings.
///
/// The storage directory is the scope. Two processes pointed at the same
/// directory see the same token; different directories never do.
#[derive(Debug)]
pub struct FileTokenStore {
    storage_dir: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self {
            storage_dir,
            lock: Mutex::new(()),
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage_dir.join(STORAGE_FILE)
    }

    fn load(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Load for a write. A corrupt file is discarded (flag set) so the write
    /// can replace it; readers still see the corruption as an error.
    fn load_for_write(path: &Path) -> Result<(BTreeMap<String, String>, bool), StoreError> {
        match Self::load(path) {
            Ok(entries) => Ok((entries, false)),
            Err(StoreError::Corrupt(e)) => {
                warn!(?path, error = %e, "Storage file is corrupt, resetting it");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    /// Write via a sibling temp file and rename, so readers never see a
    /// partially written file.
    fn save(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
        std::fs::write(&tmp_path, contents)?;
        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = Self::load(&self.storage_path())?;
        Ok(entries.remove(TOKEN_KEY))
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.storage_path();
        let (mut entries, _) = Self::load_for_write(&path)?;
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        Self::save(&path, &entries)?;
        debug!(?path, "Token written to storage");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.storage_path();
        let (mut entries, reset) = Self::load_for_write(&path)?;
        if entries.remove(TOKEN_KEY).is_some() || reset {
            Self::save(&path, &entries)?;
            debug!(?path, "Token removed from storage");
        }
        Ok(())
    }
}

/// Token held in the OS keychain.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, TOKEN_KEY)?)
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        self.entry()?.set_password(token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
