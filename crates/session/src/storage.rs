use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

pub type Result<T> = std::result::Result<T, StorageError>;

/// String key/value store.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Process-lifetime storage. Everything in it disappears with the shell.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// Durable storage: one JSON object on disk, rewritten atomically on each change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open (or lazily create) `state.json` under `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join("state.json"),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(HashMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`load`](Self::load), but a corrupt file is moved to `state.json.corrupt`
    /// and replaced by an empty map so writes can proceed.
    fn load_for_write(&self) -> Result<HashMap<String, String>> {
        match self.load() {
            Err(StorageError::Corrupt(e)) => {
                let quarantine = self.path.with_extension("json.corrupt");
                warn!("Discarding corrupt {} ({}), kept as {}", self.path.display(), e, quarantine.display());
                fs::rename(&self.path, &quarantine)?;
                Ok(HashMap::new())
            }
            other => other,
        }
    }

    fn store(&self, items: &HashMap<String, String>) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(items)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut items = self.load_for_write()?;
        items.insert(key.to_string(), value.to_string());
        self.store(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut items = self.load_for_write()?;
        if items.remove(key).is_some() {
            self.store(&items)?;
        }
        Ok(())
    }
}

/// Backend that refuses every operation, e.g. when no data directory exists.
#[derive(Debug, Clone)]
pub struct UnavailableStorage {
    reason: String,
}

impl UnavailableStorage {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl Storage for UnavailableStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    fn remove_item(&self, _key: &str) -> Result<()> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}

/// Fail-soft view over a backend: errors are logged and read as absence.
#[derive(Clone)]
pub struct SafeStorage {
    inner: Arc<dyn Storage>,
}

impl SafeStorage {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self { inner }
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.inner.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read {} from storage: {}", key, e);
                None
            }
        }
    }

    /// Returns whether the write landed.
    pub fn set(&self, key: &str, value: &str) -> bool {
        match self.inner.set_item(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write {} to storage: {}", key, e);
                false
            }
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(e) = self.inner.remove_item(key) {
            warn!("Failed to remove {} from storage: {}", key, e);
        }
    }
}
