use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::command::{RequestBody, TranslatedRequest};

/// Key holding the user of the last successful `login`.
pub const LOGGED_USER_KEY: &str = "loggedUser";
/// Key holding a JSON array with the path of every disk created with `mkdisk`.
pub const DISKS_KEY: &str = "disks";

/// Default location of the file backed store, relative to the working directory.
pub const DEFAULT_STORE_PATH: &str = ".diskcmd-session.json";

#[derive(Debug, Diagnostic, Error)]
pub enum StoreError {
    #[error("could not access session store at {}", path.display())]
    #[diagnostic(code(diskcmd::store_io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("session store at {} is not valid JSON", path.display())]
    #[diagnostic(
        code(diskcmd::store_corrupt),
        help("delete the file to start a fresh session")
    )]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("value stored under `{key}` is not valid JSON")]
    #[diagnostic(code(diskcmd::store_value))]
    Value {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value storage for session state.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store persisted as a JSON object in a file, rewritten on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| {
                StoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value.to_string());

        let content = serde_json::to_string_pretty(&*values).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Session state kept on top of an injected [`KeyValueStore`].
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write of the disk list across concurrent commands.
    update: Arc<Mutex<()>>,
}

impl Session {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            update: Arc::default(),
        }
    }

    pub fn logged_user(&self) -> Result<Option<String>, StoreError> {
        self.store.get(LOGGED_USER_KEY)
    }

    pub fn set_logged_user(&self, user: &str) -> Result<(), StoreError> {
        self.store.set(LOGGED_USER_KEY, user)
    }

    /// Paths of the disks created so far, oldest first.
    pub fn disks(&self) -> Result<Vec<String>, StoreError> {
        match self.store.get(DISKS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Value {
                key: DISKS_KEY,
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Remember `path` as a created disk. Already known paths are not added twice.
    pub fn remember_disk(&self, path: &str) -> Result<(), StoreError> {
        let _guard = lock(&self.update);

        let mut disks = self.disks()?;
        if disks.iter().any(|disk| disk == path) {
            return Ok(());
        }
        disks.push(path.to_string());

        let raw = serde_json::to_string(&disks).map_err(|source| StoreError::Value {
            key: DISKS_KEY,
            source,
        })?;
        self.store.set(DISKS_KEY, &raw)
    }

    /// Update the session after `request` succeeded on the server.
    pub fn observe(&self, request: &TranslatedRequest) -> Result<(), StoreError> {
        match request.body() {
            RequestBody::Login(login) => {
                debug!(user = %login.user, "remembering logged in user");
                self.set_logged_user(&login.user)
            }
            RequestBody::MakeDisk(disk) => {
                debug!(path = %disk.path, "remembering created disk");
                self.remember_disk(&disk.path)
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::command::{LoginBody, MakeDiskBody, MountBody};

    fn mkdisk(path: &str) -> TranslatedRequest {
        TranslatedRequest::new(RequestBody::MakeDisk(MakeDiskBody {
            size: Some(10),
            fit: "bf".into(),
            unit: "m".into(),
            path: path.into(),
        }))
    }

    #[test]
    fn test_memory_store_get_set() -> Result<()> {
        let store = MemoryStore::new();

        assert_eq!(store.get("a")?, None);
        store.set("a", "1")?;
        store.set("a", "2")?;
        assert_eq!(store.get("a")?, Some("2".to_string()));

        Ok(())
    }

    #[test]
    fn test_file_store_persists_between_opens() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");

        let store = FileStore::open(&path)?;
        assert_eq!(store.get(LOGGED_USER_KEY)?, None);
        store.set(LOGGED_USER_KEY, "root")?;

        let reopened = FileStore::open(&path)?;
        assert_eq!(reopened.get(LOGGED_USER_KEY)?, Some("root".to_string()));

        Ok(())
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "not json")?;

        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_disks_are_remembered_once_in_order() -> Result<()> {
        let session = Session::new(MemoryStore::new());

        session.observe(&mkdisk("/home/a.mia"))?;
        session.observe(&mkdisk("/home/b.mia"))?;
        session.observe(&mkdisk("/home/a.mia"))?;

        assert_eq!(session.disks()?, vec!["/home/a.mia", "/home/b.mia"]);

        Ok(())
    }

    #[test]
    fn test_disk_list_uses_json_array() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let session = Session {
            store: store.clone(),
            update: Arc::default(),
        };

        session.remember_disk("/a.mia")?;

        assert_eq!(store.get(DISKS_KEY)?, Some(r#"["/a.mia"]"#.to_string()));

        Ok(())
    }

    #[test]
    fn test_login_records_user() -> Result<()> {
        let session = Session::new(MemoryStore::new());
        let login = TranslatedRequest::new(RequestBody::Login(LoginBody {
            user: "root".into(),
            pass: "123".into(),
            id: "341A".into(),
        }));

        session.observe(&login)?;

        assert_eq!(session.logged_user()?, Some("root".to_string()));
        Ok(())
    }

    #[test]
    fn test_other_commands_leave_session_alone() -> Result<()> {
        let session = Session::new(MemoryStore::new());
        let mount = TranslatedRequest::new(RequestBody::Mount(MountBody {
            path: "/a.mia".into(),
            name: "p1".into(),
        }));

        session.observe(&mount)?;

        assert_eq!(session.logged_user()?, None);
        assert!(session.disks()?.is_empty());
        Ok(())
    }
}
