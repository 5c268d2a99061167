// Storage capability for the cache.
// A session-scoped key-value surface behind a trait, so the cache store can
// run against an in-memory map in tests and a file-per-key directory in the
// binary.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use directories::ProjectDirs;
use thiserror::Error;

/// Storage write failure.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage capacity exceeded")]
    Full,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Key-value storage: get, set, remove, keys.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

/// In-memory storage with an optional entry cap.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    capacity: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes of new keys beyond `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: Some(capacity),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(capacity) = self.capacity {
            if !entries.contains_key(key) && entries.len() >= capacity {
                return Err(StorageError::Full);
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }
}

/// File-per-key storage rooted in a directory.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open storage rooted at the platform cache directory
    /// (~/.cache/montra on Linux).
    pub fn open_default() -> io::Result<Self> {
        let root = ProjectDirs::from("", "", "montra")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .ok_or_else(|| io::Error::other("no home directory"))?;
        Self::open(root)
    }

    /// Open storage rooted at an explicit directory.
    pub fn open(root: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_name(key)))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.file_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.file_for(key);

        // Write atomically via temp file
        let temp_path = path.with_extension("tmp");
        let result = (|| {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &path)
        })();

        result.map_err(|e| match e.kind() {
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => StorageError::Full,
            _ => StorageError::Io(e),
        })
    }

    fn remove(&self, key: &str) {
        let path = self.file_for(key);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(key, error = %e, "failed to remove cache file");
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension()? != "json" {
                    return None;
                }
                Some(path.file_stem()?.to_string_lossy().into_owned())
            })
            .collect()
    }
}

/// Sanitize a key for use as a file name.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
