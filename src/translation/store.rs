use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Where a plugin keeps its editable translation table.
pub trait TranslationStore: Send + Sync {
    fn load(&self) -> Result<HashMap<String, String>, StoreError>;
    fn save(&self, table: &HashMap<String, String>) -> Result<(), StoreError>;
}

/// A flat TOML file of `key = "text"` lines. A missing file is an empty table.
#[derive(Debug, Clone)]
pub struct TomlTranslationStore {
    path: PathBuf,
}

impl TomlTranslationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranslationStore for TomlTranslationStore {
    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => {
                return Err(StoreError::Read { path: self.path.clone(), source });
            }
        };

        toml::from_str(&data).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, table: &HashMap<String, String>) -> Result<(), StoreError> {
        // Sorted so the file diffs cleanly between saves
        let sorted: BTreeMap<&String, &String> = table.iter().collect();
        let data = toml::to_string(&sorted)?;
        std::fs::write(&self.path, data).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Keeps the table in memory. Handy for tests and for hosts with their own persistence.
#[derive(Debug, Default)]
pub struct MemoryTranslationStore {
    table: RwLock<HashMap<String, String>>,
    saves: RwLock<usize>,
}

impl MemoryTranslationStore {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
            saves: RwLock::new(0),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.table.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.table.read().get(key).cloned()
    }

    /// How many times `save` was called.
    pub fn save_count(&self) -> usize {
        *self.saves.read()
    }
}

impl TranslationStore for MemoryTranslationStore {
    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.table.read().clone())
    }

    fn save(&self, table: &HashMap<String, String>) -> Result<(), StoreError> {
        *self.table.write() = table.clone();
        *self.saves.write() += 1;
        Ok(())
    }
}
