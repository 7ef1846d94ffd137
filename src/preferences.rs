use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use serde_json::Value;

use crate::columns::{ColumnKey, ColumnDescriptor};
use crate::constants::VISIBILITY_STORAGE_KEY;
use crate::error::PersistenceError;

/// Key/value persistence used for user preferences.
pub trait PreferenceStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// The set of columns the user wants shown. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleColumns(BTreeSet<ColumnKey>);

impl Default for VisibleColumns {
    fn default() -> Self {
        Self::all()
    }
}

impl VisibleColumns {
    pub fn all() -> Self {
        Self(ColumnKey::ALL.into_iter().collect())
    }

    /// Build from keys; an empty selection falls back to every column.
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = ColumnKey>,
    {
        let keys: BTreeSet<ColumnKey> = keys.into_iter().collect();
        if keys.is_empty() {
            Self::all()
        } else {
            Self(keys)
        }
    }

    pub fn contains(&self, key: ColumnKey) -> bool {
        self.0.contains(&key)
    }

    /// Flip one column. Hiding the last visible column is refused; returns
    /// whether the set changed.
    pub fn toggle(&mut self, key: ColumnKey) -> bool {
        if self.0.contains(&key) {
            if self.0.len() == 1 {
                return false;
            }
            self.0.remove(&key);
        } else {
            self.0.insert(key);
        }
        true
    }

    /// Keys in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Registry columns that are visible, keeping registry order.
    pub fn filter<'a>(&self, columns: &'a [ColumnDescriptor]) -> Vec<&'a ColumnDescriptor> {
        columns
            .iter()
            .filter(|column| self.contains(column.key))
            .collect()
    }

    pub fn to_json(&self) -> String {
        Value::from(self.iter().map(ColumnKey::as_str).collect::<Vec<_>>()).to_string()
    }

    /// Parse a persisted array. Unknown keys are skipped; an entry with no
    /// known key at all is treated as corrupt.
    pub fn from_json(raw: &str) -> Result<Self, PersistenceError> {
        let names: Vec<String> = serde_json::from_str(raw)
            .map_err(|err| PersistenceError::Corrupt(err.to_string()))?;

        let keys: BTreeSet<ColumnKey> = names
            .iter()
            .filter_map(|name| match name.parse::<ColumnKey>() {
                Ok(key) => Some(key),
                Err(err) => {
                    log::debug!("ignoring stored column: {err}");
                    None
                }
            })
            .collect();

        if keys.is_empty() {
            return Err(PersistenceError::Corrupt(
                "no known column keys".to_string(),
            ));
        }
        Ok(Self(keys))
    }
}

/// Loads and saves [`VisibleColumns`] under a single storage entry.
pub struct VisibilityStore<S> {
    storage: S,
    key: String,
}

impl<S: PreferenceStorage> VisibilityStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, VISIBILITY_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The persisted set, or every column when nothing usable is stored.
    pub fn load(&self) -> VisibleColumns {
        match self.try_load() {
            Ok(Some(visible)) => visible,
            Ok(None) => VisibleColumns::all(),
            Err(err) => {
                log::warn!("falling back to all columns: {err}");
                VisibleColumns::all()
            }
        }
    }

    pub fn try_load(&self) -> Result<Option<VisibleColumns>, PersistenceError> {
        self.storage
            .read(&self.key)?
            .map(|raw| VisibleColumns::from_json(&raw))
            .transpose()
    }

    pub fn save(&self, visible: &VisibleColumns) -> Result<(), PersistenceError> {
        self.storage.write(&self.key, &visible.to_json())
    }

    /// Toggle one column and write the result through immediately. A failed
    /// write is logged; the returned set reflects the toggle either way.
    pub fn toggle(&self, current: &VisibleColumns, key: ColumnKey) -> VisibleColumns {
        let mut next = current.clone();
        if next.toggle(key) {
            self.persist(&next);
        }
        next
    }

    pub fn reset(&self) -> VisibleColumns {
        let visible = VisibleColumns::all();
        self.persist(&visible);
        visible
    }

    fn persist(&self, visible: &VisibleColumns) {
        if let Err(err) = self.save(visible) {
            log::warn!("column preference not saved: {err}");
        }
    }
}

/// Process-local storage; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl PreferenceStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::PreferenceStorage;
    use crate::error::PersistenceError;

    /// One `<key>.json` file per entry inside a directory.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        dir: PathBuf,
    }

    impl FileStorage {
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        pub fn dir(&self) -> &Path {
            &self.dir
        }

        fn path_for(&self, key: &str) -> PathBuf {
            self.dir.join(format!("{key}.json"))
        }
    }

    impl PreferenceStorage for FileStorage {
        fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
            match fs::read_to_string(self.path_for(key)) {
                Ok(raw) => Ok(Some(raw)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(PersistenceError::Backend(err.to_string())),
            }
        }

        fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
            fs::create_dir_all(&self.dir)
                .and_then(|()| fs::write(self.path_for(key), value))
                .map_err(|err| PersistenceError::Backend(err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_every_column() {
        let store = VisibilityStore::new(MemoryStorage::default());
        assert_eq!(store.load(), VisibleColumns::all());
        assert_eq!(store.load().len(), ColumnKey::ALL.len());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = VisibilityStore::new(MemoryStorage::default());
        let visible = VisibleColumns::from_keys([
            ColumnKey::Symbol,
            ColumnKey::CurrentPrice,
            ColumnKey::Beta,
        ]);
        store.save(&visible).expect("save");
        assert_eq!(store.load(), visible);
    }

    #[test]
    fn corrupt_entries_fall_back_to_default() {
        let storage = MemoryStorage::default();
        let store = VisibilityStore::new(storage.clone());

        for raw in ["{not json", "42", "[]", r#"["Nope", "Also Nope"]"#] {
            storage
                .write(VISIBILITY_STORAGE_KEY, raw)
                .expect("memory write");
            assert_eq!(store.load(), VisibleColumns::all(), "payload {raw}");
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let storage = MemoryStorage::default();
        storage
            .write(VISIBILITY_STORAGE_KEY, r#"["Symbol", "Retired Column"]"#)
            .expect("memory write");
        let store = VisibilityStore::new(storage);
        assert_eq!(
            store.load(),
            VisibleColumns::from_keys([ColumnKey::Symbol])
        );
    }

    #[test]
    fn toggle_off_and_on_restores_order() {
        let store = VisibilityStore::new(MemoryStorage::default());
        let original = store.load();
        let hidden = store.toggle(&original, ColumnKey::Sector);
        assert!(!hidden.contains(ColumnKey::Sector));
        assert_eq!(store.load(), hidden);

        let restored = store.toggle(&hidden, ColumnKey::Sector);
        assert_eq!(restored, original);
        assert_eq!(
            restored.iter().collect::<Vec<_>>(),
            ColumnKey::ALL.to_vec()
        );
    }

    #[test]
    fn last_column_cannot_be_hidden() {
        let mut visible = VisibleColumns::from_keys([ColumnKey::Symbol]);
        assert!(!visible.toggle(ColumnKey::Symbol));
        assert!(visible.contains(ColumnKey::Symbol));
    }

    #[test]
    fn file_storage_persists_between_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let visible = VisibleColumns::from_keys([ColumnKey::MarketCap, ColumnKey::Symbol]);

        VisibilityStore::new(FileStorage::new(dir.path()))
            .save(&visible)
            .expect("save");
        let reloaded = VisibilityStore::new(FileStorage::new(dir.path())).load();

        assert_eq!(reloaded, visible);
        assert_eq!(
            reloaded.to_json(),
            r#"["Symbol","Market Cap"]"#
        );
    }
}
