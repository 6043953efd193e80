//! Persistent key-value storage for the review history.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::data::error::StoreError;

/// Whole-value key-value storage. Values are JSON documents; callers
/// serialize them.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        // Each write gets its own temp file in the same directory, so handles
        // writing the same key concurrently never share one. Readers see the
        // old value or the new one, never a partial file.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;

    use super::KvStore;
    use crate::data::error::StoreError;

    #[derive(Debug, Default, Clone)]
    pub struct MemoryStore {
        pub values: HashMap<String, String>,
    }

    impl KvStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.values.get(key).cloned())
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.values.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.values.remove(key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_set_get_remove() {
        let dir = tempdir().unwrap();
        let mut store = JsonFileStore::open(&dir.path().join("state")).unwrap();

        assert_eq!(store.get("review_stats").unwrap(), None);

        store.set("review_stats", "{\"a\":1}").unwrap();
        assert_eq!(store.get("review_stats").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("state/review_stats.json").exists());
        let leftovers = std::fs::read_dir(dir.path().join("state")).unwrap().count();
        assert_eq!(leftovers, 1, "temp file left behind");

        store.set("review_stats", "{}").unwrap();
        assert_eq!(store.get("review_stats").unwrap().as_deref(), Some("{}"));

        store.remove("review_stats").unwrap();
        assert_eq!(store.get("review_stats").unwrap(), None);
        // Removing a missing key is fine.
        store.remove("review_stats").unwrap();
    }

    #[test]
    fn two_handles_see_each_others_writes() {
        let dir = tempdir().unwrap();
        let mut a = JsonFileStore::open(dir.path()).unwrap();
        let b = JsonFileStore::open(dir.path()).unwrap();
        a.set("last_full_sync", "\"2024-05-01\"").unwrap();
        assert_eq!(
            b.get("last_full_sync").unwrap().as_deref(),
            Some("\"2024-05-01\"")
        );
    }

    #[test]
    fn concurrent_handles_writing_one_key_both_succeed() {
        let dir = tempdir().unwrap();
        let big = "x".repeat(512 * 1024);

        let writers: Vec<_> = (0..2)
            .map(|n| {
                let path = dir.path().to_path_buf();
                let value = format!("\"{}{}\"", n, big);
                std::thread::spawn(move || {
                    let mut store = JsonFileStore::open(&path).unwrap();
                    (0..20)
                        .filter(|_| store.set("review_stats", &value).is_err())
                        .count()
                })
            })
            .collect();

        for w in writers {
            assert_eq!(w.join().unwrap(), 0, "a write failed");
        }
        let store = JsonFileStore::open(dir.path()).unwrap();
        let stored = store.get("review_stats").unwrap().unwrap();
        assert!(stored.starts_with("\"0") || stored.starts_with("\"1"));
        assert_eq!(stored.len(), big.len() + 3);
    }
}
