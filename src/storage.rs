//! Key/value blob storage on disk.
//!
//! Each key is one JSON file under the data directory. Writes replace the
//! whole blob (temp file + rename); the last writer wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Transcript of the most recently ended session.
pub const TRANSCRIPT_KEY: &str = "thanksToMe_conversationHistory";

/// `YYYY-MM-DD` → journal entry map.
pub const JOURNAL_KEY: &str = "thanksToMe_journal";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed blob {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// `Ok(None)` when the key was never written.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(key);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StorageError::Json { path, source })
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(value).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;

        debug!("Stored {key} at {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Transcript, Utterance};

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let value: Option<Transcript> = store.get(TRANSCRIPT_KEY).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn transcript_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("nested")).unwrap();

        let mut t = Transcript::new();
        t.push(Utterance::system("대화 시작"));
        t.push(Utterance::assistant("안녕하세요"));
        t.push(Utterance::user("고마운 하루"));
        store.set(TRANSCRIPT_KEY, &t).unwrap();

        let back: Transcript = store.get(TRANSCRIPT_KEY).unwrap().unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn set_replaces_previous_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();

        store.set("k", &vec![1, 2, 3]).unwrap();
        store.set("k", &vec![9]).unwrap();
        let back: Vec<i32> = store.get("k").unwrap().unwrap();
        assert_eq!(back, vec![9]);
        assert!(!dir.path().join("k.json.tmp").exists());
    }

    #[test]
    fn corrupt_blob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        fs::write(dir.path().join("k.json"), "{not json").unwrap();

        let result: Result<Option<Vec<i32>>, _> = store.get("k");
        assert!(matches!(result, Err(StorageError::Json { .. })));
    }
}
