//! Versioned snapshot persistence over a pluggable blob store.
//!
//! The host supplies a key-value blob store; the coordinator owns the
//! snapshot schema and the single storage key. Loads distinguish an absent
//! blob (fresh install) from a malformed one (corruption); the manager
//! treats the latter as an all-or-nothing reset.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::performance::DailyBucket;
use super::types::DayKey;

pub const SNAPSHOT_VERSION: u32 = 1;

// ─────────────────────────────────────────────────────────
// Blob store
// ─────────────────────────────────────────────────────────

/// Synchronous key-value blob store supplied by the host. All calls block
/// the calling thread; the engine never retries on its own.
pub trait BlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// In-memory store for tests and hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under a base directory.
#[derive(Debug)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).context(format!("reading blob `{key}`")),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).context("creating blob directory")?;
        fs::write(self.path_for(key), value).context(format!("writing blob `{key}`"))
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context(format!("deleting blob `{key}`")),
        }
    }
}

// ─────────────────────────────────────────────────────────
// Snapshot schema
// ─────────────────────────────────────────────────────────

/// Persisted engine state, version 1. Explicit schema so field renames and
/// migrations stay controlled; an unrecognized version is treated as
/// corruption, not silently reinterpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotV1 {
    pub version: u32,
    /// placement → day key → bucket.
    pub placements: BTreeMap<String, BTreeMap<DayKey, DailyBucket>>,
}

impl SnapshotV1 {
    pub fn new(placements: BTreeMap<String, BTreeMap<DayKey, DailyBucket>>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            placements,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────

/// Owns the blob store handle, the storage key, and the wire format.
pub struct PersistenceCoordinator {
    store: Box<dyn BlobStore>,
    key: String,
}

impl PersistenceCoordinator {
    pub fn new(store: Box<dyn BlobStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// `Ok(None)` when no blob exists; `Err` when one exists but cannot be
    /// decoded (including a version mismatch).
    pub fn load(&self) -> Result<Option<SnapshotV1>> {
        let Some(bytes) = self.store.get(&self.key)? else {
            return Ok(None);
        };
        let snapshot: SnapshotV1 =
            serde_json::from_slice(&bytes).context("decoding floor snapshot")?;
        if snapshot.version != SNAPSHOT_VERSION {
            bail!("unsupported floor snapshot version {}", snapshot.version);
        }
        Ok(Some(snapshot))
    }

    pub fn persist(&mut self, snapshot: &SnapshotV1) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot).context("encoding floor snapshot")?;
        self.store.put(&self.key, &bytes)?;
        debug!(
            "persisted floor snapshot | key={} bytes={}",
            self.key,
            bytes.len()
        );
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.delete(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> SnapshotV1 {
        let mut days = BTreeMap::new();
        days.insert(
            20260825,
            DailyBucket {
                count: 1000,
                revenue_micros: 3_000_000,
            },
        );
        days.insert(
            20260824,
            DailyBucket {
                count: 3,
                revenue_micros: -1, // negative adjustments must survive too
            },
        );
        let mut placements = BTreeMap::new();
        placements.insert("P".to_string(), days);
        SnapshotV1::new(placements)
    }

    #[test]
    fn test_round_trip_exact() {
        let mut coord =
            PersistenceCoordinator::new(Box::new(MemoryBlobStore::new()), "floor_engine.state");
        let snapshot = sample_snapshot();
        coord.persist(&snapshot).unwrap();

        let loaded = coord.load().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_absent_blob_loads_none() {
        let coord =
            PersistenceCoordinator::new(Box::new(MemoryBlobStore::new()), "floor_engine.state");
        assert!(coord.load().unwrap().is_none());
    }

    #[test]
    fn test_malformed_blob_is_error() {
        let mut store = MemoryBlobStore::new();
        store.put("k", b"{ not json").unwrap();
        let coord = PersistenceCoordinator::new(Box::new(store), "k");
        assert!(coord.load().is_err());
    }

    #[test]
    fn test_version_mismatch_is_error() {
        let mut snapshot = sample_snapshot();
        snapshot.version = 99;
        let bytes = serde_json::to_vec(&snapshot).unwrap();

        let mut store = MemoryBlobStore::new();
        store.put("k", &bytes).unwrap();
        let coord = PersistenceCoordinator::new(Box::new(store), "k");
        assert!(coord.load().is_err());
    }

    #[test]
    fn test_clear_removes_blob() {
        let mut coord = PersistenceCoordinator::new(Box::new(MemoryBlobStore::new()), "k");
        coord.persist(&sample_snapshot()).unwrap();
        coord.clear().unwrap();
        assert!(coord.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = PersistenceCoordinator::new(
            Box::new(FileBlobStore::new(dir.path())),
            "floor_engine.state",
        );

        assert!(coord.load().unwrap().is_none());
        let snapshot = sample_snapshot();
        coord.persist(&snapshot).unwrap();
        assert_eq!(coord.load().unwrap().unwrap(), snapshot);

        coord.clear().unwrap();
        assert!(coord.load().unwrap().is_none());
        // Deleting an already-absent blob is fine.
        coord.clear().unwrap();
    }
}
