// On-disk layout:
//   <dir>/manifest.json   versioned listing of (created_order, id, digest)
//   <dir>/entries.json    entries in created_order
// Written to a sibling temp dir, then renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::entry::Entry;
use crate::store::store::EntryStore;
use crate::types::identifiers::{CreatedOrder, EntryDigest, EntryId};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const ENTRIES_FILE: &str = "entries.json";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Output directory already exists: {0}")]
    OutputExists(PathBuf),
    #[error("Manifest lists {manifest} entries, entries file holds {found}")]
    EntryCountMismatch { manifest: usize, found: usize },
    #[error("Entry at {order} does not match manifest: {reason}")]
    EntryMismatch { order: CreatedOrder, reason: String },
    #[error("Snapshot version mismatch: manifest says {manifest}, content hashes to {computed}")]
    VersionMismatch { manifest: String, computed: String },
}

// Serializable, comparable, explicit defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub version: String,
    pub hash_algorithm: String,
}

impl SnapshotConfig {
    pub fn v0() -> Self {
        Self {
            version: "1".into(),
            hash_algorithm: "sha256".into(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self::v0()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub created_order: CreatedOrder,
    pub id: EntryId,
    pub digest: EntryDigest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub snapshot_version: String,
    pub config: SnapshotConfig,
    pub created_at: DateTime<Utc>, // informational only
    pub generation: u64,           // informational only
    pub entry_count: usize,
    pub entries: Vec<ManifestEntry>,
}

/// Hash of the config plus every `created_order:id:digest` line, in order.
fn snapshot_version(
    config: &SnapshotConfig,
    entries: &[ManifestEntry],
) -> Result<String, serde_json::Error> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(config)?);
    for entry in entries {
        let line = format!(
            "{}:{}:{}\n",
            entry.created_order.get(),
            entry.id,
            entry.digest.as_str()
        );
        hasher.update(line.as_bytes());
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// Single-threaded, non-reentrant.
pub struct SnapshotWriter {
    config: SnapshotConfig,
}

impl SnapshotWriter {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    pub fn write(&self, store: &EntryStore, output_dir: &Path) -> Result<Snapshot, SnapshotError> {
        if output_dir.exists() {
            return Err(SnapshotError::OutputExists(output_dir.to_path_buf()));
        }

        // One consistent view for both files
        let view = store.snapshot();
        let entries: Vec<&Entry> = view.entries().iter().map(|e| e.as_ref()).collect();

        let manifest_entries: Vec<ManifestEntry> = entries
            .iter()
            .map(|e| ManifestEntry {
                created_order: e.created_order(),
                id: e.id(),
                digest: e.digest(),
            })
            .collect();

        let version = snapshot_version(&self.config, &manifest_entries)?;

        let manifest = SnapshotManifest {
            snapshot_version: version.clone(),
            config: self.config.clone(),
            created_at: Utc::now(),
            generation: view.generation(),
            entry_count: manifest_entries.len(),
            entries: manifest_entries,
        };

        // Temp dir name is derived from the version so two different
        // snapshots aimed at the same parent do not collide.
        let temp_suffix = format!("tmp.{}", &version[7..19]);
        let temp_dir = output_dir.with_extension(temp_suffix);

        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir)?;
        }
        fs::create_dir_all(&temp_dir)?;

        let f_entries = fs::File::create(temp_dir.join(ENTRIES_FILE))?;
        serde_json::to_writer(&f_entries, &entries)?;
        f_entries.sync_all()?;

        let f_man = fs::File::create(temp_dir.join(MANIFEST_FILE))?;
        serde_json::to_writer_pretty(&f_man, &manifest)?;
        f_man.sync_all()?;

        fs::rename(&temp_dir, output_dir)?;

        tracing::info!(
            path = %output_dir.display(),
            entries = manifest.entry_count,
            version = %manifest.snapshot_version,
            "wrote snapshot"
        );

        Ok(Snapshot {
            root: output_dir.to_path_buf(),
            manifest,
        })
    }
}

// Read-only handle: no mutation, no update methods.
#[derive(Debug)]
pub struct Snapshot {
    pub root: PathBuf,
    pub manifest: SnapshotManifest,
}

impl Snapshot {
    pub fn open(root: &Path) -> Result<Self, SnapshotError> {
        let f = fs::File::open(root.join(MANIFEST_FILE))?;
        let manifest: SnapshotManifest = serde_json::from_reader(f)?;
        Ok(Snapshot {
            root: root.to_path_buf(),
            manifest,
        })
    }

    /// Open and verify a snapshot, rebuilding the store it was written from.
    pub fn load(root: &Path) -> Result<EntryStore, SnapshotError> {
        Self::open(root)?.load_store()
    }

    pub fn load_entries(&self) -> Result<Vec<Entry>, SnapshotError> {
        let f = fs::File::open(self.root.join(ENTRIES_FILE))?;
        let entries: Vec<Entry> = serde_json::from_reader(f)?;

        if entries.len() != self.manifest.entries.len()
            || entries.len() != self.manifest.entry_count
        {
            return Err(SnapshotError::EntryCountMismatch {
                manifest: self.manifest.entry_count,
                found: entries.len(),
            });
        }

        for (position, (entry, listed)) in entries.iter().zip(&self.manifest.entries).enumerate() {
            let order = CreatedOrder::new(position as u64);
            if entry.created_order() != order || listed.created_order != order {
                return Err(SnapshotError::EntryMismatch {
                    order,
                    reason: "out of order".into(),
                });
            }
            if entry.id() != listed.id {
                return Err(SnapshotError::EntryMismatch {
                    order,
                    reason: format!("id {} listed as {}", entry.id(), listed.id),
                });
            }
            let digest = entry.digest();
            if digest != listed.digest {
                return Err(SnapshotError::EntryMismatch {
                    order,
                    reason: format!("content hashes to {}, manifest says {}", digest, listed.digest),
                });
            }
        }

        let computed = snapshot_version(&self.manifest.config, &self.manifest.entries)?;
        if computed != self.manifest.snapshot_version {
            return Err(SnapshotError::VersionMismatch {
                manifest: self.manifest.snapshot_version.clone(),
                computed,
            });
        }

        Ok(entries)
    }

    pub fn load_store(&self) -> Result<EntryStore, SnapshotError> {
        let entries = self.load_entries()?;
        let store = EntryStore::from_entries(entries);
        tracing::info!(
            path = %self.root.display(),
            entries = store.len(),
            "loaded snapshot"
        );
        Ok(store)
    }
}
