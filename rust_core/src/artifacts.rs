//! Model artifact set and the storage port it is persisted through.
//!
//! The four members (scaler + three market models) are one unit: a store
//! either returns all of them from the same training run or nothing.
//!
//! On-disk layout of [`FileArtifactStore`]:
//!
//! ```text
//! <root>/CURRENT                      manifest of the live generation
//! <root>/sets/<generation>/scaler.json
//! <root>/sets/<generation>/spread_model.json
//! <root>/sets/<generation>/total_model.json
//! <root>/sets/<generation>/moneyline_model.json
//! ```
//!
//! A put writes a fresh generation directory and then swaps `CURRENT` with a
//! rename. Within one process, puts and gets are serialized, so a get returns
//! either the old or the new set. Only the live generation and the one it
//! replaced stay on disk. A reader in another process whose generation is
//! pruned mid-read re-reads `CURRENT` and retries a bounded number of times,
//! then reports [`ModelError::ArtifactIncomplete`].

use crate::error::ModelError;
use crate::ml::{RandomForest, StandardScaler};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const SCALER_MEMBER: &str = "scaler";
pub const SPREAD_MEMBER: &str = "spread_model";
pub const TOTAL_MEMBER: &str = "total_model";
pub const MONEYLINE_MEMBER: &str = "moneyline_model";

const MANIFEST_FILE: &str = "CURRENT";
const MANIFEST_TMP_FILE: &str = "CURRENT.tmp";
const SETS_DIR: &str = "sets";
/// Re-reads of `CURRENT` after the generation being read was pruned
const STALE_READ_RETRIES: usize = 3;

/// Identifies one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub generation: Uuid,
    pub trained_at: DateTime<Utc>,
    pub sample_count: usize,
}

/// Scaler and the three market models, fitted together from one matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    pub manifest: ArtifactManifest,
    pub scaler: StandardScaler,
    pub spread_model: RandomForest,
    pub total_model: RandomForest,
    pub moneyline_model: RandomForest,
}

/// Key-addressed blob store with atomic whole-set semantics.
pub trait ArtifactStore: Send + Sync {
    /// Replace the stored set. Readers never observe a partial write.
    fn put(&self, set: &ArtifactSet) -> Result<(), ModelError>;

    /// `Ok(None)` when nothing was ever stored; `ArtifactIncomplete` when the
    /// stored set is missing a member.
    fn get(&self) -> Result<Option<ArtifactSet>, ModelError>;

    /// Store name for logging
    fn store_name(&self) -> &str;
}

/// Process-local store, mostly for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    slot: RwLock<Option<ArtifactSet>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn put(&self, set: &ArtifactSet) -> Result<(), ModelError> {
        *self.slot.write() = Some(set.clone());
        Ok(())
    }

    fn get(&self) -> Result<Option<ArtifactSet>, ModelError> {
        Ok(self.slot.read().clone())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}

/// JSON files under a root directory.
#[derive(Debug)]
pub struct FileArtifactStore {
    root: PathBuf,
    /// Serializes put against get within this process
    io_lock: RwLock<()>,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            io_lock: RwLock::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, generation: &Uuid) -> PathBuf {
        self.root.join(SETS_DIR).join(generation.to_string())
    }

    fn read_manifest(&self) -> Result<Option<ArtifactManifest>, ModelError> {
        match fs::read_to_string(self.root.join(MANIFEST_FILE)) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop generations other than the live one and the one it replaced.
    fn prune(&self, keep: &[Uuid]) {
        let sets = self.root.join(SETS_DIR);
        let entries = match fs::read_dir(&sets) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list artifact generations in {:?}: {}", sets, e);
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let keep_it = name
                .to_str()
                .and_then(|n| Uuid::parse_str(n).ok())
                .map_or(true, |id| keep.contains(&id));
            if keep_it {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => debug!("Pruned artifact generation {:?}", name),
                Err(e) => warn!("Failed to prune artifact generation {:?}: {}", name, e),
            }
        }
    }

    /// Read the members of `manifest`'s generation. If a member is gone and
    /// `CURRENT` has moved on, follow it to the newer generation.
    fn read_generation(&self, mut manifest: ArtifactManifest) -> Result<ArtifactSet, ModelError> {
        let mut retries = 0;
        loop {
            let dir = self.generation_dir(&manifest.generation);
            match read_set(&dir, manifest.clone()) {
                Err(e @ ModelError::ArtifactIncomplete { .. }) if retries < STALE_READ_RETRIES => {
                    match self.read_manifest()? {
                        Some(current) if current.generation != manifest.generation => {
                            debug!(
                                "Artifact generation {} was replaced during read; retrying with {}",
                                manifest.generation, current.generation
                            );
                            manifest = current;
                            retries += 1;
                        }
                        _ => return Err(e),
                    }
                }
                other => return other,
            }
        }
    }
}

fn read_set(dir: &Path, manifest: ArtifactManifest) -> Result<ArtifactSet, ModelError> {
    Ok(ArtifactSet {
        scaler: read_member(dir, SCALER_MEMBER)?,
        spread_model: read_member(dir, SPREAD_MEMBER)?,
        total_model: read_member(dir, TOTAL_MEMBER)?,
        moneyline_model: read_member(dir, MONEYLINE_MEMBER)?,
        manifest,
    })
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn write_member<T: Serialize>(dir: &Path, member: &str, value: &T) -> Result<(), ModelError> {
    let bytes = serde_json::to_vec(value)?;
    write_synced(&dir.join(format!("{}.json", member)), &bytes)?;
    Ok(())
}

fn read_member<T: DeserializeOwned>(dir: &Path, member: &str) -> Result<T, ModelError> {
    match fs::read(dir.join(format!("{}.json", member))) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ModelError::ArtifactIncomplete {
            missing: member.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

impl ArtifactStore for FileArtifactStore {
    fn put(&self, set: &ArtifactSet) -> Result<(), ModelError> {
        let _guard = self.io_lock.write();

        let dir = self.generation_dir(&set.manifest.generation);
        fs::create_dir_all(&dir)?;
        write_member(&dir, SCALER_MEMBER, &set.scaler)?;
        write_member(&dir, SPREAD_MEMBER, &set.spread_model)?;
        write_member(&dir, TOTAL_MEMBER, &set.total_model)?;
        write_member(&dir, MONEYLINE_MEMBER, &set.moneyline_model)?;

        let previous = self.read_manifest().ok().flatten();

        let tmp = self.root.join(MANIFEST_TMP_FILE);
        write_synced(&tmp, &serde_json::to_vec_pretty(&set.manifest)?)?;
        fs::rename(&tmp, self.root.join(MANIFEST_FILE))?;

        let mut keep = vec![set.manifest.generation];
        keep.extend(previous.map(|m| m.generation));
        self.prune(&keep);

        info!(
            "Persisted artifact generation {} ({} samples) to {:?}",
            set.manifest.generation, set.manifest.sample_count, self.root
        );
        Ok(())
    }

    fn get(&self) -> Result<Option<ArtifactSet>, ModelError> {
        let _guard = self.io_lock.read();

        match self.read_manifest()? {
            Some(manifest) => self.read_generation(manifest).map(Some),
            None => Ok(None),
        }
    }

    fn store_name(&self) -> &str {
        "file"
    }
}
