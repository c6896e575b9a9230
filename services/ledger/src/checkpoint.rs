//! Checkpoint persistence
//!
//! The whole ledger is rewritten as one JSON document on every
//! successful sync. Writes are atomic: serialize to a temp file in the
//! same directory, fsync, rename over the live path. A reader therefore
//! always sees either the previous checkpoint or the new one, never a
//! torn write.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use types::ids::Address;

use crate::store::LedgerStore;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Handle to the on-disk checkpoint document.
pub struct CheckpointFile {
    path: PathBuf,
}

impl CheckpointFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted store, or create a fresh one starting at
    /// `deployment_block` if no checkpoint exists yet (first run).
    pub fn load_or_init(
        &self,
        deployment_block: u64,
        ua_address: Address,
    ) -> Result<LedgerStore, CheckpointError> {
        if self.path.exists() {
            self.load()
        } else {
            let store = LedgerStore::new(deployment_block, ua_address);
            self.persist(&store)?;
            Ok(store)
        }
    }

    /// Load and deserialize the checkpoint document.
    pub fn load(&self) -> Result<LedgerStore, CheckpointError> {
        let data = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Atomically replace the checkpoint with `store`.
    pub fn persist(&self, store: &LedgerStore) -> Result<(), CheckpointError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let data = serde_json::to_vec(store)?;
        let tmp_path = self.path.with_extension("json.tmp");

        // Atomic write: write to tmp, fsync, rename
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}
