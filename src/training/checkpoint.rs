//! Best-model checkpoint persisted as JSON
//!
//! One file, `<dir>/conv_model.json`, overwritten in place on every save. The
//! write goes to a temporary sibling first and is renamed over the old file,
//! so a crash mid-save leaves the previous checkpoint intact.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CHECKPOINT_FILE: &str = "conv_model.json";

/// Every tensor of a model, in the model's fixed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    tensors: Vec<Vec<f32>>,
}

impl Snapshot {
    pub fn new(tensors: Vec<Vec<f32>>) -> Self {
        Self { tensors }
    }

    pub fn tensors(&self) -> &[Vec<f32>] {
        &self.tensors
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// Reads and writes the single checkpoint file of a training run.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Use `dir` for the checkpoint, creating it if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(CHECKPOINT_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, snapshot)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), tensors = snapshot.len(), "Saved checkpoint");
        Ok(())
    }

    pub fn load(&self) -> Result<Snapshot> {
        if !self.exists() {
            return Err(Error::Checkpoint(format!(
                "no checkpoint at {}",
                self.path.display()
            )));
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_overwrites_in_place() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("summaries")).unwrap();

        store.save(&Snapshot::new(vec![vec![1.0, 2.0]])).unwrap();
        store.save(&Snapshot::new(vec![vec![3.0], vec![4.0]])).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.tensors(), &[vec![3.0], vec![4.0]]);
        assert_eq!(fs::read_dir(dir.path().join("summaries")).unwrap().count(), 1);
    }

    #[test]
    fn test_load_missing_checkpoint() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path()).unwrap();

        assert!(!store.exists());
        assert!(matches!(store.load(), Err(Error::Checkpoint(_))));
    }
}
