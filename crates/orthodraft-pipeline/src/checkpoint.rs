//! Named per-organism checkpoints.
//!
//! ```text
//!   Aligned ──► Selected ──► Drafted ──► Finalized
//! ```
//!
//! Each stage is a JSON file under `<work_dir>/<organism>/`. Files are written
//! to a temporary sibling and renamed, so a crash never leaves a half-written
//! checkpoint behind.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use orthodraft_homology::{HomologyRecord, Selection, SelectionThresholds};
use orthodraft_network::{DraftOutcome, Projection};

use crate::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Aligned,
    Selected,
    Drafted,
    Finalized,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Aligned, Stage::Selected, Stage::Drafted, Stage::Finalized];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Aligned => "aligned",
            Stage::Selected => "selected",
            Stage::Drafted => "drafted",
            Stage::Finalized => "finalized",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint<T> {
    pub stage: Stage,
    pub organism: String,
    pub written_at: DateTime<Utc>,
    pub data: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedData {
    pub records: Vec<HomologyRecord>,
    pub skipped_lines: usize,
    pub genes_searched: usize,
    pub genes_without_hits: Vec<String>,
    pub genes_timed_out: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedData {
    pub thresholds: SelectionThresholds,
    pub selection: Selection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftedData {
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedData {
    pub outcome: DraftOutcome,
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    organism: String,
}

impl CheckpointStore {
    pub fn new(work_dir: &Path, organism: &str) -> Self {
        Self {
            dir: work_dir.join(organism),
            organism: organism.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, stage: Stage) -> PathBuf {
        self.dir.join(format!("{}.json", stage.name()))
    }

    pub fn exists(&self, stage: Stage) -> bool {
        self.path(stage).is_file()
    }

    /// Latest stage with a checkpoint on disk.
    pub fn latest(&self) -> Option<Stage> {
        Stage::ALL.into_iter().rev().find(|s| self.exists(*s))
    }

    pub fn save<T: Serialize>(&self, stage: Stage, data: &T) -> Result<PathBuf, BuildError> {
        fs::create_dir_all(&self.dir).map_err(|e| BuildError::io(&self.dir, e))?;
        let checkpoint = Checkpoint {
            stage,
            organism: self.organism.clone(),
            written_at: Utc::now(),
            data,
        };
        let path = self.path(stage);
        let text = serde_json::to_string(&checkpoint).map_err(|e| BuildError::Checkpoint {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| BuildError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| BuildError::io(&path, e))?;
        tracing::debug!(organism = %self.organism, stage = stage.name(), "checkpoint written");
        Ok(path)
    }

    /// `Ok(None)` when no checkpoint exists for `stage`.
    pub fn load<T: DeserializeOwned>(&self, stage: Stage) -> Result<Option<T>, BuildError> {
        let path = self.path(stage);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        let checkpoint: Checkpoint<T> =
            serde_json::from_str(&text).map_err(|e| BuildError::Checkpoint {
                path: path.clone(),
                message: e.to_string(),
            })?;
        if checkpoint.stage != stage || checkpoint.organism != self.organism {
            return Err(BuildError::Checkpoint {
                path,
                message: format!(
                    "belongs to {}/{}, expected {}/{}",
                    checkpoint.organism,
                    checkpoint.stage.name(),
                    self.organism,
                    stage.name()
                ),
            });
        }
        Ok(Some(checkpoint.data))
    }

    /// Remove `stage` and every later checkpoint.
    pub fn invalidate_from(&self, stage: Stage) -> Result<(), BuildError> {
        for s in Stage::ALL.into_iter().filter(|s| *s >= stage) {
            let path = self.path(s);
            if path.is_file() {
                fs::remove_file(&path).map_err(|e| BuildError::io(&path, e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_and_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "ecoli");
        assert_eq!(store.latest(), None);
        assert!(store.load::<AlignedData>(Stage::Aligned).unwrap().is_none());

        let data = AlignedData {
            genes_searched: 3,
            genes_timed_out: vec!["g2".into()],
            ..AlignedData::default()
        };
        store.save(Stage::Aligned, &data).unwrap();
        store.save(Stage::Drafted, &DraftedData { projection: Projection::default() }).unwrap();
        assert_eq!(store.latest(), Some(Stage::Drafted));
        assert_eq!(store.load::<AlignedData>(Stage::Aligned).unwrap(), Some(data));

        store.invalidate_from(Stage::Selected).unwrap();
        assert_eq!(store.latest(), Some(Stage::Aligned));
    }

    #[test]
    fn checkpoint_of_another_organism_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = CheckpointStore::new(dir.path(), "a");
        a.save(Stage::Aligned, &AlignedData::default()).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        fs::copy(a.path(Stage::Aligned), dir.path().join("b/aligned.json")).unwrap();

        let b = CheckpointStore::new(dir.path(), "b");
        assert!(matches!(
            b.load::<AlignedData>(Stage::Aligned),
            Err(BuildError::Checkpoint { .. })
        ));
    }

    #[test]
    fn corrupt_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path(), "x");
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path(Stage::Selected), "{not json").unwrap();
        assert!(store.load::<SelectedData>(Stage::Selected).is_err());
    }
}
