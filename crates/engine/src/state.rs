use crate::error::StateError;
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

/// Durable per-run load checkpoint, keyed by run date.
///
/// The stored value is the index of the last batch file whose upload was
/// handed to the warehouse. A crash between uploads resumes from the next
/// index instead of re-uploading the whole run.
#[derive(Debug)]
pub struct CheckpointStore {
    db: sled::Db,
}

impl CheckpointStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db = sled::open(path.as_ref())?;
        Ok(CheckpointStore { db })
    }

    fn key(run_date: NaiveDate) -> String {
        format!("load:{}", run_date.format("%Y-%m-%d"))
    }

    /// Records that batch `index` was handed off. Flushed before returning,
    /// so the checkpoint survives a crash right after the upload starts.
    pub fn save(&self, run_date: NaiveDate, index: u32) -> Result<(), StateError> {
        let encoded = bincode::serialize(&index)?;
        self.db.insert(Self::key(run_date).as_bytes(), encoded)?;
        self.db.flush()?;
        info!(run_date = %run_date, index, "Checkpoint saved");
        Ok(())
    }

    /// Last checkpointed batch index for the run date, if any.
    pub fn last_load(&self, run_date: NaiveDate) -> Result<Option<u32>, StateError> {
        match self.db.get(Self::key(run_date).as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}
